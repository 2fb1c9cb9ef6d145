// src/cli/mod.rs
// Command line: run the server or manage registered endpoints directly

pub mod list;
pub mod register;
pub mod remove;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sheetrest")]
#[command(about = "sheetrest - REST endpoints over Google Sheets ranges", long_about = None)]
pub struct Cli {
    /// Registry database file (overrides SHEETREST_DATABASE)
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server (the default when no command is given)
    Serve {
        /// Address to listen on (overrides SHEETREST_BIND)
        #[arg(long)]
        bind: Option<String>,

        /// Use the in-memory store instead of Google Sheets
        #[arg(long)]
        memory: bool,
    },

    /// Register a new endpoint for a spreadsheet range
    Register {
        /// Owner id; defaults to the current OS user
        #[arg(long)]
        owner: Option<String>,

        /// Display name of the endpoint
        #[arg(long)]
        name: String,

        /// Spreadsheet id
        #[arg(long = "sheet-id")]
        sheet_id: String,

        /// A1 range (defaults to A1:Z1000)
        #[arg(long)]
        range: Option<String>,
    },

    /// List endpoints owned by a user
    List {
        #[arg(long)]
        owner: Option<String>,
    },

    /// Remove an endpoint by key
    Remove {
        #[arg(long)]
        owner: Option<String>,

        /// Endpoint key
        key: String,
    },
}

/// Owner used when a command does not name one.
pub fn owner_or_current_user(owner: Option<String>) -> String {
    owner
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .unwrap_or_else(whoami::username)
}
