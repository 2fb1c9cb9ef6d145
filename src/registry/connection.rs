// src/registry/connection.rs

use std::path::Path;

use rusqlite::Connection;
use tracing::{debug, warn};

use super::error::DbResult;
use super::helpers::ENDPOINTS_TABLE;

pub struct DbConnection;

impl DbConnection {
    /// Open (creating if needed) the registry database with WAL enabled and
    /// the schema in place.
    pub fn open(path: &Path) -> DbResult<Connection> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;

        // PRAGMA settings are per connection, so set them on every open
        let journal_mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        if journal_mode.to_uppercase() != "WAL" {
            warn!(
                "Failed to set WAL mode on registry {:?}. Current mode: {}",
                path.file_name(),
                journal_mode
            );
        } else {
            debug!("WAL mode activated for registry {:?}", path.file_name());
        }

        conn.execute_batch(
            "PRAGMA synchronous=NORMAL;
             PRAGMA foreign_keys=ON;
             PRAGMA busy_timeout=5000;",
        )?;

        Self::ensure_schema(&conn)?;
        Ok(conn)
    }

    /// Private in-memory registry, used by tests and `--memory` runs.
    pub fn open_in_memory() -> DbResult<Connection> {
        let conn = Connection::open_in_memory()?;
        Self::ensure_schema(&conn)?;
        Ok(conn)
    }

    fn ensure_schema(conn: &Connection) -> DbResult<()> {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                sheet_id TEXT NOT NULL,
                sheet_range TEXT NOT NULL,
                endpoint_key TEXT NOT NULL UNIQUE,
                endpoint_path TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_{table}_user_id ON {table}(user_id);",
            table = ENDPOINTS_TABLE
        ))?;
        Ok(())
    }
}
