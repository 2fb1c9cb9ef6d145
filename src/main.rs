// src/main.rs

use clap::Parser;

use sheetrest::app::{self, StartupError};
use sheetrest::cli::{self, owner_or_current_user, Cli, Commands};
use sheetrest::logging;
use sheetrest::settings::{Settings, StoreKind};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let (mut settings, sources) = match Settings::load() {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(path) = cli.database.clone() {
        settings.database = Some(path);
    }
    logging::init(&settings.log, settings.log_format);
    sources.log(&settings);

    if let Err(e) = run(cli.command, settings).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(command: Option<Commands>, mut settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        None => app::serve(settings).await?,
        Some(Commands::Serve { bind, memory }) => {
            if let Some(bind) = bind {
                settings.bind = bind;
            }
            if memory {
                settings.store = StoreKind::Memory;
            }
            app::serve(settings).await?
        }
        Some(Commands::Register {
            owner,
            name,
            sheet_id,
            range,
        }) => {
            let api = app::build_api(&settings)?;
            let owner = owner_or_current_user(owner);
            cli::register::run(&api, &owner, &name, &sheet_id, range.as_deref()).await?
        }
        Some(Commands::List { owner }) => {
            let api = registry_only(&settings)?;
            cli::list::run(&api, &owner_or_current_user(owner))?
        }
        Some(Commands::Remove { owner, key }) => {
            let api = registry_only(&settings)?;
            cli::remove::run(&api, &owner_or_current_user(owner), &key)?
        }
    }
    Ok(())
}

/// List and remove never touch a spreadsheet, so they run without credentials.
fn registry_only(settings: &Settings) -> Result<sheetrest::SheetsApi, StartupError> {
    let mut offline = settings.clone();
    offline.store = StoreKind::Memory;
    app::build_api(&offline)
}
