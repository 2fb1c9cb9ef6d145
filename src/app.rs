// src/app.rs
//! Startup wiring: settings to store, registry, authenticator and server.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tracing::info;

use crate::api::{self, AppState};
use crate::auth::{AuthError, Authenticator, SystemClock};
use crate::registry::{DbError, EndpointRegistry};
use crate::service::SheetsApi;
use crate::settings::{Settings, SettingsError, StoreKind};
use crate::sheets::{GoogleSheetsStore, MemoryStore, SpreadsheetStore, StoreError};

/// Identity reported by the in-memory backend.
pub const MEMORY_IDENTITY: &str = "memory-store@localhost";

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("store: {0}")]
    Store(#[from] StoreError),
    #[error("registry: {0}")]
    Registry(#[from] DbError),
    #[error("auth: {0}")]
    Auth(#[from] AuthError),
    #[error("GOOGLE_CREDENTIALS is not set; provide service-account JSON or use the memory store")]
    MissingCredentials,
    #[error("invalid bind address '{0}'")]
    BindAddress(String),
    #[error("server: {0}")]
    Io(#[from] std::io::Error),
}

pub fn build_store(settings: &Settings) -> Result<Arc<dyn SpreadsheetStore>, StartupError> {
    match settings.store {
        StoreKind::Memory => {
            info!("Using in-memory spreadsheet store; unknown spreadsheets start empty");
            Ok(Arc::new(MemoryStore::with_auto_create(MEMORY_IDENTITY)))
        }
        StoreKind::Google => {
            let credentials = settings
                .google_credentials
                .as_deref()
                .ok_or(StartupError::MissingCredentials)?;
            let store = GoogleSheetsStore::from_json(credentials)?;
            info!("Using Google Sheets as {}", store.caller_identity());
            Ok(Arc::new(store))
        }
    }
}

pub fn build_authenticator(settings: &Settings) -> Result<Authenticator, StartupError> {
    let secs = i64::try_from(settings.jwks_ttl_secs).unwrap_or(i64::from(u32::MAX));
    let ttl = chrono::Duration::seconds(secs.min(i64::from(u32::MAX)));
    Ok(Authenticator::from_parts(
        settings.jwks_url.as_deref(),
        ttl,
        settings.secret_key.as_deref(),
        Arc::new(SystemClock),
    )?)
}

pub fn open_registry(settings: &Settings) -> Result<EndpointRegistry, StartupError> {
    let path = settings.database_path();
    info!("Opening endpoint registry at {}", path.display());
    Ok(EndpointRegistry::open(&path)?)
}

/// Registry plus store, for commands that do not serve HTTP.
pub fn build_api(settings: &Settings) -> Result<SheetsApi, StartupError> {
    Ok(SheetsApi::new(open_registry(settings)?, build_store(settings)?))
}

pub async fn serve(settings: Settings) -> Result<(), StartupError> {
    let addr: SocketAddr = settings
        .bind
        .parse()
        .map_err(|_| StartupError::BindAddress(settings.bind.clone()))?;

    let state = Arc::new(AppState::new(
        build_api(&settings)?,
        build_authenticator(&settings)?,
    ));
    let app = api::router(state, &settings.cors_origins);

    let listener = TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
