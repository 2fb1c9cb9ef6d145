// src/settings/mod.rs
//! Runtime configuration.
//!
//! Layers, later wins: defaults, `settings.json` in the platform config dir,
//! `.env`, the process environment, then CLI flags.

pub mod io;

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::registry::default_database_path;

pub const DEFAULT_BIND: &str = "127.0.0.1:8000";
pub const DEFAULT_JWKS_TTL_SECS: u64 = 3600;
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Google,
    Memory,
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(StoreKind::Google),
            "memory" => Ok(StoreKind::Memory),
            _ => Err("expected 'google' or 'memory'".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err("expected 'text' or 'json'".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub bind: String,
    /// Registry database; `None` means the platform data dir.
    pub database: Option<PathBuf>,
    pub store: StoreKind,
    /// Service-account key JSON.
    #[serde(skip_serializing)]
    pub google_credentials: Option<String>,
    pub jwks_url: Option<String>,
    pub jwks_ttl_secs: u64,
    /// HS256 secret for locally issued tokens.
    #[serde(skip_serializing)]
    pub secret_key: Option<String>,
    pub cors_origins: Vec<String>,
    /// `tracing` env-filter directive.
    pub log: String,
    pub log_format: LogFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            database: None,
            store: StoreKind::Google,
            google_credentials: None,
            jwks_url: None,
            jwks_ttl_secs: DEFAULT_JWKS_TTL_SECS,
            secret_key: None,
            cors_origins: vec![DEFAULT_CORS_ORIGIN.to_string()],
            log: "info".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

fn parse<T: FromStr>(key: &'static str, value: String) -> Result<T, SettingsError>
where
    T::Err: std::fmt::Display,
{
    value.parse::<T>().map_err(|e| SettingsError::Invalid {
        key,
        reason: e.to_string(),
        value,
    })
}

/// Files that contributed to the loaded settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsSources {
    pub config_file: Option<PathBuf>,
    pub dotenv_file: Option<PathBuf>,
}

impl SettingsSources {
    /// Report where settings came from. Call once logging is initialised.
    pub fn log(&self, settings: &Settings) {
        match &self.config_file {
            Some(path) => info!("Settings: Loaded {}", path.display()),
            None => info!("Settings: No settings file, using defaults"),
        }
        if let Some(path) = &self.dotenv_file {
            info!("Settings: Applied {}", path.display());
        }
        info!(
            bind = %settings.bind,
            store = ?settings.store,
            database = %settings.database_path().display(),
            "Settings: Effective configuration"
        );
    }
}

impl Settings {
    /// File layer, then `.env`, then the process environment.
    pub fn load() -> Result<(Self, SettingsSources), SettingsError> {
        let mut sources = SettingsSources::default();
        let mut settings = match io::load_settings_from_file::<Settings>()? {
            Some((settings, path)) => {
                sources.config_file = Some(path);
                settings
            }
            None => Settings::default(),
        };
        // A missing .env is normal
        sources.dotenv_file = dotenvy::dotenv().ok();
        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok((settings, sources))
    }

    /// Overlay values found through `lookup` (normally the process environment).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("SHEETREST_BIND") {
            self.bind = v;
        }
        if let Some(v) = get("SHEETREST_DATABASE") {
            self.database = Some(PathBuf::from(v));
        }
        if let Some(v) = get("SHEETREST_STORE") {
            self.store = parse("SHEETREST_STORE", v)?;
        }
        if let Some(v) = get("GOOGLE_CREDENTIALS") {
            self.google_credentials = Some(v);
        }
        if let Some(v) = get("SHEETREST_JWKS_URL") {
            self.jwks_url = Some(v);
        }
        if let Some(v) = get("SHEETREST_JWKS_TTL_SECS") {
            self.jwks_ttl_secs = parse("SHEETREST_JWKS_TTL_SECS", v)?;
        }
        if let Some(v) = get("SECRET_KEY") {
            self.secret_key = Some(v);
        }
        if let Some(v) = get("SHEETREST_CORS_ORIGINS") {
            self.cors_origins = v
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(v) = get("SHEETREST_LOG") {
            self.log = v;
        }
        if let Some(v) = get("SHEETREST_LOG_FORMAT") {
            self.log_format = parse("SHEETREST_LOG_FORMAT", v)?;
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.database.clone().unwrap_or_else(default_database_path)
    }
}
