// src/registry/mod.rs
//! Persistent mapping from generated endpoint keys to sheet references.
//!
//! - `connection`: opening the SQLite file with WAL and the schema in place
//! - `reader` / `writer`: the queries; all row writes live in `writer`
//! - `helpers`: SQL text builders

pub mod connection;
pub mod error;
pub mod helpers;
pub mod reader;
pub mod writer;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::Connection;
use serde::Serialize;

pub use connection::DbConnection;
pub use error::{DbError, DbResult};
pub use reader::DbReader;
pub use writer::DbWriter;

use crate::sheets::reference::SheetReference;

/// Path prefix under which generated endpoints are served.
pub const ENDPOINT_PATH_PREFIX: &str = "/api/v1/data";

/// One registered endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointRecord {
    #[serde(skip)]
    pub id: i64,
    pub key: String,
    #[serde(rename = "user_id")]
    pub owner: String,
    pub name: String,
    #[serde(rename = "sheet_id")]
    pub spreadsheet_id: String,
    #[serde(rename = "sheet_range")]
    pub range: String,
    pub endpoint_path: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EndpointRecord {
    pub fn reference(&self) -> SheetReference {
        SheetReference::new(self.spreadsheet_id.clone(), Some(&self.range))
    }
}

pub fn endpoint_path(key: &str) -> String {
    format!("{}/{}", ENDPOINT_PATH_PREFIX, key)
}

/// Registry database location under the platform data dir.
pub fn default_database_path() -> PathBuf {
    directories_next::ProjectDirs::from("", "", "sheetrest")
        .map(|dirs| dirs.data_dir().join("registry.db"))
        .unwrap_or_else(|| PathBuf::from("registry.db"))
}

/// Shared handle to the registry database.
#[derive(Debug, Clone)]
pub struct EndpointRegistry {
    conn: Arc<Mutex<Connection>>,
}

impl EndpointRegistry {
    pub fn open(path: &Path) -> DbResult<Self> {
        Ok(Self::from_connection(DbConnection::open(path)?))
    }

    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self::from_connection(DbConnection::open_in_memory()?))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Create a new endpoint for `owner` bound to `reference`.
    pub fn register(&self, owner: &str, name: &str, reference: &SheetReference) -> DbResult<EndpointRecord> {
        let key = uuid::Uuid::new_v4().simple().to_string();
        // Stored timestamps carry whole seconds
        let now = Utc::now().trunc_subsecs(0);
        let mut record = EndpointRecord {
            id: 0,
            endpoint_path: endpoint_path(&key),
            key,
            owner: owner.to_string(),
            name: name.to_string(),
            spreadsheet_id: reference.spreadsheet_id.clone(),
            range: reference.range.clone(),
            created_at: now,
            updated_at: now,
        };
        record.id = DbWriter::insert_endpoint(&self.lock(), &record)?;
        Ok(record)
    }

    pub fn find_by_key(&self, key: &str) -> DbResult<Option<EndpointRecord>> {
        DbReader::find_by_key(&self.lock(), key)
    }

    pub fn list_for_owner(&self, owner: &str) -> DbResult<Vec<EndpointRecord>> {
        DbReader::list_for_owner(&self.lock(), owner)
    }

    /// Remove `key` if `owner` owns it. Returns whether a row was removed.
    pub fn remove(&self, owner: &str, key: &str) -> DbResult<bool> {
        Ok(DbWriter::delete_endpoint(&self.lock(), owner, key)? > 0)
    }
}
