// src/sheets/store.rs
//! Backing-store abstraction for spreadsheet range operations.
//!
//! Architecture:
//! - Value operations (read/write/append) address cells by A1 range
//! - Structural operations (insert/delete row) address a numeric sheet id
//!   and a 1-based physical row
//! - Implementations never retry; callers decide how to surface failures

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Properties of one sheet (tab) inside a spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetProperties {
    pub sheet_id: i64,
    pub title: String,
    pub index: u32,
}

/// What a value write touched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WriteSummary {
    pub updated_range: String,
    pub updated_rows: u32,
}

/// Result of probing the calling credential's access to a spreadsheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccessReport {
    pub readable: bool,
    pub writable: bool,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("credentials error: {0}")]
    Credentials(String),
    #[error("malformed response: {0}")]
    Decode(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Whether the failure carries the authorization-failure signature.
    pub fn is_permission_denied(&self) -> bool {
        if let StoreError::Api { status: 403, .. } = self {
            return true;
        }
        let text = self.to_string();
        text.contains("403") && text.to_lowercase().contains("permission")
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            StoreError::Decode(e.to_string())
        } else {
            StoreError::Transport(e.to_string())
        }
    }
}

#[async_trait]
pub trait SpreadsheetStore: Send + Sync + fmt::Debug {
    /// Read a rectangular range. Trailing empty rows and cells may be omitted.
    async fn read_range(&self, spreadsheet_id: &str, range: &str) -> StoreResult<Vec<Vec<String>>>;

    /// Overwrite cells starting at the top-left of `range`.
    async fn write_range(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> StoreResult<WriteSummary>;

    /// Write `values` below the last row of the table found in `range`.
    async fn append_rows(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> StoreResult<WriteSummary>;

    /// Insert one empty row so that it becomes physical row `absolute_row`.
    async fn insert_row(&self, spreadsheet_id: &str, sheet_id: i64, absolute_row: u32) -> StoreResult<()>;

    /// Delete physical row `absolute_row`, shifting later rows up.
    async fn delete_row(&self, spreadsheet_id: &str, sheet_id: i64, absolute_row: u32) -> StoreResult<()>;

    /// Sheets of a spreadsheet, in tab order.
    async fn sheet_properties(&self, spreadsheet_id: &str) -> StoreResult<Vec<SheetProperties>>;

    async fn check_access(&self, spreadsheet_id: &str) -> StoreResult<AccessReport>;

    /// Identity of the calling credential (e.g. a service-account email).
    fn caller_identity(&self) -> String;
}
