// src/registry/writer.rs
// The only place registry rows are written

use rusqlite::{params, Connection};
use tracing::info;

use super::error::DbResult;
use super::helpers::{build_delete_sql, build_insert_sql, ENDPOINTS_TABLE, INSERT_COLUMNS};
use super::EndpointRecord;

pub struct DbWriter;

impl DbWriter {
    /// Insert a new endpoint row; returns its rowid.
    pub fn insert_endpoint(conn: &Connection, record: &EndpointRecord) -> DbResult<i64> {
        let sql = build_insert_sql(ENDPOINTS_TABLE, &INSERT_COLUMNS);
        conn.execute(
            &sql,
            params![
                record.owner,
                record.name,
                record.spreadsheet_id,
                record.range,
                record.key,
                record.endpoint_path,
                record.created_at.to_rfc3339(),
                record.updated_at.to_rfc3339(),
            ],
        )?;
        let id = conn.last_insert_rowid();
        info!("Registered endpoint '{}' ({}) for {}", record.name, record.key, record.owner);
        Ok(id)
    }

    /// Delete `key` if `owner` owns it. Returns the number of rows removed.
    pub fn delete_endpoint(conn: &Connection, owner: &str, key: &str) -> DbResult<usize> {
        let sql = build_delete_sql(ENDPOINTS_TABLE, "user_id = ?1 AND endpoint_key = ?2");
        let removed = conn.execute(&sql, params![owner, key])?;
        if removed > 0 {
            info!("Removed endpoint {} for {}", key, owner);
        }
        Ok(removed)
    }
}
