// src/registry/reader.rs

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::error::{DbError, DbResult};
use super::helpers::{build_select_sql, ENDPOINTS_TABLE, SELECT_COLUMNS};
use super::EndpointRecord;

pub struct DbReader;

impl DbReader {
    pub fn find_by_key(conn: &Connection, key: &str) -> DbResult<Option<EndpointRecord>> {
        let sql = build_select_sql(ENDPOINTS_TABLE, &SELECT_COLUMNS, "endpoint_key = ?1");
        let raw = conn
            .query_row(&sql, params![key], RawRecord::from_row)
            .optional()?;
        raw.map(RawRecord::into_record).transpose()
    }

    /// Every endpoint owned by `owner`, oldest first.
    pub fn list_for_owner(conn: &Connection, owner: &str) -> DbResult<Vec<EndpointRecord>> {
        let sql = build_select_sql(
            ENDPOINTS_TABLE,
            &SELECT_COLUMNS,
            "user_id = ?1 ORDER BY created_at, id",
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![owner], RawRecord::from_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?.into_record()?);
        }
        Ok(records)
    }
}

/// Column values as stored, before timestamp parsing.
struct RawRecord {
    id: i64,
    owner: String,
    name: String,
    spreadsheet_id: String,
    range: String,
    key: String,
    endpoint_path: String,
    created_at: String,
    updated_at: String,
}

impl RawRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner: row.get(1)?,
            name: row.get(2)?,
            spreadsheet_id: row.get(3)?,
            range: row.get(4)?,
            key: row.get(5)?,
            endpoint_path: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn into_record(self) -> DbResult<EndpointRecord> {
        Ok(EndpointRecord {
            id: self.id,
            created_at: parse_timestamp(&self.key, &self.created_at)?,
            updated_at: parse_timestamp(&self.key, &self.updated_at)?,
            key: self.key,
            owner: self.owner,
            name: self.name,
            spreadsheet_id: self.spreadsheet_id,
            range: self.range,
            endpoint_path: self.endpoint_path,
        })
    }
}

fn parse_timestamp(key: &str, text: &str) -> DbResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DbError::InvalidRecord(format!("endpoint {}: bad timestamp '{}': {}", key, text, e)))
}
