// src/mutation/codec.rs
//! Conversion between header-ordered rows and field-keyed records.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{ServiceError, ServiceResult};

/// Header name to cell text.
pub type Record = BTreeMap<String, String>;

/// Cell text for a JSON value: strings as-is, `null` as empty, anything else
/// as its compact JSON text.
pub fn coerce_cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Build a record from a JSON request body, which must be an object.
pub fn record_from_json(body: &Value) -> ServiceResult<Record> {
    let Value::Object(map) = body else {
        return Err(ServiceError::invalid("Request body must be a JSON object"));
    };
    Ok(map
        .iter()
        .map(|(field, value)| (field.clone(), coerce_cell(value)))
        .collect())
}

/// One cell per header, in header order; fields the record lacks become `""`.
/// Fields not named by any header are dropped.
pub fn encode(headers: &[String], record: &Record) -> Vec<String> {
    headers
        .iter()
        .map(|header| record.get(header).cloned().unwrap_or_default())
        .collect()
}

/// Record keyed by header; short rows pad with `""`, extra cells are ignored.
pub fn decode(headers: &[String], raw_row: &[String]) -> Record {
    headers
        .iter()
        .enumerate()
        .map(|(i, header)| (header.clone(), raw_row.get(i).cloned().unwrap_or_default()))
        .collect()
}
