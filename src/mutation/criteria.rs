// src/mutation/criteria.rs

use std::collections::BTreeMap;

use serde::Serialize;

use super::codec::decode;
use crate::error::{ServiceError, ServiceResult};

/// Non-empty set of field = value equality constraints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Criteria(BTreeMap<String, String>);

impl Criteria {
    pub fn new(fields: BTreeMap<String, String>) -> ServiceResult<Self> {
        if fields.is_empty() {
            return Err(ServiceError::invalid(
                "At least one field criteria must be provided",
            ));
        }
        Ok(Self(fields))
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.0
    }

    /// Logical indices of the rows that satisfy every constraint, ascending.
    pub fn matching_indices(&self, headers: &[String], rows: &[Vec<String>]) -> Vec<usize> {
        rows.iter()
            .enumerate()
            .filter(|(_, row)| matches(row, headers, &self.0))
            .map(|(i, _)| i)
            .collect()
    }
}

impl TryFrom<BTreeMap<String, String>> for Criteria {
    type Error = ServiceError;

    fn try_from(fields: BTreeMap<String, String>) -> ServiceResult<Self> {
        Self::new(fields)
    }
}

/// Whether `raw_row` decodes to a record where every criterion's field is a
/// header and its value is exactly equal. An empty set matches every row.
pub fn matches(raw_row: &[String], headers: &[String], criteria: &BTreeMap<String, String>) -> bool {
    let record = decode(headers, raw_row);
    criteria
        .iter()
        .all(|(field, expected)| record.get(field) == Some(expected))
}
