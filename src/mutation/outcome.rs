// src/mutation/outcome.rs

use serde::Serialize;

use super::criteria::Criteria;
use super::position::InsertPosition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressingMethod {
    IndexBased,
    FieldBased,
}

/// Result of a mutation, serialized as the response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationOutcome {
    pub message: String,
    pub method: AddressingMethod,
    pub rows_affected: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<InsertPosition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matching_rows: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub criteria: Option<Criteria>,
}

impl MutationOutcome {
    pub fn index_based(message: impl Into<String>, rows_affected: u32) -> Self {
        Self::new(AddressingMethod::IndexBased, message, rows_affected)
    }

    pub fn field_based(message: impl Into<String>, rows_affected: u32, criteria: &Criteria) -> Self {
        let mut outcome = Self::new(AddressingMethod::FieldBased, message, rows_affected);
        outcome.criteria = Some(criteria.clone());
        outcome
    }

    fn new(method: AddressingMethod, message: impl Into<String>, rows_affected: u32) -> Self {
        Self {
            message: message.into(),
            method,
            rows_affected,
            updated_range: None,
            row_index: None,
            position: None,
            matching_rows: None,
            criteria: None,
        }
    }

    pub fn with_range(mut self, range: impl Into<String>) -> Self {
        let range = range.into();
        self.updated_range = (!range.is_empty()).then_some(range);
        self
    }

    pub fn with_row_index(mut self, row_index: u32) -> Self {
        self.row_index = Some(row_index);
        self
    }

    pub fn with_position(mut self, position: InsertPosition) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_matching_rows(mut self, matching_rows: usize) -> Self {
        self.matching_rows = Some(matching_rows);
        self
    }
}
