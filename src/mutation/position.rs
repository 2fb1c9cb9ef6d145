// src/mutation/position.rs
//! Logical row positions and their mapping to physical sheet rows.
//!
//! Logical index `i` is 0-based over data rows; the header occupies physical
//! row 1, so the row lives at physical row `i + 2`. The mapping holds only
//! until a structural change lands above the row.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::error::ServiceError;

/// Physical row of logical index 0.
pub const FIRST_DATA_ROW: u32 = 2;

pub fn absolute_row(logical_index: u32) -> Result<u32, ServiceError> {
    logical_index.checked_add(FIRST_DATA_ROW).ok_or_else(|| {
        ServiceError::invalid(format!("Row index {} is out of range", logical_index))
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InsertPosition {
    /// Below the last row of the table.
    #[default]
    End,
    /// Directly below the header.
    Beginning,
    /// So that the new row gets this logical index.
    Index(u32),
}

impl InsertPosition {
    /// Physical row a structural insert targets; `None` for `End`, which the
    /// store resolves itself.
    pub fn absolute_row(self) -> Result<Option<u32>, ServiceError> {
        Ok(match self {
            InsertPosition::End => None,
            InsertPosition::Beginning => Some(FIRST_DATA_ROW),
            InsertPosition::Index(i) => Some(absolute_row(i)?),
        })
    }
}

impl FromStr for InsertPosition {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "end" => Ok(InsertPosition::End),
            "beg" => Ok(InsertPosition::Beginning),
            other => other.parse::<u32>().map(InsertPosition::Index).map_err(|_| {
                ServiceError::invalid(format!(
                    "Invalid position '{}': use 'end', 'beg', or a non-negative row index",
                    other
                ))
            }),
        }
    }
}

impl fmt::Display for InsertPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsertPosition::End => write!(f, "end"),
            InsertPosition::Beginning => write!(f, "beg"),
            InsertPosition::Index(i) => write!(f, "{}", i),
        }
    }
}

impl Serialize for InsertPosition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Parse a logical row index from a path segment.
pub fn parse_row_index(text: &str) -> Result<u32, ServiceError> {
    text.trim().parse::<u32>().map_err(|_| {
        ServiceError::invalid(format!(
            "Invalid row index '{}': must be a non-negative integer",
            text
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_positions() {
        assert_eq!("end".parse::<InsertPosition>().unwrap(), InsertPosition::End);
        assert_eq!("beg".parse::<InsertPosition>().unwrap(), InsertPosition::Beginning);
        assert_eq!("4".parse::<InsertPosition>().unwrap(), InsertPosition::Index(4));
        assert!("-1".parse::<InsertPosition>().is_err());
        assert!("middle".parse::<InsertPosition>().is_err());
        assert!("".parse::<InsertPosition>().is_err());
    }

    #[test]
    fn test_absolute_rows() {
        assert_eq!(absolute_row(0).unwrap(), 2);
        assert_eq!(InsertPosition::Beginning.absolute_row().unwrap(), Some(2));
        assert_eq!(InsertPosition::Index(3).absolute_row().unwrap(), Some(5));
        assert_eq!(InsertPosition::End.absolute_row().unwrap(), None);
        assert_eq!(InsertPosition::Index(7).to_string(), "7");
    }

    #[test]
    fn test_huge_indices_do_not_collapse_onto_one_row() {
        assert_eq!(absolute_row(u32::MAX - 2).unwrap(), u32::MAX);
        let err = absolute_row(u32::MAX - 1).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)), "{:?}", err);
        assert!(absolute_row(u32::MAX).is_err());
        assert!(InsertPosition::Index(u32::MAX).absolute_row().is_err());
    }

    #[test]
    fn test_parse_row_index() {
        assert_eq!(parse_row_index("0").unwrap(), 0);
        assert_eq!(parse_row_index("12").unwrap(), 12);
        assert!(parse_row_index("abc").is_err());
        assert!(parse_row_index("-3").is_err());
    }
}
