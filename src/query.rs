// src/query.rs
//! Read-side shaping: sorting, pagination and structure analysis.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{ServiceError, ServiceResult};
use crate::mutation::SheetTable;

pub const DEFAULT_LIMIT: u32 = 100;
pub const MAX_LIMIT: u32 = 1000;

/// Rows shown in debug and analysis samples.
const SAMPLE_ROWS: usize = 5;

/// Headers checked by structure analysis when the caller names none.
pub const DEFAULT_REQUIRED_HEADERS: [&str; 3] = ["id", "name", "created_at"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(ServiceError::invalid(format!(
                "Invalid sort_order '{}': use 'asc' or 'desc'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOptions {
    pub limit: u32,
    pub offset: u32,
    pub sort_by: Option<String>,
    pub sort_order: SortOrder,
    pub debug: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
            sort_by: None,
            sort_order: SortOrder::Asc,
            debug: false,
        }
    }
}

impl ReadOptions {
    pub fn validate(&self) -> ServiceResult<()> {
        if !(1..=MAX_LIMIT).contains(&self.limit) {
            return Err(ServiceError::invalid(format!(
                "limit must be between 1 and {}",
                MAX_LIMIT
            )));
        }
        Ok(())
    }
}

/// Sort key of one cell.
#[derive(Debug, Clone, PartialEq)]
enum SortKey {
    Number(f64),
    Text(String),
    Empty,
}

impl SortKey {
    fn of(value: &str) -> Self {
        if value.is_empty() {
            return SortKey::Empty;
        }
        let digits: String = value.chars().filter(|c| *c != '.' && *c != '-').collect();
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            // "1-2" or "1.2.3" look numeric but do not parse; they sort as text
            if let Ok(n) = value.parse::<f64>() {
                return SortKey::Number(n);
            }
        }
        SortKey::Text(value.to_lowercase())
    }
}

/// Empty values go last in both directions; numbers come before text.
fn compare(a: &SortKey, b: &SortKey, order: SortOrder) -> Ordering {
    let base = match (a, b) {
        (SortKey::Empty, SortKey::Empty) => return Ordering::Equal,
        (SortKey::Empty, _) => return Ordering::Greater,
        (_, SortKey::Empty) => return Ordering::Less,
        (SortKey::Number(x), SortKey::Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (SortKey::Number(_), SortKey::Text(_)) => Ordering::Less,
        (SortKey::Text(_), SortKey::Number(_)) => Ordering::Greater,
        (SortKey::Text(x), SortKey::Text(y)) => x.cmp(y),
    };
    match order {
        SortOrder::Asc => base,
        SortOrder::Desc => base.reverse(),
    }
}

/// Stable sort of `rows` by the header matching `column` case-insensitively.
/// Returns the matched header, or `None` (order untouched) if none matches.
pub fn sort_rows(
    headers: &[String],
    rows: &mut [Vec<String>],
    column: &str,
    order: SortOrder,
) -> Option<String> {
    let wanted = column.to_lowercase();
    let Some(index) = headers.iter().position(|h| h.to_lowercase() == wanted) else {
        warn!("Sort column '{}' not found. Available columns: {:?}", column, headers);
        return None;
    };
    rows.sort_by(|a, b| {
        let ka = SortKey::of(a.get(index).map(String::as_str).unwrap_or(""));
        let kb = SortKey::of(b.get(index).map(String::as_str).unwrap_or(""));
        compare(&ka, &kb, order)
    });
    Some(headers[index].clone())
}

/// One JSON object per row, keys in header order; short rows pad with `""`.
pub fn row_object(headers: &[String], row: &[String]) -> Map<String, Value> {
    headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h.clone(), Value::String(row.get(i).cloned().unwrap_or_default())))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub total: usize,
    pub limit: u32,
    pub offset: u32,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointInfo {
    pub name: String,
    pub sheet_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadDebug {
    pub available_columns: Vec<String>,
    pub sort_by_requested: Option<String>,
    pub sort_column: Option<String>,
    pub sort_order_requested: SortOrder,
    pub total_rows: usize,
    pub sample_data: Vec<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadPage {
    pub data: Vec<Map<String, Value>>,
    pub pagination: Pagination,
    pub endpoint_info: EndpointInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<ReadDebug>,
}

/// Sort, then slice `table` into the page `options` asks for.
pub fn build_page(table: SheetTable, options: &ReadOptions, endpoint_info: EndpointInfo) -> ReadPage {
    let SheetTable { headers, mut rows } = table;

    let sort_column = options
        .sort_by
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .and_then(|column| sort_rows(&headers, &mut rows, column, options.sort_order));

    let total = rows.len();
    let data: Vec<Map<String, Value>> = rows
        .iter()
        .skip(options.offset as usize)
        .take(options.limit as usize)
        .map(|row| row_object(&headers, row))
        .collect();

    let debug = options.debug.then(|| ReadDebug {
        available_columns: headers.clone(),
        sort_by_requested: options.sort_by.clone(),
        sort_column,
        sort_order_requested: options.sort_order,
        total_rows: data.len(),
        sample_data: data.iter().take(2).cloned().collect(),
    });

    ReadPage {
        pagination: Pagination {
            total,
            limit: options.limit,
            offset: options.offset,
            has_more: (options.offset as usize).saturating_add(options.limit as usize) < total,
        },
        data,
        endpoint_info,
        debug,
    }
}

/// How a sheet's layout compares to an expected set of headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructureReport {
    pub valid: bool,
    /// Header cells trimmed and lowercased, blanks dropped.
    pub headers: Vec<String>,
    pub missing_headers: Vec<String>,
    pub suggestions: Vec<String>,
    pub has_headers: bool,
    pub num_columns: usize,
    pub num_rows: usize,
    pub sample_data: Vec<Vec<String>>,
}

fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase()
}

/// Compare the first row of `rows` with `required` (case and surrounding
/// whitespace ignored).
pub fn analyze_structure(rows: &[Vec<String>], required: &[String]) -> StructureReport {
    let headers: Vec<String> = rows
        .first()
        .map(|first| {
            first
                .iter()
                .map(|h| normalize_header(h))
                .filter(|h| !h.is_empty())
                .collect()
        })
        .unwrap_or_default();
    let present: BTreeSet<&str> = headers.iter().map(String::as_str).collect();

    let mut missing = Vec::new();
    let mut seen = BTreeSet::new();
    for wanted in required.iter().map(|r| normalize_header(r)).filter(|r| !r.is_empty()) {
        if !present.contains(wanted.as_str()) && seen.insert(wanted.clone()) {
            missing.push(wanted);
        }
    }

    let mut suggestions = Vec::new();
    if rows.is_empty() {
        suggestions.push("Sheet is empty: add headers in row 1".to_string());
    } else if headers.is_empty() {
        suggestions.push("Consider adding headers in row 1".to_string());
    }
    for wanted in &missing {
        let near = headers
            .iter()
            .find(|h| h.replace(['_', ' ', '-'], "") == wanted.replace(['_', ' ', '-'], ""));
        match near {
            Some(h) => suggestions.push(format!("Rename column '{}' to '{}'", h, wanted)),
            None => suggestions.push(format!("Add required column '{}'", wanted)),
        }
    }
    if !rows.is_empty() {
        suggestions.push("Use consistent data types per column".to_string());
    }

    StructureReport {
        valid: !rows.is_empty() && missing.is_empty(),
        has_headers: !headers.is_empty(),
        num_columns: rows.first().map(Vec::len).unwrap_or(0),
        num_rows: rows.len().saturating_sub(1),
        sample_data: rows.iter().take(SAMPLE_ROWS).cloned().collect(),
        headers,
        missing_headers: missing,
        suggestions,
    }
}

/// Values exactly as the store returned them, with their shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawSheet {
    pub raw_data: Vec<Vec<String>>,
    pub num_rows: usize,
    pub row_lengths: Vec<usize>,
    pub first_row: Vec<String>,
    /// Up to four rows after the first.
    pub sample_rows: Vec<Vec<String>>,
}

pub fn raw_sheet(rows: Vec<Vec<String>>) -> RawSheet {
    RawSheet {
        num_rows: rows.len(),
        row_lengths: rows.iter().map(Vec::len).collect(),
        first_row: rows.first().cloned().unwrap_or_default(),
        sample_rows: rows.iter().skip(1).take(SAMPLE_ROWS - 1).cloned().collect(),
        raw_data: rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[&[&str]]) -> SheetTable {
        let mut rows: Vec<Vec<String>> = rows
            .iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect();
        let headers = rows.remove(0);
        SheetTable { headers, rows }
    }

    fn info() -> EndpointInfo {
        EndpointInfo {
            name: "People".into(),
            sheet_id: "people-sheet".into(),
            created_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        }
    }

    fn column(page: &ReadPage, name: &str) -> Vec<String> {
        page.data
            .iter()
            .map(|row| row[name].as_str().unwrap_or_default().to_string())
            .collect()
    }

    fn scores() -> SheetTable {
        table(&[
            &["Name", "Score"],
            &["a", "10"],
            &["b", ""],
            &["c", "9"],
            &["d", "-2.5"],
            &["e", "n/a"],
            &["f", "100"],
        ])
    }

    #[test]
    fn test_numeric_sort_with_empties_last() {
        let options = ReadOptions {
            sort_by: Some("score".into()),
            ..ReadOptions::default()
        };
        let page = build_page(scores(), &options, info());
        assert_eq!(column(&page, "Name"), vec!["d", "c", "a", "f", "e", "b"]);

        let desc = ReadOptions {
            sort_order: SortOrder::Desc,
            ..options
        };
        let page = build_page(scores(), &desc, info());
        assert_eq!(column(&page, "Name"), vec!["e", "f", "a", "c", "d", "b"]);
    }

    #[test]
    fn test_text_sort_is_case_insensitive_and_stable() {
        let t = table(&[&["k", "v"], &["1", "beta"], &["2", "Alpha"], &["3", "alpha"]]);
        let options = ReadOptions {
            sort_by: Some("V".into()),
            ..ReadOptions::default()
        };
        let page = build_page(t, &options, info());
        assert_eq!(column(&page, "k"), vec!["2", "3", "1"]);
    }

    #[test]
    fn test_unknown_sort_column_keeps_order() {
        let options = ReadOptions {
            sort_by: Some("missing".into()),
            debug: true,
            ..ReadOptions::default()
        };
        let page = build_page(scores(), &options, info());
        assert_eq!(column(&page, "Name"), vec!["a", "b", "c", "d", "e", "f"]);
        assert_eq!(page.debug.unwrap().sort_column, None);
    }

    #[test]
    fn test_pagination() {
        let options = ReadOptions {
            limit: 4,
            offset: 2,
            ..ReadOptions::default()
        };
        let page = build_page(scores(), &options, info());
        assert_eq!(column(&page, "Name"), vec!["c", "d", "e", "f"]);
        assert_eq!(page.pagination.total, 6);
        assert!(!page.pagination.has_more);

        let first = ReadOptions {
            limit: 5,
            ..ReadOptions::default()
        };
        assert!(build_page(scores(), &first, info()).pagination.has_more);

        let past_end = ReadOptions {
            offset: 50,
            ..ReadOptions::default()
        };
        assert!(build_page(scores(), &past_end, info()).data.is_empty());
    }

    #[test]
    fn test_short_rows_pad_in_header_order() {
        let t = table(&[&["id", "name", "status"], &["1"]]);
        let page = build_page(t, &ReadOptions::default(), info());
        let keys: Vec<&String> = page.data[0].keys().collect();
        assert_eq!(keys, vec!["id", "name", "status"]);
        assert_eq!(page.data[0]["status"], "");
    }

    #[test]
    fn test_limit_validation() {
        assert!(ReadOptions::default().validate().is_ok());
        let zero = ReadOptions {
            limit: 0,
            ..ReadOptions::default()
        };
        assert!(zero.validate().is_err());
        let huge = ReadOptions {
            limit: 1001,
            ..ReadOptions::default()
        };
        assert!(huge.validate().is_err());
        assert!("sideways".parse::<SortOrder>().is_err());
    }

    #[test]
    fn test_analyze_structure() {
        let rows = vec![
            vec![" ID ".to_string(), "Full Name".to_string(), "created-at".to_string()],
            vec!["1".to_string(), "Alice".to_string(), "2024-01-01".to_string()],
        ];
        let required = vec!["id".to_string(), "name".to_string(), "created_at".to_string()];
        let report = analyze_structure(&rows, &required);

        assert!(!report.valid);
        assert_eq!(report.headers, vec!["id", "full name", "created-at"]);
        assert_eq!(report.missing_headers, vec!["name", "created_at"]);
        assert!(report
            .suggestions
            .contains(&"Rename column 'created-at' to 'created_at'".to_string()));
        assert!(report.suggestions.contains(&"Add required column 'name'".to_string()));
        assert_eq!(report.num_rows, 1);
        assert_eq!(report.num_columns, 3);

        let empty = analyze_structure(&[], &required);
        assert!(!empty.valid);
        assert!(!empty.has_headers);
    }

    #[test]
    fn test_raw_sheet_keeps_ragged_rows() {
        let rows: Vec<Vec<String>> = vec![
            vec!["id".into(), "name".into()],
            vec!["1".into()],
            vec![],
            vec!["3".into(), "Carol".into(), "extra".into()],
            vec!["4".into()],
            vec!["5".into()],
        ];
        let raw = raw_sheet(rows.clone());
        assert_eq!(raw.num_rows, 6);
        assert_eq!(raw.row_lengths, vec![2, 1, 0, 3, 1, 1]);
        assert_eq!(raw.first_row, vec!["id", "name"]);
        assert_eq!(raw.sample_rows, rows[1..5].to_vec());
        assert_eq!(raw.raw_data, rows);

        let empty = raw_sheet(Vec::new());
        assert_eq!(empty.num_rows, 0);
        assert!(empty.first_row.is_empty());
        assert!(empty.sample_rows.is_empty());
    }
}
