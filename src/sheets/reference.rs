// src/sheets/reference.rs

use serde::{Deserialize, Serialize};

use super::a1::{column_letters, A1Range};

/// Range used when a registration does not name one.
pub const DEFAULT_RANGE: &str = "A1:Z1000";

/// Physical row holding the headers.
pub const HEADER_ROW: u32 = 1;

/// A rectangular region of a spreadsheet an endpoint is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetReference {
    pub spreadsheet_id: String,
    pub range: String,
}

impl SheetReference {
    pub fn new(spreadsheet_id: impl Into<String>, range: Option<&str>) -> Self {
        let range = range
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_RANGE);
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            range: range.to_string(),
        }
    }

    fn parsed(&self) -> A1Range {
        A1Range::parse(&self.range).unwrap_or(A1Range {
            sheet: None,
            start_col: 0,
            start_row: Some(1),
            end_col: None,
            end_row: None,
        })
    }

    /// Title of the sheet the range names, if it names one.
    pub fn sheet_title(&self) -> Option<String> {
        self.parsed().sheet
    }

    /// Range covering the header row across the reference's columns.
    pub fn header_range(&self) -> String {
        self.row_range(HEADER_ROW)
    }

    /// Range covering one physical row across the reference's columns.
    pub fn row_range(&self, absolute_row: u32) -> String {
        let parsed = self.parsed();
        format!(
            "{}{}{}:{}{}",
            parsed.sheet_prefix(),
            column_letters(parsed.start_col),
            absolute_row,
            column_letters(parsed.last_col()),
            absolute_row
        )
    }

    /// Range holding the header plus every data row: the reference's
    /// columns, starting at the header row.
    pub fn table_range(&self) -> String {
        let parsed = self.parsed();
        format!(
            "{}{}{}:{}{}",
            parsed.sheet_prefix(),
            column_letters(parsed.start_col),
            HEADER_ROW,
            column_letters(parsed.last_col()),
            parsed.end_row.map(|r| r.to_string()).unwrap_or_default()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_range() {
        let r = SheetReference::new("sheet-1", None);
        assert_eq!(r.range, DEFAULT_RANGE);
        assert_eq!(r.header_range(), "A1:Z1");
        assert_eq!(r.row_range(7), "A7:Z7");
        assert_eq!(r.table_range(), "A1:Z1000");
        assert_eq!(r.sheet_title(), None);

        let blank = SheetReference::new("sheet-1", Some("  "));
        assert_eq!(blank.range, DEFAULT_RANGE);
    }

    #[test]
    fn test_prefixed_range_keeps_sheet_and_columns() {
        let r = SheetReference::new("sheet-1", Some("'Team Roster'!B1:F200"));
        assert_eq!(r.sheet_title().as_deref(), Some("Team Roster"));
        assert_eq!(r.header_range(), "'Team Roster'!B1:F1");
        assert_eq!(r.row_range(12), "'Team Roster'!B12:F12");
        assert_eq!(r.table_range(), "'Team Roster'!B1:F200");
    }

    #[test]
    fn test_whole_sheet_range() {
        let r = SheetReference::new("sheet-1", Some("Orders"));
        assert_eq!(r.header_range(), "Orders!A1:Z1");
        assert_eq!(r.table_range(), "Orders!A1:Z");

        let headerless = SheetReference::new("sheet-1", Some("A2:D"));
        assert_eq!(headerless.table_range(), "A1:D");
    }
}
