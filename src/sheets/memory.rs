// src/sheets/memory.rs
//! In-process spreadsheet store.
//!
//! Mirrors the observable behaviour of the Sheets API that the mutation
//! logic depends on: reads drop trailing empty rows/cells, structural row
//! operations shift later rows, appends land below the last non-empty row.
//! Every call is recorded, and failures can be injected per operation.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::a1::{column_letters, sheet_prefix, A1Range};
use super::store::{
    AccessReport, SheetProperties, SpreadsheetStore, StoreError, StoreResult, WriteSummary,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Read,
    Write,
    Append,
    InsertRow,
    DeleteRow,
    Properties,
    CheckAccess,
}

impl StoreOp {
    fn is_write(self) -> bool {
        matches!(
            self,
            StoreOp::Write | StoreOp::Append | StoreOp::InsertRow | StoreOp::DeleteRow
        )
    }
}

/// One recorded call against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCall {
    pub op: StoreOp,
    pub spreadsheet_id: String,
    /// Range for value operations, `sheet:<id>/row:<n>` for structural ones.
    pub target: String,
}

#[derive(Debug, Clone)]
struct MemorySheet {
    properties: SheetProperties,
    grid: Vec<Vec<String>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    spreadsheets: HashMap<String, Vec<MemorySheet>>,
    read_only: HashSet<String>,
    failures: Vec<(StoreOp, StoreError)>,
    calls: Vec<StoreCall>,
    auto_create: bool,
}

#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    identity: String,
}

impl MemoryStore {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            identity: identity.into(),
        }
    }

    /// A store where any unknown spreadsheet id springs into existence
    /// with one empty `Sheet1` tab on first access.
    pub fn with_auto_create(identity: impl Into<String>) -> Self {
        let store = Self::new(identity);
        store.lock().auto_create = true;
        store
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a sheet to a spreadsheet (creating the spreadsheet if needed).
    /// Returns the new sheet's numeric id; the first sheet gets id 0.
    pub fn add_sheet<R, C, S>(&self, spreadsheet_id: &str, title: &str, rows: R) -> i64
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let grid: Vec<Vec<String>> = rows
            .into_iter()
            .map(|row| row.into_iter().map(Into::into).collect())
            .collect();

        let mut state = self.lock();
        let sheets = state
            .spreadsheets
            .entry(spreadsheet_id.to_string())
            .or_default();
        let sheet_id = sheets
            .iter()
            .map(|s| s.properties.sheet_id + 1)
            .max()
            .unwrap_or(0);
        let index = sheets.len() as u32;
        sheets.push(MemorySheet {
            properties: SheetProperties {
                sheet_id,
                title: title.to_string(),
                index,
            },
            grid,
        });
        sheet_id
    }

    /// Make every write against the spreadsheet fail with a 403.
    pub fn set_read_only(&self, spreadsheet_id: &str) {
        self.lock().read_only.insert(spreadsheet_id.to_string());
    }

    /// Fail the next call of `op` with `error`.
    pub fn fail_next(&self, op: StoreOp, error: StoreError) {
        self.lock().failures.push((op, error));
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Snapshot of a sheet's contents as a reader would see it.
    /// `title: None` selects the first sheet.
    pub fn rows(&self, spreadsheet_id: &str, title: Option<&str>) -> Vec<Vec<String>> {
        let state = self.lock();
        let Some(sheets) = state.spreadsheets.get(spreadsheet_id) else {
            return Vec::new();
        };
        let sheet = match title {
            Some(title) => sheets.iter().find(|s| s.properties.title == title),
            None => sheets.first(),
        };
        sheet
            .map(|s| trim_grid(s.grid.clone()))
            .unwrap_or_default()
    }
}

impl MemoryState {
    fn begin(&mut self, op: StoreOp, spreadsheet_id: &str, target: String) -> StoreResult<()> {
        self.calls.push(StoreCall {
            op,
            spreadsheet_id: spreadsheet_id.to_string(),
            target,
        });

        if let Some(pos) = self.failures.iter().position(|(o, _)| *o == op) {
            let (_, err) = self.failures.remove(pos);
            return Err(err);
        }
        if self.auto_create && !self.spreadsheets.contains_key(spreadsheet_id) {
            self.spreadsheets.insert(
                spreadsheet_id.to_string(),
                vec![MemorySheet {
                    properties: SheetProperties {
                        sheet_id: 0,
                        title: "Sheet1".to_string(),
                        index: 0,
                    },
                    grid: Vec::new(),
                }],
            );
        }
        if !self.spreadsheets.contains_key(spreadsheet_id) {
            return Err(StoreError::Api {
                status: 404,
                message: "Requested entity was not found.".to_string(),
            });
        }
        if op.is_write() && self.read_only.contains(spreadsheet_id) {
            return Err(StoreError::Api {
                status: 403,
                message: "The caller does not have permission".to_string(),
            });
        }
        Ok(())
    }

    fn sheet_for_range(&mut self, spreadsheet_id: &str, range: &A1Range) -> StoreResult<&mut MemorySheet> {
        let sheets = self
            .spreadsheets
            .get_mut(spreadsheet_id)
            .ok_or_else(|| bad_request("Requested entity was not found."))?;
        match &range.sheet {
            Some(title) => sheets
                .iter_mut()
                .find(|s| &s.properties.title == title)
                .ok_or_else(|| bad_request(&format!("Unable to parse range: {}", title))),
            None => sheets
                .first_mut()
                .ok_or_else(|| bad_request("Spreadsheet has no sheets")),
        }
    }

    fn sheet_by_id(&mut self, spreadsheet_id: &str, sheet_id: i64) -> StoreResult<&mut MemorySheet> {
        self.spreadsheets
            .get_mut(spreadsheet_id)
            .and_then(|sheets| sheets.iter_mut().find(|s| s.properties.sheet_id == sheet_id))
            .ok_or_else(|| bad_request(&format!("No grid with id: {}", sheet_id)))
    }
}

/// Largest grid a sheet may grow to.
pub const MAX_GRID_ROWS: usize = 100_000;
pub const MAX_GRID_COLUMNS: usize = 18_278;

/// Reject writes reaching past the grid limits, as Sheets does.
fn check_grid_limits(rows_needed: usize, columns_needed: usize) -> StoreResult<()> {
    if rows_needed > MAX_GRID_ROWS || columns_needed > MAX_GRID_COLUMNS {
        return Err(bad_request(&format!(
            "Range exceeds grid limits. Max rows: {}, max columns: {}",
            MAX_GRID_ROWS, MAX_GRID_COLUMNS
        )));
    }
    Ok(())
}

fn bad_request(message: &str) -> StoreError {
    StoreError::Api {
        status: 400,
        message: message.to_string(),
    }
}

fn parse_range(range: &str) -> StoreResult<A1Range> {
    A1Range::parse(range).ok_or_else(|| bad_request(&format!("Unable to parse range: {}", range)))
}

fn trim_row(mut row: Vec<String>) -> Vec<String> {
    while row.last().is_some_and(|c| c.is_empty()) {
        row.pop();
    }
    row
}

fn trim_grid(rows: Vec<Vec<String>>) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = rows.into_iter().map(trim_row).collect();
    while rows.last().is_some_and(|r| r.is_empty()) {
        rows.pop();
    }
    rows
}

/// Write `values` with its top-left cell at (`row0`, `col0`), both 0-based.
fn write_at(
    sheet: &mut MemorySheet,
    row0: usize,
    col0: usize,
    values: &[Vec<String>],
) -> StoreResult<WriteSummary> {
    let width = values.iter().map(Vec::len).max().unwrap_or(0);
    if values.is_empty() || width == 0 {
        return Ok(WriteSummary::default());
    }
    check_grid_limits(
        row0.saturating_add(values.len()),
        col0.saturating_add(width),
    )?;

    for (i, cells) in values.iter().enumerate() {
        let r = row0 + i;
        if sheet.grid.len() <= r {
            sheet.grid.resize(r + 1, Vec::new());
        }
        let row = &mut sheet.grid[r];
        for (j, value) in cells.iter().enumerate() {
            let c = col0 + j;
            if row.len() <= c {
                row.resize(c + 1, String::new());
            }
            row[c] = value.clone();
        }
    }

    Ok(WriteSummary {
        updated_range: format!(
            "{}{}{}:{}{}",
            sheet_prefix(&sheet.properties.title),
            column_letters(col0 as u32),
            row0 + 1,
            column_letters((col0 + width - 1) as u32),
            row0 + values.len()
        ),
        updated_rows: values.len() as u32,
    })
}

#[async_trait]
impl SpreadsheetStore for MemoryStore {
    async fn read_range(&self, spreadsheet_id: &str, range: &str) -> StoreResult<Vec<Vec<String>>> {
        let mut state = self.lock();
        state.begin(StoreOp::Read, spreadsheet_id, range.to_string())?;
        let a1 = parse_range(range)?;
        let sheet = state.sheet_for_range(spreadsheet_id, &a1)?;

        let first_row = a1.start_row.unwrap_or(1) as usize - 1;
        let end_row = a1.end_row.map(|r| r as usize).unwrap_or(sheet.grid.len());
        let first_col = a1.start_col as usize;
        let end_col = a1.end_col.map(|c| c as usize + 1).unwrap_or(usize::MAX);

        let rows = sheet
            .grid
            .iter()
            .take(end_row)
            .skip(first_row)
            .map(|row| {
                row.iter()
                    .take(end_col)
                    .skip(first_col)
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();
        Ok(trim_grid(rows))
    }

    async fn write_range(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> StoreResult<WriteSummary> {
        let mut state = self.lock();
        state.begin(StoreOp::Write, spreadsheet_id, range.to_string())?;
        let a1 = parse_range(range)?;
        let sheet = state.sheet_for_range(spreadsheet_id, &a1)?;
        let row0 = a1.start_row.unwrap_or(1) as usize - 1;
        write_at(sheet, row0, a1.start_col as usize, &values)
    }

    async fn append_rows(
        &self,
        spreadsheet_id: &str,
        range: &str,
        values: Vec<Vec<String>>,
    ) -> StoreResult<WriteSummary> {
        let mut state = self.lock();
        state.begin(StoreOp::Append, spreadsheet_id, range.to_string())?;
        let a1 = parse_range(range)?;
        let sheet = state.sheet_for_range(spreadsheet_id, &a1)?;

        let table_end = sheet
            .grid
            .iter()
            .rposition(|row| row.iter().any(|c| !c.is_empty()))
            .map(|last| last + 1)
            .unwrap_or(0);
        let row0 = table_end.max(a1.start_row.unwrap_or(1) as usize - 1);
        write_at(sheet, row0, a1.start_col as usize, &values)
    }

    async fn insert_row(&self, spreadsheet_id: &str, sheet_id: i64, absolute_row: u32) -> StoreResult<()> {
        let mut state = self.lock();
        state.begin(
            StoreOp::InsertRow,
            spreadsheet_id,
            format!("sheet:{}/row:{}", sheet_id, absolute_row),
        )?;
        if absolute_row == 0 {
            return Err(bad_request("Invalid insertDimension: startIndex must be >= 0"));
        }
        let sheet = state.sheet_by_id(spreadsheet_id, sheet_id)?;
        let idx = absolute_row as usize - 1;
        check_grid_limits(idx.max(sheet.grid.len()) + 1, 0)?;
        if idx > sheet.grid.len() {
            sheet.grid.resize(idx, Vec::new());
        }
        sheet.grid.insert(idx, Vec::new());
        Ok(())
    }

    async fn delete_row(&self, spreadsheet_id: &str, sheet_id: i64, absolute_row: u32) -> StoreResult<()> {
        let mut state = self.lock();
        state.begin(
            StoreOp::DeleteRow,
            spreadsheet_id,
            format!("sheet:{}/row:{}", sheet_id, absolute_row),
        )?;
        if absolute_row == 0 {
            return Err(bad_request("Invalid deleteDimension: startIndex must be >= 0"));
        }
        let sheet = state.sheet_by_id(spreadsheet_id, sheet_id)?;
        let idx = absolute_row as usize - 1;
        // Rows past the populated grid are empty; deleting one changes nothing
        if idx < sheet.grid.len() {
            sheet.grid.remove(idx);
        }
        Ok(())
    }

    async fn sheet_properties(&self, spreadsheet_id: &str) -> StoreResult<Vec<SheetProperties>> {
        let mut state = self.lock();
        state.begin(StoreOp::Properties, spreadsheet_id, String::new())?;
        Ok(state
            .spreadsheets
            .get(spreadsheet_id)
            .map(|sheets| sheets.iter().map(|s| s.properties.clone()).collect())
            .unwrap_or_default())
    }

    async fn check_access(&self, spreadsheet_id: &str) -> StoreResult<AccessReport> {
        let mut state = self.lock();
        state.begin(StoreOp::CheckAccess, spreadsheet_id, String::new())?;
        Ok(AccessReport {
            readable: true,
            writable: !state.read_only.contains(spreadsheet_id),
        })
    }

    fn caller_identity(&self) -> String {
        self.identity.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryStore {
        let store = MemoryStore::new("tester@example.iam");
        store.add_sheet(
            "doc",
            "Sheet1",
            vec![
                vec!["id", "name", ""],
                vec!["1", "Alice", ""],
                vec![],
                vec!["3", "Carol"],
            ],
        );
        store
    }

    #[tokio::test]
    async fn test_read_trims_but_keeps_inner_blank_rows() {
        let store = store();
        let rows = store.read_range("doc", "A1:Z1000").await.unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], vec!["id", "name"]);
        assert!(rows[2].is_empty());

        let header = store.read_range("doc", "A1:Z1").await.unwrap();
        assert_eq!(header, vec![vec!["id".to_string(), "name".to_string()]]);

        let second_col = store.read_range("doc", "Sheet1!B2:B4").await.unwrap();
        assert_eq!(second_col, vec![vec!["Alice"], vec![], vec!["Carol"]]);
    }

    #[tokio::test]
    async fn test_structural_insert_and_delete_shift_rows() {
        let store = store();
        store.insert_row("doc", 0, 2).await.unwrap();
        let rows = store.rows("doc", None);
        assert!(rows[1].is_empty());
        assert_eq!(rows[2], vec!["1", "Alice"]);

        store.delete_row("doc", 0, 2).await.unwrap();
        store.delete_row("doc", 0, 2).await.unwrap();
        let rows = store.rows("doc", None);
        assert_eq!(rows.len(), 3);
        assert!(rows[1].is_empty());

        // Past the populated grid is a no-op
        store.delete_row("doc", 0, 500).await.unwrap();
        assert_eq!(store.rows("doc", None).len(), 3);
    }

    #[tokio::test]
    async fn test_append_lands_below_last_row() {
        let store = store();
        let summary = store
            .append_rows("doc", "A1:Z1000", vec![vec!["4".into(), "Dan".into()]])
            .await
            .unwrap();
        assert_eq!(summary.updated_range, "Sheet1!A5:B5");
        assert_eq!(summary.updated_rows, 1);
        assert_eq!(store.rows("doc", None)[4], vec!["4", "Dan"]);
    }

    #[tokio::test]
    async fn test_read_only_and_injected_failures() {
        let store = store();
        store.set_read_only("doc");
        let err = store
            .write_range("doc", "A2:Z2", vec![vec!["x".into()]])
            .await
            .unwrap_err();
        assert!(err.is_permission_denied());
        assert!(store.read_range("doc", "A1:Z1").await.is_ok());

        store.fail_next(StoreOp::Read, StoreError::Transport("connection reset".into()));
        assert!(store.read_range("doc", "A1:Z1").await.is_err());
        assert!(store.read_range("doc", "A1:Z1").await.is_ok());

        let missing = store.read_range("nope", "A1:Z1").await.unwrap_err();
        assert!(matches!(missing, StoreError::Api { status: 404, .. }));

        let ops: Vec<StoreOp> = store.calls().iter().map(|c| c.op).collect();
        assert_eq!(
            ops,
            vec![StoreOp::Write, StoreOp::Read, StoreOp::Read, StoreOp::Read, StoreOp::Read]
        );
    }

    #[tokio::test]
    async fn test_writes_past_grid_limits_are_rejected() {
        let store = store();
        let far_row = format!("Sheet1!A{}", MAX_GRID_ROWS + 1);
        let err = store
            .write_range("doc", &far_row, vec![vec!["x".into()]])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Api { status: 400, .. }));

        let err = store
            .write_range("doc", "A2:Z2", vec![vec!["x".to_string(); MAX_GRID_COLUMNS + 1]])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Api { status: 400, .. }));

        let err = store
            .insert_row("doc", 0, u32::MAX)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Api { status: 400, .. }));

        let rows = store.rows("doc", None);
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|r| r.len() <= 2));
    }

    #[tokio::test]
    async fn test_auto_create_starts_with_an_empty_first_sheet() {
        let store = MemoryStore::with_auto_create("me@example.com");
        assert!(store.read_range("fresh", "A1:Z1").await.unwrap().is_empty());

        let props = store.sheet_properties("fresh").await.unwrap();
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].title, "Sheet1");
        assert_eq!(props[0].sheet_id, 0);

        store
            .write_range("fresh", "A1:B1", vec![vec!["id".into(), "name".into()]])
            .await
            .unwrap();
        assert_eq!(store.rows("fresh", None), vec![vec!["id", "name"]]);

        let plain = MemoryStore::new("me@example.com");
        assert!(plain.read_range("fresh", "A1:Z1").await.is_err());
    }
}
