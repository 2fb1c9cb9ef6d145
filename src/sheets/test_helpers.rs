// src/sheets/test_helpers.rs
// Shared fixtures for tests that run against the in-memory store

#![cfg(test)]

use std::sync::Arc;

use super::memory::MemoryStore;
use super::reference::SheetReference;

pub const PEOPLE_SHEET: &str = "people-sheet";
pub const TEST_IDENTITY: &str = "sheets-bot@test-project.iam.gserviceaccount.com";

/// Store holding one spreadsheet with a `Sheet1` tab:
///
/// | id | name  | status   |
/// |----|-------|----------|
/// | 1  | Alice | active   |
/// | 2  | Bob   | inactive |
/// | 3  | Carol | active   |
pub fn people_store() -> Arc<MemoryStore> {
    let store = MemoryStore::new(TEST_IDENTITY);
    store.add_sheet(
        PEOPLE_SHEET,
        "Sheet1",
        vec![
            vec!["id", "name", "status"],
            vec!["1", "Alice", "active"],
            vec!["2", "Bob", "inactive"],
            vec!["3", "Carol", "active"],
        ],
    );
    Arc::new(store)
}

pub fn people_reference() -> SheetReference {
    SheetReference::new(PEOPLE_SHEET, None)
}

/// Data rows (header excluded) as plain string vectors.
pub fn data_rows(store: &MemoryStore) -> Vec<Vec<String>> {
    store.rows(PEOPLE_SHEET, None).into_iter().skip(1).collect()
}

/// Names column of the data rows, in sheet order.
pub fn names(store: &MemoryStore) -> Vec<String> {
    data_rows(store)
        .into_iter()
        .map(|row| row.get(1).cloned().unwrap_or_default())
        .collect()
}
