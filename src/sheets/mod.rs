// src/sheets/mod.rs

// --- Public Interface ---
pub mod a1;
pub mod google;
pub mod memory;
pub mod reference;
pub mod store;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use google::GoogleSheetsStore;
pub use memory::{MemoryStore, StoreCall, StoreOp};
pub use reference::{SheetReference, DEFAULT_RANGE, HEADER_ROW};
pub use store::{AccessReport, SheetProperties, SpreadsheetStore, StoreError, StoreResult, WriteSummary};
