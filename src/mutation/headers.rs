// src/mutation/headers.rs

use std::sync::Arc;

use tracing::debug;

use super::errors::classify;
use crate::error::{ServiceError, ServiceResult};
use crate::sheets::reference::SheetReference;
use crate::sheets::store::SpreadsheetStore;

/// Header row plus the data rows below it, as read in one call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetTable {
    pub headers: Vec<String>,
    /// Data rows; index `i` is logical index `i`.
    pub rows: Vec<Vec<String>>,
}

/// Reads headers, whole tables and sheet ids for a reference. Nothing is
/// cached; every call goes to the store.
#[derive(Debug, Clone)]
pub struct HeaderResolver {
    store: Arc<dyn SpreadsheetStore>,
}

impl HeaderResolver {
    pub fn new(store: Arc<dyn SpreadsheetStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &dyn SpreadsheetStore {
        self.store.as_ref()
    }

    pub async fn fetch_headers(&self, reference: &SheetReference) -> ServiceResult<Vec<String>> {
        let range = reference.header_range();
        let rows = self
            .store
            .read_range(&reference.spreadsheet_id, &range)
            .await
            .map_err(|e| classify(self.store(), "reading headers", e))?;
        let headers = rows.into_iter().next().unwrap_or_default();
        debug!(range = %range, count = headers.len(), "Fetched headers");
        Ok(headers)
    }

    pub async fn fetch_table(&self, reference: &SheetReference) -> ServiceResult<SheetTable> {
        let range = reference.table_range();
        let mut rows = self
            .store
            .read_range(&reference.spreadsheet_id, &range)
            .await
            .map_err(|e| classify(self.store(), "reading data", e))?
            .into_iter();
        let headers = rows.next().unwrap_or_default();
        Ok(SheetTable {
            headers,
            rows: rows.collect(),
        })
    }

    /// Numeric id of the sheet the reference names, or of the first sheet.
    pub async fn resolve_sheet_id(&self, reference: &SheetReference, operation: &str) -> ServiceResult<i64> {
        let sheets = self
            .store
            .sheet_properties(&reference.spreadsheet_id)
            .await
            .map_err(|e| classify(self.store(), operation, e))?;

        let found = match reference.sheet_title() {
            Some(title) => sheets.iter().find(|s| s.title == title),
            None => sheets.iter().min_by_key(|s| s.index),
        };
        found.map(|s| s.sheet_id).ok_or_else(|| {
            ServiceError::NotFound(format!(
                "Sheet '{}' not found in spreadsheet {}",
                reference.sheet_title().unwrap_or_default(),
                reference.spreadsheet_id
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::memory::MemoryStore;
    use crate::sheets::test_helpers::{people_reference, people_store, PEOPLE_SHEET};

    #[tokio::test]
    async fn test_fetch_headers_and_table() {
        let resolver = HeaderResolver::new(people_store());
        let headers = resolver.fetch_headers(&people_reference()).await.unwrap();
        assert_eq!(headers, vec!["id", "name", "status"]);

        let table = resolver.fetch_table(&people_reference()).await.unwrap();
        assert_eq!(table.headers, headers);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[1], vec!["2", "Bob", "inactive"]);
    }

    #[tokio::test]
    async fn test_empty_sheet_has_no_headers() {
        let store = MemoryStore::new("bot");
        store.add_sheet("blank", "Sheet1", Vec::<Vec<String>>::new());
        let resolver = HeaderResolver::new(Arc::new(store));
        let reference = SheetReference::new("blank", None);
        assert!(resolver.fetch_headers(&reference).await.unwrap().is_empty());
        assert_eq!(resolver.fetch_table(&reference).await.unwrap(), SheetTable::default());
    }

    #[tokio::test]
    async fn test_resolve_sheet_id_by_title() {
        let store = people_store();
        let orders_id = store.add_sheet(PEOPLE_SHEET, "Orders", vec![vec!["sku"]]);
        let resolver = HeaderResolver::new(store);

        let first = resolver.resolve_sheet_id(&people_reference(), "test").await.unwrap();
        assert_eq!(first, 0);

        let orders = SheetReference::new(PEOPLE_SHEET, Some("Orders!A1:C50"));
        assert_eq!(resolver.resolve_sheet_id(&orders, "test").await.unwrap(), orders_id);

        let missing = SheetReference::new(PEOPLE_SHEET, Some("Nope!A1:C50"));
        let err = resolver.resolve_sheet_id(&missing, "test").await.unwrap_err();
        assert_eq!(err.status_code(), 404);
    }
}
