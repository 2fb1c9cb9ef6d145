// src/mutation/positional.rs
// Insert, update and delete addressed by logical row index

use tracing::{debug, info};

use super::codec::{encode, Record};
use super::errors::classify;
use super::headers::HeaderResolver;
use super::outcome::MutationOutcome;
use super::position::{absolute_row, InsertPosition};
use crate::error::{ServiceError, ServiceResult};
use crate::sheets::reference::SheetReference;
use crate::sheets::store::WriteSummary;

const INSERT_OP: &str = "inserting row";
const UPDATE_OP: &str = "updating row by index";
const DELETE_OP: &str = "deleting row by index";

#[derive(Debug, Clone)]
pub struct PositionalMutator {
    resolver: HeaderResolver,
}

impl PositionalMutator {
    pub fn new(resolver: HeaderResolver) -> Self {
        Self { resolver }
    }

    pub async fn insert(
        &self,
        reference: &SheetReference,
        record: &Record,
        position: InsertPosition,
    ) -> ServiceResult<MutationOutcome> {
        let headers = self.resolver.fetch_headers(reference).await?;
        let summary = self
            .insert_encoded(reference, encode(&headers, record), position, INSERT_OP)
            .await?;
        info!(
            spreadsheet_id = %reference.spreadsheet_id,
            %position,
            "Inserted row"
        );
        Ok(MutationOutcome::index_based("Data inserted successfully", summary.updated_rows)
            .with_range(summary.updated_range)
            .with_position(position))
    }

    /// Full overwrite of the row at `logical_index`. No bounds check: an index
    /// past the table writes below it.
    pub async fn update(
        &self,
        reference: &SheetReference,
        logical_index: u32,
        record: &Record,
    ) -> ServiceResult<MutationOutcome> {
        let headers = self.resolver.fetch_headers(reference).await?;
        let summary = self
            .write_row(reference, absolute_row(logical_index)?, encode(&headers, record), UPDATE_OP)
            .await?;
        info!(spreadsheet_id = %reference.spreadsheet_id, logical_index, "Updated row");
        Ok(MutationOutcome::index_based("Row updated successfully", summary.updated_rows)
            .with_range(summary.updated_range)
            .with_row_index(logical_index))
    }

    /// Structural delete of the row at `logical_index`. No bounds check.
    pub async fn delete(&self, reference: &SheetReference, logical_index: u32) -> ServiceResult<MutationOutcome> {
        let sheet_id = self.resolver.resolve_sheet_id(reference, DELETE_OP).await?;
        let row = absolute_row(logical_index)?;
        self.delete_absolute(reference, sheet_id, row, DELETE_OP).await?;
        info!(spreadsheet_id = %reference.spreadsheet_id, logical_index, "Deleted row");
        Ok(MutationOutcome::index_based("Row deleted successfully", 1)
            .with_range(reference.row_range(row))
            .with_row_index(logical_index))
    }

    /// Place already-encoded `values` at `position`: appended for `End`,
    /// otherwise a structural insert followed by a value write.
    pub(crate) async fn insert_encoded(
        &self,
        reference: &SheetReference,
        values: Vec<String>,
        position: InsertPosition,
        operation: &str,
    ) -> ServiceResult<WriteSummary> {
        let store = self.resolver.store();
        let Some(row) = position.absolute_row()? else {
            return store
                .append_rows(&reference.spreadsheet_id, &reference.table_range(), vec![values])
                .await
                .map_err(|e| classify(store, operation, e));
        };

        let sheet_id = self.resolver.resolve_sheet_id(reference, operation).await?;
        store
            .insert_row(&reference.spreadsheet_id, sheet_id, row)
            .await
            .map_err(|e| classify(store, operation, e))?;
        debug!(sheet_id, row, "Inserted empty row");

        // The empty row is already in place; a failed write leaves it there
        let range = reference.row_range(row);
        store
            .write_range(&reference.spreadsheet_id, &range, vec![values])
            .await
            .map_err(|e| ServiceError::PartiallyApplied {
                operation: operation.to_string(),
                applied: format!("empty row inserted at row {}", row),
                detail: e.to_string(),
            })
    }

    /// Overwrite physical row `row` with `values`.
    pub(crate) async fn write_row(
        &self,
        reference: &SheetReference,
        row: u32,
        values: Vec<String>,
        operation: &str,
    ) -> ServiceResult<WriteSummary> {
        let store = self.resolver.store();
        let range = reference.row_range(row);
        debug!(range = %range, "Writing row");
        store
            .write_range(&reference.spreadsheet_id, &range, vec![values])
            .await
            .map_err(|e| classify(store, operation, e))
    }

    /// Structural delete of physical row `row`.
    pub(crate) async fn delete_absolute(
        &self,
        reference: &SheetReference,
        sheet_id: i64,
        row: u32,
        operation: &str,
    ) -> ServiceResult<()> {
        let store = self.resolver.store();
        debug!(sheet_id, row, "Deleting row");
        store
            .delete_row(&reference.spreadsheet_id, sheet_id, row)
            .await
            .map_err(|e| classify(store, operation, e))
    }
}
