// src/mutation/criteria_based.rs
// Update, delete and insert-after addressed by field criteria
//
// Every operation reads the whole table fresh, resolves matching logical
// indices, then drives the positional writes one row at a time. A failure
// part-way through aborts the remaining rows.

use tracing::{info, warn};

use super::codec::{decode, encode, Record};
use super::criteria::Criteria;
use super::headers::HeaderResolver;
use super::outcome::MutationOutcome;
use super::position::{absolute_row, InsertPosition};
use super::positional::PositionalMutator;
use crate::error::ServiceResult;
use crate::sheets::reference::SheetReference;

const UPDATE_OP: &str = "updating rows by field";
const DELETE_OP: &str = "deleting rows by field";
const INSERT_AFTER_OP: &str = "inserting row after field match";

#[derive(Debug, Clone)]
pub struct CriteriaMutator {
    resolver: HeaderResolver,
    positional: PositionalMutator,
}

impl CriteriaMutator {
    pub fn new(resolver: HeaderResolver, positional: PositionalMutator) -> Self {
        Self { resolver, positional }
    }

    /// Partial update of every matching row: fields in `record` replace the
    /// current values, everything else is kept.
    pub async fn update_by_criteria(
        &self,
        reference: &SheetReference,
        criteria: &Criteria,
        record: &Record,
    ) -> ServiceResult<MutationOutcome> {
        let table = self.resolver.fetch_table(reference).await?;
        if table.rows.is_empty() {
            return Ok(MutationOutcome::field_based("No data found to update", 0, criteria)
                .with_matching_rows(0));
        }

        let matches = criteria.matching_indices(&table.headers, &table.rows);
        if matches.is_empty() {
            return Ok(
                MutationOutcome::field_based("No rows found matching criteria", 0, criteria)
                    .with_matching_rows(0),
            );
        }

        let mut updated = 0u32;
        for &index in &matches {
            let mut merged = decode(&table.headers, &table.rows[index]);
            merged.extend(record.iter().map(|(k, v)| (k.clone(), v.clone())));
            let values = encode(&table.headers, &merged);
            self.positional
                .write_row(reference, absolute_row(index as u32)?, values, UPDATE_OP)
                .await?;
            updated += 1;
        }

        info!(spreadsheet_id = %reference.spreadsheet_id, updated, "Updated rows by criteria");
        Ok(MutationOutcome::field_based(
            format!("Updated {} row(s) successfully", updated),
            updated,
            criteria,
        )
        .with_matching_rows(matches.len()))
    }

    /// Delete every matching row, highest index first so earlier deletions
    /// never shift a row that is still to be deleted.
    pub async fn delete_by_criteria(
        &self,
        reference: &SheetReference,
        criteria: &Criteria,
    ) -> ServiceResult<MutationOutcome> {
        let table = self.resolver.fetch_table(reference).await?;
        if table.rows.is_empty() {
            return Ok(MutationOutcome::field_based("No data found to delete", 0, criteria)
                .with_matching_rows(0));
        }

        let mut matches = criteria.matching_indices(&table.headers, &table.rows);
        if matches.is_empty() {
            return Ok(
                MutationOutcome::field_based("No rows found matching criteria", 0, criteria)
                    .with_matching_rows(0),
            );
        }

        let sheet_id = self.resolver.resolve_sheet_id(reference, DELETE_OP).await?;
        matches.sort_unstable_by(|a, b| b.cmp(a));

        let mut deleted = 0u32;
        for &index in &matches {
            self.positional
                .delete_absolute(reference, sheet_id, absolute_row(index as u32)?, DELETE_OP)
                .await?;
            deleted += 1;
        }

        info!(spreadsheet_id = %reference.spreadsheet_id, deleted, "Deleted rows by criteria");
        Ok(MutationOutcome::field_based(
            format!("Deleted {} row(s) successfully", deleted),
            deleted,
            criteria,
        )
        .with_matching_rows(matches.len()))
    }

    /// Insert `record` directly below the last matching row. With no data rows
    /// the row goes to the beginning; with no match it goes to the end.
    pub async fn insert_after_criteria(
        &self,
        reference: &SheetReference,
        criteria: &Criteria,
        record: &Record,
    ) -> ServiceResult<MutationOutcome> {
        let table = self.resolver.fetch_table(reference).await?;
        let values = encode(&table.headers, record);

        if table.rows.is_empty() {
            warn!(spreadsheet_id = %reference.spreadsheet_id, "No data rows, inserting at beginning");
            let summary = self
                .positional
                .insert_encoded(reference, values, InsertPosition::Beginning, INSERT_AFTER_OP)
                .await?;
            return Ok(MutationOutcome::field_based(
                "No data found, inserted at beginning",
                summary.updated_rows,
                criteria,
            )
            .with_range(summary.updated_range)
            .with_position(InsertPosition::Beginning)
            .with_matching_rows(0));
        }

        let matches = criteria.matching_indices(&table.headers, &table.rows);
        let Some(&last_match) = matches.iter().max() else {
            warn!(spreadsheet_id = %reference.spreadsheet_id, "No rows match, inserting at end");
            let summary = self
                .positional
                .insert_encoded(reference, values, InsertPosition::End, INSERT_AFTER_OP)
                .await?;
            return Ok(MutationOutcome::field_based(
                "No rows found matching criteria, inserted at end",
                summary.updated_rows,
                criteria,
            )
            .with_range(summary.updated_range)
            .with_position(InsertPosition::End)
            .with_matching_rows(0));
        };

        let position = InsertPosition::Index(last_match as u32 + 1);
        let summary = self
            .positional
            .insert_encoded(reference, values, position, INSERT_AFTER_OP)
            .await?;
        info!(spreadsheet_id = %reference.spreadsheet_id, %position, "Inserted row after match");
        Ok(MutationOutcome::field_based(
            "Row inserted successfully after matching row",
            summary.updated_rows,
            criteria,
        )
        .with_range(summary.updated_range)
        .with_position(position)
        .with_matching_rows(matches.len()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use super::*;
    use crate::error::ServiceError;
    use crate::sheets::memory::{MemoryStore, StoreOp};
    use crate::sheets::store::{SpreadsheetStore, StoreError};
    use crate::sheets::test_helpers::{data_rows, names, people_reference, people_store, PEOPLE_SHEET};

    fn mutator(store: Arc<MemoryStore>) -> CriteriaMutator {
        let resolver = HeaderResolver::new(store);
        CriteriaMutator::new(resolver.clone(), PositionalMutator::new(resolver))
    }

    fn pairs(items: &[(&str, &str)]) -> BTreeMap<String, String> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn criteria(items: &[(&str, &str)]) -> Criteria {
        Criteria::new(pairs(items)).unwrap()
    }

    #[tokio::test]
    async fn test_delete_active_leaves_bob() {
        let store = people_store();
        let outcome = mutator(store.clone())
            .delete_by_criteria(&people_reference(), &criteria(&[("status", "active")]))
            .await
            .unwrap();
        assert_eq!(outcome.rows_affected, 2);
        assert_eq!(outcome.matching_rows, Some(2));
        assert_eq!(data_rows(&store), vec![vec!["2", "Bob", "inactive"]]);
    }

    #[tokio::test]
    async fn test_delete_order_is_descending() {
        let store = people_store();
        mutator(store.clone())
            .delete_by_criteria(&people_reference(), &criteria(&[("status", "active")]))
            .await
            .unwrap();
        let rows: Vec<String> = store
            .calls()
            .into_iter()
            .filter(|c| c.op == StoreOp::DeleteRow)
            .map(|c| c.target)
            .collect();
        assert_eq!(rows, vec!["sheet:0/row:4", "sheet:0/row:2"]);
    }

    /// Deleting matches in ascending order removes a row that never matched
    /// once the first deletion has shifted the rows below it.
    #[tokio::test]
    async fn test_ascending_deletion_removes_wrong_rows() {
        let build = || {
            let store = MemoryStore::new("bot");
            store.add_sheet(
                PEOPLE_SHEET,
                "Sheet1",
                vec![
                    vec!["id", "name", "status"],
                    vec!["1", "Alice", "active"],
                    vec!["2", "Bob", "inactive"],
                    vec!["3", "Carol", "active"],
                    vec!["4", "Dan", "inactive"],
                ],
            );
            Arc::new(store)
        };
        let active = criteria(&[("status", "active")]);

        let naive = build();
        let headers = vec!["id".to_string(), "name".to_string(), "status".to_string()];
        let rows: Vec<Vec<String>> = naive.rows(PEOPLE_SHEET, None).into_iter().skip(1).collect();
        for index in active.matching_indices(&headers, &rows) {
            naive
                .delete_row(PEOPLE_SHEET, 0, absolute_row(index as u32).unwrap())
                .await
                .unwrap();
        }
        assert_eq!(names(&naive), vec!["Bob", "Carol"]);

        let store = build();
        mutator(store.clone())
            .delete_by_criteria(&people_reference(), &active)
            .await
            .unwrap();
        assert_eq!(names(&store), vec!["Bob", "Dan"]);
    }

    #[tokio::test]
    async fn test_update_merges_partial_record() {
        let store = people_store();
        let outcome = mutator(store.clone())
            .update_by_criteria(
                &people_reference(),
                &criteria(&[("name", "Bob")]),
                &pairs(&[("status", "active")]),
            )
            .await
            .unwrap();
        assert_eq!(outcome.rows_affected, 1);
        assert_eq!(data_rows(&store)[1], vec!["2", "Bob", "active"]);
    }

    #[tokio::test]
    async fn test_no_match_is_not_an_error() {
        let store = people_store();
        let m = mutator(store.clone());
        let nobody = criteria(&[("name", "Zed")]);

        let updated = m
            .update_by_criteria(&people_reference(), &nobody, &pairs(&[("status", "x")]))
            .await
            .unwrap();
        assert_eq!(updated.rows_affected, 0);
        assert_eq!(updated.message, "No rows found matching criteria");

        let deleted = m.delete_by_criteria(&people_reference(), &nobody).await.unwrap();
        assert_eq!(deleted.rows_affected, 0);
        assert_eq!(data_rows(&store).len(), 3);
    }

    #[tokio::test]
    async fn test_insert_after_last_match() {
        let store = people_store();
        let outcome = mutator(store.clone())
            .insert_after_criteria(
                &people_reference(),
                &criteria(&[("status", "active")]),
                &pairs(&[("id", "9"), ("name", "Zoe"), ("status", "new")]),
            )
            .await
            .unwrap();
        // Last match is Carol at index 2; the new row takes index 3 (row 5)
        assert_eq!(outcome.position, Some(InsertPosition::Index(3)));
        assert_eq!(outcome.updated_range.as_deref(), Some("Sheet1!A5:C5"));
        assert_eq!(names(&store), vec!["Alice", "Bob", "Carol", "Zoe"]);

        let store = people_store();
        mutator(store.clone())
            .insert_after_criteria(
                &people_reference(),
                &criteria(&[("name", "Alice")]),
                &pairs(&[("name", "Amy")]),
            )
            .await
            .unwrap();
        assert_eq!(names(&store), vec!["Alice", "Amy", "Bob", "Carol"]);
    }

    #[tokio::test]
    async fn test_insert_after_without_match_appends() {
        let store = people_store();
        let outcome = mutator(store.clone())
            .insert_after_criteria(
                &people_reference(),
                &criteria(&[("name", "Zed")]),
                &pairs(&[("name", "Eve")]),
            )
            .await
            .unwrap();
        assert_eq!(outcome.position, Some(InsertPosition::End));
        assert_eq!(outcome.rows_affected, 1);
        assert_eq!(names(&store), vec!["Alice", "Bob", "Carol", "Eve"]);
    }

    #[tokio::test]
    async fn test_insert_after_on_header_only_sheet_goes_to_beginning() {
        let store = MemoryStore::new("bot");
        store.add_sheet(PEOPLE_SHEET, "Sheet1", vec![vec!["id", "name", "status"]]);
        let store = Arc::new(store);

        let outcome = mutator(store.clone())
            .insert_after_criteria(
                &people_reference(),
                &criteria(&[("name", "Zed")]),
                &pairs(&[("id", "1"), ("name", "First")]),
            )
            .await
            .unwrap();
        assert_eq!(outcome.position, Some(InsertPosition::Beginning));
        assert_eq!(data_rows(&store), vec![vec!["1", "First"]]);
    }

    #[tokio::test]
    async fn test_mid_batch_failure_aborts() {
        let store = people_store();
        store.fail_next(
            StoreOp::DeleteRow,
            StoreError::Api {
                status: 500,
                message: "backend error".into(),
            },
        );
        let err = mutator(store.clone())
            .delete_by_criteria(&people_reference(), &criteria(&[("status", "active")]))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Backend { .. }));
        assert_eq!(data_rows(&store).len(), 3);
    }
}
