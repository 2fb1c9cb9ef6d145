// src/mutation/mod.rs
//! Row addressing and mutation.
//!
//! `MutationService` composes two mutators over one shared `HeaderResolver`:
//! - `PositionalMutator`: insert/update/delete by logical index
//! - `CriteriaMutator`: update/delete/insert-after by field criteria, driving
//!   the positional writes per matched row
//!
//! Logical index `i` maps to physical row `i + 2` (see `position`).

pub mod codec;
pub mod criteria;
pub mod criteria_based;
pub mod errors;
pub mod headers;
pub mod outcome;
pub mod position;
pub mod positional;

use std::sync::Arc;

pub use codec::{decode, encode, record_from_json, Record};
pub use criteria::{matches, Criteria};
pub use criteria_based::CriteriaMutator;
pub use headers::{HeaderResolver, SheetTable};
pub use outcome::{AddressingMethod, MutationOutcome};
pub use position::{absolute_row, parse_row_index, InsertPosition};
pub use positional::PositionalMutator;

use crate::error::ServiceResult;
use crate::sheets::reference::SheetReference;
use crate::sheets::store::SpreadsheetStore;

#[derive(Debug, Clone)]
pub struct MutationService {
    resolver: HeaderResolver,
    positional: PositionalMutator,
    criteria: CriteriaMutator,
}

impl MutationService {
    pub fn new(store: Arc<dyn SpreadsheetStore>) -> Self {
        let resolver = HeaderResolver::new(store);
        let positional = PositionalMutator::new(resolver.clone());
        let criteria = CriteriaMutator::new(resolver.clone(), positional.clone());
        Self {
            resolver,
            positional,
            criteria,
        }
    }

    pub fn resolver(&self) -> &HeaderResolver {
        &self.resolver
    }

    // ============================================================================
    // BY INDEX - See positional.rs
    // ============================================================================

    pub async fn insert(
        &self,
        reference: &SheetReference,
        record: &Record,
        position: InsertPosition,
    ) -> ServiceResult<MutationOutcome> {
        self.positional.insert(reference, record, position).await
    }

    pub async fn update(
        &self,
        reference: &SheetReference,
        logical_index: u32,
        record: &Record,
    ) -> ServiceResult<MutationOutcome> {
        self.positional.update(reference, logical_index, record).await
    }

    pub async fn delete(&self, reference: &SheetReference, logical_index: u32) -> ServiceResult<MutationOutcome> {
        self.positional.delete(reference, logical_index).await
    }

    // ============================================================================
    // BY CRITERIA - See criteria_based.rs
    // ============================================================================

    pub async fn update_by_criteria(
        &self,
        reference: &SheetReference,
        criteria: &Criteria,
        record: &Record,
    ) -> ServiceResult<MutationOutcome> {
        self.criteria.update_by_criteria(reference, criteria, record).await
    }

    pub async fn delete_by_criteria(
        &self,
        reference: &SheetReference,
        criteria: &Criteria,
    ) -> ServiceResult<MutationOutcome> {
        self.criteria.delete_by_criteria(reference, criteria).await
    }

    pub async fn insert_after_criteria(
        &self,
        reference: &SheetReference,
        criteria: &Criteria,
        record: &Record,
    ) -> ServiceResult<MutationOutcome> {
        self.criteria
            .insert_after_criteria(reference, criteria, record)
            .await
    }
}
