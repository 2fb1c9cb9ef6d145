// src/service.rs
//! Operation surface keyed by endpoint key.
//!
//! Every data operation looks the key up in the registry first (unknown key
//! is `NotFound`), then runs against the sheet reference stored with it.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{ServiceError, ServiceResult};
use crate::mutation::errors::classify;
use crate::mutation::{Criteria, InsertPosition, MutationOutcome, MutationService, Record};
use crate::query::{
    analyze_structure, build_page, raw_sheet, EndpointInfo, RawSheet, ReadOptions, ReadPage, StructureReport,
};
use crate::registry::{EndpointRecord, EndpointRegistry};
use crate::sheets::a1::sheet_prefix;
use crate::sheets::reference::SheetReference;
use crate::sheets::store::{AccessReport, SpreadsheetStore, StoreError};

/// Response to a registration.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    #[serde(flatten)]
    pub endpoint: EndpointRecord,
    /// Identity the spreadsheet must be shared with for writes to work.
    pub share_with: String,
    /// `None` when the probe itself failed.
    pub access: Option<AccessReport>,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct SheetsApi {
    registry: EndpointRegistry,
    store: Arc<dyn SpreadsheetStore>,
    mutations: MutationService,
}

impl SheetsApi {
    pub fn new(registry: EndpointRegistry, store: Arc<dyn SpreadsheetStore>) -> Self {
        Self {
            mutations: MutationService::new(store.clone()),
            registry,
            store,
        }
    }

    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    fn endpoint(&self, key: &str) -> ServiceResult<EndpointRecord> {
        self.registry
            .find_by_key(key)?
            .ok_or_else(|| ServiceError::NotFound("API endpoint not found".to_string()))
    }

    fn owned_endpoint(&self, owner: &str, key: &str) -> ServiceResult<EndpointRecord> {
        let record = self.endpoint(key)?;
        if record.owner != owner {
            return Err(ServiceError::NotFound("API endpoint not found".to_string()));
        }
        Ok(record)
    }

    // ============================================================================
    // DATA
    // ============================================================================

    pub async fn read(&self, key: &str, options: &ReadOptions) -> ServiceResult<ReadPage> {
        options.validate()?;
        let endpoint = self.endpoint(key)?;
        let table = self
            .mutations
            .resolver()
            .fetch_table(&endpoint.reference())
            .await?;
        Ok(build_page(
            table,
            options,
            EndpointInfo {
                name: endpoint.name,
                sheet_id: endpoint.spreadsheet_id,
                created_at: endpoint.created_at,
            },
        ))
    }

    pub async fn insert(&self, key: &str, record: &Record, position: InsertPosition) -> ServiceResult<MutationOutcome> {
        let endpoint = self.endpoint(key)?;
        self.mutations.insert(&endpoint.reference(), record, position).await
    }

    pub async fn update(&self, key: &str, logical_index: u32, record: &Record) -> ServiceResult<MutationOutcome> {
        let endpoint = self.endpoint(key)?;
        self.mutations
            .update(&endpoint.reference(), logical_index, record)
            .await
    }

    pub async fn delete(&self, key: &str, logical_index: u32) -> ServiceResult<MutationOutcome> {
        let endpoint = self.endpoint(key)?;
        self.mutations.delete(&endpoint.reference(), logical_index).await
    }

    pub async fn update_by_criteria(
        &self,
        key: &str,
        criteria: &Criteria,
        record: &Record,
    ) -> ServiceResult<MutationOutcome> {
        let endpoint = self.endpoint(key)?;
        self.mutations
            .update_by_criteria(&endpoint.reference(), criteria, record)
            .await
    }

    pub async fn delete_by_criteria(&self, key: &str, criteria: &Criteria) -> ServiceResult<MutationOutcome> {
        let endpoint = self.endpoint(key)?;
        self.mutations
            .delete_by_criteria(&endpoint.reference(), criteria)
            .await
    }

    pub async fn insert_after_criteria(
        &self,
        key: &str,
        criteria: &Criteria,
        record: &Record,
    ) -> ServiceResult<MutationOutcome> {
        let endpoint = self.endpoint(key)?;
        self.mutations
            .insert_after_criteria(&endpoint.reference(), criteria, record)
            .await
    }

    // ============================================================================
    // REGISTRY
    // ============================================================================

    /// Register a new endpoint. Access is probed so the caller learns whether
    /// the sheet still has to be shared; a failed probe does not block it.
    pub async fn register(
        &self,
        owner: &str,
        name: &str,
        spreadsheet_id: &str,
        range: Option<&str>,
    ) -> ServiceResult<Registration> {
        let name = name.trim();
        let spreadsheet_id = spreadsheet_id.trim();
        if name.is_empty() {
            return Err(ServiceError::invalid("name must not be empty"));
        }
        if spreadsheet_id.is_empty() {
            return Err(ServiceError::invalid("sheet_id must not be empty"));
        }

        let reference = SheetReference::new(spreadsheet_id, range);
        let share_with = self.store.caller_identity();
        let access = match self.store.check_access(spreadsheet_id).await {
            Ok(report) => Some(report),
            Err(e) => {
                warn!("Access probe for {} failed: {}", spreadsheet_id, e);
                None
            }
        };

        let endpoint = self.registry.register(owner, name, &reference)?;
        let message = match access {
            Some(AccessReport { writable: true, .. }) => "Endpoint created".to_string(),
            _ => format!(
                "Endpoint created. Share the spreadsheet with {} as Editor to enable writes",
                share_with
            ),
        };
        info!("Registered {} -> {} for {}", endpoint.endpoint_path, spreadsheet_id, owner);

        Ok(Registration {
            endpoint,
            share_with,
            access,
            message,
        })
    }

    pub fn list(&self, owner: &str) -> ServiceResult<Vec<EndpointRecord>> {
        Ok(self.registry.list_for_owner(owner)?)
    }

    /// Remove an endpoint the caller owns; anyone else's key reads as missing.
    pub fn remove(&self, owner: &str, key: &str) -> ServiceResult<()> {
        if self.registry.remove(owner, key)? {
            Ok(())
        } else {
            Err(ServiceError::NotFound("API endpoint not found".to_string()))
        }
    }

    /// Read a spreadsheet directly, without a registered endpoint. With no
    /// range the whole first tab is read.
    pub async fn raw_read(&self, spreadsheet_id: &str, range: Option<&str>) -> ServiceResult<RawSheet> {
        let spreadsheet_id = spreadsheet_id.trim();
        if spreadsheet_id.is_empty() {
            return Err(ServiceError::invalid("sheet_id must not be empty"));
        }
        // Missing spreadsheets and unparseable ranges are client errors here
        let fail = |e: StoreError| match e {
            StoreError::Api { status: 404, .. } => {
                ServiceError::NotFound(format!("Spreadsheet {} not found", spreadsheet_id))
            }
            StoreError::Api { status: 400, message } => {
                ServiceError::invalid(format!("Error fetching sheet data: {}", message))
            }
            e => classify(self.store.as_ref(), "reading sheet", e),
        };

        let range = match range.map(str::trim).filter(|r| !r.is_empty()) {
            Some(range) => range.to_string(),
            None => {
                let sheets = self
                    .store
                    .sheet_properties(spreadsheet_id)
                    .await
                    .map_err(fail)?;
                let first = sheets
                    .iter()
                    .min_by_key(|s| s.index)
                    .ok_or_else(|| ServiceError::NotFound("Spreadsheet has no sheets".to_string()))?;
                let prefix = sheet_prefix(&first.title);
                prefix.strip_suffix('!').unwrap_or(&prefix).to_string()
            }
        };

        let rows = self
            .store
            .read_range(spreadsheet_id, &range)
            .await
            .map_err(fail)?;
        Ok(raw_sheet(rows))
    }

    /// Compare an owned endpoint's header row with `required_headers`.
    pub async fn analyze(&self, owner: &str, key: &str, required_headers: &[String]) -> ServiceResult<StructureReport> {
        let endpoint = self.owned_endpoint(owner, key)?;
        let reference = endpoint.reference();
        let rows = self
            .store
            .read_range(&reference.spreadsheet_id, &reference.table_range())
            .await
            .map_err(|e| classify(self.store.as_ref(), "analyzing sheet", e))?;
        Ok(analyze_structure(&rows, required_headers))
    }
}
