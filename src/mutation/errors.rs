// src/mutation/errors.rs

use tracing::error;

use crate::error::ServiceError;
use crate::sheets::store::{SpreadsheetStore, StoreError};

/// Map a store failure onto the service taxonomy. Authorization failures
/// name the identity that needs Editor access.
pub fn classify(store: &dyn SpreadsheetStore, operation: &str, err: StoreError) -> ServiceError {
    error!("Error in {}: {}", operation, err);
    if err.is_permission_denied() {
        ServiceError::AccessDenied {
            identity: store.caller_identity(),
            operation: operation.to_string(),
            detail: err.to_string(),
        }
    } else {
        ServiceError::Backend {
            operation: operation.to_string(),
            detail: err.to_string(),
        }
    }
}
