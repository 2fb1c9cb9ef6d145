// src/error.rs

use thiserror::Error;

use crate::auth::AuthError;
use crate::registry::DbError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error(
        "Permission denied: share the spreadsheet with {identity} as Editor. \
         Error in {operation}: {detail}"
    )]
    AccessDenied {
        identity: String,
        operation: String,
        detail: String,
    },
    /// A structural change went through but the write that should have
    /// followed it did not.
    #[error("{operation} partially applied ({applied}); follow-up failed: {detail}")]
    PartiallyApplied {
        operation: String,
        applied: String,
        detail: String,
    },
    #[error("Error in {operation}: {detail}")]
    Backend { operation: String, detail: String },
    #[error("registry error: {0}")]
    Registry(#[from] DbError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    /// Short machine-readable kind, used as the `error` field of responses.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => "not_found",
            ServiceError::InvalidInput(_) => "invalid_input",
            ServiceError::Unauthorized(_) => "unauthorized",
            ServiceError::AccessDenied { .. } => "access_denied",
            ServiceError::PartiallyApplied { .. } => "partially_applied",
            ServiceError::Backend { .. } => "backend",
            ServiceError::Registry(_) => "registry",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::NotFound(_) => 404,
            ServiceError::InvalidInput(_) => 400,
            ServiceError::Unauthorized(_) => 401,
            ServiceError::AccessDenied { .. } => 403,
            ServiceError::PartiallyApplied { .. }
            | ServiceError::Backend { .. }
            | ServiceError::Registry(_) => 500,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        ServiceError::InvalidInput(message.into())
    }
}

impl From<AuthError> for ServiceError {
    fn from(e: AuthError) -> Self {
        ServiceError::Unauthorized(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_denied_names_identity() {
        let err = ServiceError::AccessDenied {
            identity: "bot@x.iam.gserviceaccount.com".to_string(),
            operation: "update".to_string(),
            detail: "HTTP 403: The caller does not have permission".to_string(),
        };
        let text = err.to_string();
        assert!(text.starts_with("Permission denied"));
        assert!(text.contains("bot@x.iam.gserviceaccount.com"));
        assert!(text.contains("Error in update"));
        assert_eq!(err.status_code(), 403);
        assert_eq!(err.kind(), "access_denied");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ServiceError::NotFound("x".into()).status_code(), 404);
        assert_eq!(ServiceError::invalid("x").status_code(), 400);
        assert_eq!(ServiceError::from(AuthError::Expired).status_code(), 401);
        let partial = ServiceError::PartiallyApplied {
            operation: "insert".into(),
            applied: "empty row inserted at row 2".into(),
            detail: "boom".into(),
        };
        assert_eq!(partial.status_code(), 500);
        assert_eq!(partial.kind(), "partially_applied");
        assert_eq!(
            ServiceError::from(DbError::Other("disk".into())).status_code(),
            500
        );
    }
}
