// src/api/extract.rs
//! Request extractors that fail with `ServiceError` bodies instead of axum's
//! plain-text rejections.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::Json;
use serde_json::Value;
use tracing::debug;

use super::AppState;
use crate::error::ServiceError;
use crate::mutation::{record_from_json, Criteria, Record};

/// Owner id resolved from the bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub String);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        let user = state.auth.authenticate(header).await.map_err(|e| {
            debug!("Rejected bearer token: {}", e);
            ServiceError::from(e)
        })?;
        Ok(CurrentUser(user))
    }
}

/// JSON object body converted to a row record.
#[derive(Debug, Clone)]
pub struct RecordBody(pub Record);

#[async_trait]
impl<S: Send + Sync> FromRequest<S> for RecordBody {
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(json_rejection)?;
        Ok(RecordBody(record_from_json(&value)?))
    }
}

pub fn json_rejection(rejection: JsonRejection) -> ServiceError {
    debug!("Rejected request body: {}", rejection);
    ServiceError::invalid("Invalid JSON in request body")
}

/// Field criteria taken from every query parameter.
#[derive(Debug, Clone)]
pub struct CriteriaQuery(pub Criteria);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CriteriaQuery {
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<BTreeMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|e| ServiceError::invalid(format!("Invalid query string: {}", e)))?;
        Ok(CriteriaQuery(Criteria::new(params)?))
    }
}
