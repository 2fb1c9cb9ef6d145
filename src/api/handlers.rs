// src/api/handlers.rs
//! Registry endpoints under `/api/v1/sheets`, plus the raw spreadsheet read.
//! All require a bearer token; registry calls only ever see the caller's own
//! endpoints.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::extract::{json_rejection, CurrentUser};
use super::AppState;
use crate::error::ServiceResult;
use crate::query::{RawSheet, StructureReport, DEFAULT_REQUIRED_HEADERS};
use crate::registry::EndpointRecord;
use crate::service::Registration;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub sheet_id: String,
    #[serde(default)]
    pub sheet_range: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeParams {
    /// Comma separated header names.
    #[serde(default)]
    pub required: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawParams {
    #[serde(default)]
    pub range: Option<String>,
}

impl AnalyzeParams {
    fn required_headers(&self) -> Vec<String> {
        let named: Vec<String> = self
            .required
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(String::from)
            .collect();
        if named.is_empty() {
            DEFAULT_REQUIRED_HEADERS.iter().map(|h| h.to_string()).collect()
        } else {
            named
        }
    }
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    CurrentUser(owner): CurrentUser,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> ServiceResult<(StatusCode, Json<Registration>)> {
    let Json(request) = body.map_err(json_rejection)?;
    let registration = state
        .api
        .register(
            &owner,
            &request.name,
            &request.sheet_id,
            request.sheet_range.as_deref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(registration)))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    CurrentUser(owner): CurrentUser,
) -> ServiceResult<Json<Vec<EndpointRecord>>> {
    Ok(Json(state.api.list(&owner)?))
}

pub async fn remove(
    State(state): State<Arc<AppState>>,
    CurrentUser(owner): CurrentUser,
    Path(key): Path<String>,
) -> ServiceResult<Json<Value>> {
    state.api.remove(&owner, &key)?;
    Ok(Json(json!({ "message": "Endpoint deleted successfully" })))
}

pub async fn analyze(
    State(state): State<Arc<AppState>>,
    CurrentUser(owner): CurrentUser,
    Path(key): Path<String>,
    Query(params): Query<AnalyzeParams>,
) -> ServiceResult<Json<StructureReport>> {
    let required = params.required_headers();
    Ok(Json(state.api.analyze(&owner, &key, &required).await?))
}

/// Raw values of any spreadsheet the service identity can read.
pub async fn raw_read(
    State(state): State<Arc<AppState>>,
    CurrentUser(_caller): CurrentUser,
    Path(sheet_id): Path<String>,
    Query(params): Query<RawParams>,
) -> ServiceResult<Json<RawSheet>> {
    Ok(Json(
        state.api.raw_read(&sheet_id, params.range.as_deref()).await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_headers_default_to_template() {
        let none = AnalyzeParams::default();
        assert_eq!(none.required_headers(), vec!["id", "name", "created_at"]);

        let blank = AnalyzeParams {
            required: Some(" , ".to_string()),
        };
        assert_eq!(blank.required_headers(), vec!["id", "name", "created_at"]);

        let named = AnalyzeParams {
            required: Some("sku, price".to_string()),
        };
        assert_eq!(named.required_headers(), vec!["sku", "price"]);
    }
}
