// src/api/data.rs
//! Generated data endpoints: `/api/v1/data/:key/...`.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;

use super::extract::{CriteriaQuery, RecordBody};
use super::AppState;
use crate::error::{ServiceError, ServiceResult};
use crate::mutation::{parse_row_index, InsertPosition, MutationOutcome};
use crate::query::{ReadOptions, ReadPage, SortOrder};

type Params = Query<BTreeMap<String, String>>;

fn parse_number(params: &BTreeMap<String, String>, name: &str) -> ServiceResult<Option<u32>> {
    params
        .get(name)
        .map(|raw| {
            raw.trim().parse::<u32>().map_err(|_| {
                ServiceError::invalid(format!("{} must be a non-negative integer", name))
            })
        })
        .transpose()
}

fn parse_flag(raw: &str) -> ServiceResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ServiceError::invalid(format!("Invalid debug flag '{}'", other))),
    }
}

pub fn read_options(params: &BTreeMap<String, String>) -> ServiceResult<ReadOptions> {
    let defaults = ReadOptions::default();
    Ok(ReadOptions {
        limit: parse_number(params, "limit")?.unwrap_or(defaults.limit),
        offset: parse_number(params, "offset")?.unwrap_or(defaults.offset),
        sort_by: params
            .get("sort_by")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        sort_order: params
            .get("sort_order")
            .map(|s| s.parse::<SortOrder>())
            .transpose()?
            .unwrap_or_default(),
        debug: params.get("debug").map(|s| parse_flag(s)).transpose()?.unwrap_or(false),
    })
}

pub async fn read(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Query(params): Params,
) -> ServiceResult<Json<ReadPage>> {
    let options = read_options(&params)?;
    Ok(Json(state.api.read(&key, &options).await?))
}

pub async fn insert(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Query(params): Params,
    RecordBody(record): RecordBody,
) -> ServiceResult<Json<MutationOutcome>> {
    let position = params
        .get("position")
        .map(|p| p.parse::<InsertPosition>())
        .transpose()?
        .unwrap_or_default();
    Ok(Json(state.api.insert(&key, &record, position).await?))
}

pub async fn update_row(
    State(state): State<Arc<AppState>>,
    Path((key, row)): Path<(String, String)>,
    RecordBody(record): RecordBody,
) -> ServiceResult<Json<MutationOutcome>> {
    let index = parse_row_index(&row)?;
    Ok(Json(state.api.update(&key, index, &record).await?))
}

pub async fn delete_row(
    State(state): State<Arc<AppState>>,
    Path((key, row)): Path<(String, String)>,
) -> ServiceResult<Json<MutationOutcome>> {
    let index = parse_row_index(&row)?;
    Ok(Json(state.api.delete(&key, index).await?))
}

pub async fn update_by_field(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    CriteriaQuery(criteria): CriteriaQuery,
    RecordBody(record): RecordBody,
) -> ServiceResult<Json<MutationOutcome>> {
    Ok(Json(
        state.api.update_by_criteria(&key, &criteria, &record).await?,
    ))
}

pub async fn delete_by_field(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    CriteriaQuery(criteria): CriteriaQuery,
) -> ServiceResult<Json<MutationOutcome>> {
    Ok(Json(state.api.delete_by_criteria(&key, &criteria).await?))
}

pub async fn insert_after_field(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    CriteriaQuery(criteria): CriteriaQuery,
    RecordBody(record): RecordBody,
) -> ServiceResult<Json<MutationOutcome>> {
    Ok(Json(
        state.api.insert_after_criteria(&key, &criteria, &record).await?,
    ))
}
