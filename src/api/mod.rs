// src/api/mod.rs
//! HTTP surface (axum).
//!
//! Routes:
//! - `/health`
//! - `/api/v1/sheets[/:key[/analyze]]`: registry, bearer token required
//! - `/api/v1/spreadsheets/:sheet_id?range=`: raw values, bearer token required
//! - `/api/v1/data/:key[/rows/:row | /field/{update,delete,insert}]`: data

pub mod data;
pub mod error;
pub mod extract;
pub mod handlers;

use std::sync::Arc;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::auth::Authenticator;
use crate::service::SheetsApi;

/// State shared by every handler for the lifetime of the server.
#[derive(Debug)]
pub struct AppState {
    pub api: SheetsApi,
    pub auth: Authenticator,
}

impl AppState {
    pub fn new(api: SheetsApi, auth: Authenticator) -> Self {
        Self { api, auth }
    }
}

/// Origin `*` echoes the caller's origin back; a literal wildcard cannot be
/// combined with credentials.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o.trim() == "*") {
        AllowOrigin::mirror_request()
    } else {
        let allowed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin '{}'", origin);
                    None
                }
            })
            .collect();
        AllowOrigin::list(allowed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true)
}

pub fn router(state: Arc<AppState>, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Registry
        .route(
            "/api/v1/sheets",
            post(handlers::register).get(handlers::list),
        )
        .route("/api/v1/sheets/:key", delete(handlers::remove))
        .route("/api/v1/sheets/:key/analyze", get(handlers::analyze))
        .route("/api/v1/spreadsheets/:sheet_id", get(handlers::raw_read))
        // Generated data endpoints
        .route("/api/v1/data/:key", get(data::read).post(data::insert))
        .route(
            "/api/v1/data/:key/rows/:row",
            put(data::update_row).delete(data::delete_row),
        )
        .route("/api/v1/data/:key/field/update", put(data::update_by_field))
        .route("/api/v1/data/:key/field/delete", delete(data::delete_by_field))
        .route("/api/v1/data/:key/field/insert", post(data::insert_after_field))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .with_state(state)
}
