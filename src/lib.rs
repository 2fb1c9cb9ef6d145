// src/lib.rs
//! sheetrest: REST endpoints generated over Google Sheets ranges.
//!
//! Layers, bottom up:
//! - `sheets`: backing store trait, Google and in-memory implementations
//! - `registry`: SQLite endpoint registry
//! - `mutation` / `query`: row addressing, mutation and read shaping
//! - `service`: operation surface keyed by endpoint key
//! - `auth`, `api`: bearer-token verification and the axum router

pub mod api;
pub mod app;
pub mod auth;
pub mod cli;
pub mod error;
pub mod logging;
pub mod mutation;
pub mod query;
pub mod registry;
pub mod service;
pub mod settings;
pub mod sheets;

pub use error::{ServiceError, ServiceResult};
pub use service::{Registration, SheetsApi};
