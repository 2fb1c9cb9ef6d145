// tests/common/mod.rs
// Router harness over the in-memory store and a tempfile registry

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use base64::prelude::BASE64_URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use sheetrest::api::{self, AppState};
use sheetrest::auth::{Authenticator, SystemClock, TokenVerifier};
use sheetrest::registry::EndpointRegistry;
use sheetrest::sheets::MemoryStore;
use sheetrest::SheetsApi;

pub const SECRET: &str = "integration-secret";
pub const PEOPLE_SHEET: &str = "people-sheet";
pub const IDENTITY: &str = "sheets-bot@test-project.iam.gserviceaccount.com";
pub const OWNER: &str = "alice";

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub router: Router,
    /// Key of the endpoint registered for `OWNER` over `PEOPLE_SHEET`.
    pub key: String,
    _dir: TempDir,
}

pub fn people_store() -> Arc<MemoryStore> {
    let store = MemoryStore::new(IDENTITY);
    store.add_sheet(
        PEOPLE_SHEET,
        "Sheet1",
        vec![
            vec!["id", "name", "status"],
            vec!["1", "Alice", "active"],
            vec!["2", "Bob", "inactive"],
            vec!["3", "Carol", "active"],
        ],
    );
    Arc::new(store)
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_store(people_store()).await
    }

    pub async fn with_store(store: Arc<MemoryStore>) -> Self {
        Self::with_cors(store, &["http://localhost:3000".to_string()]).await
    }

    pub async fn with_cors(store: Arc<MemoryStore>, cors_origins: &[String]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let registry = EndpointRegistry::open(&dir.path().join("registry.db")).unwrap();
        let api = SheetsApi::new(registry, store.clone());
        let key = api
            .register(OWNER, "People", PEOPLE_SHEET, None)
            .await
            .unwrap()
            .endpoint
            .key;

        let verifier = TokenVerifier::new(Arc::new(SystemClock)).with_secret(SECRET.as_bytes());
        let state = Arc::new(AppState::new(api, Authenticator::new(verifier)));
        let router = api::router(state, cors_origins);

        Self {
            store,
            router,
            key,
            _dir: dir,
        }
    }

    pub fn data_path(&self, suffix: &str) -> String {
        format!("/api/v1/data/{}{}", self.key, suffix)
    }

    /// Data rows of `PEOPLE_SHEET`, header excluded.
    pub fn data_rows(&self) -> Vec<Vec<String>> {
        self.store.rows(PEOPLE_SHEET, None).into_iter().skip(1).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.data_rows()
            .into_iter()
            .map(|row| row.get(1).cloned().unwrap_or_default())
            .collect()
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send_request(request).await
    }

    pub async fn send_request(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }
}

/// HS256 token for `sub` expiring `expires_in` seconds from now.
pub fn token_for(sub: &str, expires_in: i64) -> String {
    token_with_secret(sub, expires_in, SECRET)
}

pub fn token_with_secret(sub: &str, expires_in: i64, secret: &str) -> String {
    let header = json!({"alg": "HS256", "typ": "JWT"});
    let claims = json!({
        "sub": sub,
        "exp": chrono::Utc::now().timestamp() + expires_in,
    });
    let signing_input = format!(
        "{}.{}",
        BASE64_URL_SAFE_NO_PAD.encode(header.to_string()),
        BASE64_URL_SAFE_NO_PAD.encode(claims.to_string())
    );
    let key = ring::hmac::Key::new(ring::hmac::HMAC_SHA256, secret.as_bytes());
    let tag = ring::hmac::sign(&key, signing_input.as_bytes());
    format!("{}.{}", signing_input, BASE64_URL_SAFE_NO_PAD.encode(tag.as_ref()))
}
