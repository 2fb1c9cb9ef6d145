// src/auth/keys.rs
//! Signing-key set (JWKS) retrieval and caching.
//!
//! The cache is owned by whoever verifies tokens; nothing here is global.
//! Entries expire after a TTL measured on an injected [`Clock`], can be
//! dropped with [`KeyCache::invalidate`], and an unknown `kid` triggers one
//! refetch so rotated keys are picked up before the TTL runs out.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

use super::clock::Clock;
use super::AuthError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Jwk {
    pub kty: String,
    #[serde(default)]
    pub kid: Option<String>,
    #[serde(default)]
    pub alg: Option<String>,
    /// RSA modulus, base64url.
    #[serde(default)]
    pub n: Option<String>,
    /// RSA exponent, base64url.
    #[serde(default)]
    pub e: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct JwkSet {
    #[serde(default)]
    pub keys: Vec<Jwk>,
}

impl JwkSet {
    /// Key matching `kid`; without a `kid` only an unambiguous single RSA key
    /// is returned.
    pub fn find(&self, kid: Option<&str>) -> Option<&Jwk> {
        match kid {
            Some(kid) => self.keys.iter().find(|k| k.kid.as_deref() == Some(kid)),
            None => {
                let mut rsa = self.keys.iter().filter(|k| k.kty == "RSA");
                match (rsa.next(), rsa.next()) {
                    (Some(only), None) => Some(only),
                    _ => None,
                }
            }
        }
    }
}

#[async_trait]
pub trait KeySource: Send + Sync + Debug {
    async fn fetch(&self) -> Result<JwkSet, AuthError>;
}

/// Fetches the key set from a JWKS URL.
#[derive(Debug)]
pub struct HttpKeySource {
    client: reqwest::Client,
    url: Url,
}

impl HttpKeySource {
    pub fn new(url: &str) -> Result<Self, AuthError> {
        let url = Url::parse(url).map_err(|e| AuthError::KeyFetch(format!("invalid JWKS url: {}", e)))?;
        Ok(Self {
            client: reqwest::Client::new(),
            url,
        })
    }
}

#[async_trait]
impl KeySource for HttpKeySource {
    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| AuthError::KeyFetch(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::KeyFetch(format!(
                "JWKS endpoint returned HTTP {}",
                status.as_u16()
            )));
        }
        response
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthError::KeyFetch(format!("malformed JWKS: {}", e)))
    }
}

#[derive(Debug)]
struct CachedKeys {
    keys: JwkSet,
    fetched_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct KeyCache {
    source: Arc<dyn KeySource>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    state: Mutex<Option<CachedKeys>>,
}

impl KeyCache {
    pub fn new(source: Arc<dyn KeySource>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            source,
            clock,
            ttl,
            state: Mutex::new(None),
        }
    }

    /// Drop the cached key set; the next lookup refetches.
    pub async fn invalidate(&self) {
        *self.state.lock().await = None;
    }

    /// Look up the verification key for `kid`.
    pub async fn key(&self, kid: Option<&str>) -> Result<Jwk, AuthError> {
        let mut state = self.state.lock().await;
        let now = self.clock.now();

        let fresh = state
            .as_ref()
            .is_some_and(|cached| now - cached.fetched_at < self.ttl);
        if fresh {
            if let Some(key) = state.as_ref().and_then(|cached| cached.keys.find(kid)) {
                return Ok(key.clone());
            }
            debug!(?kid, "Signing key not in cached set, refetching");
        }

        let keys = self.source.fetch().await?;
        let found = keys.find(kid).cloned();
        *state = Some(CachedKeys {
            keys,
            fetched_at: now,
        });
        found.ok_or_else(|| AuthError::UnknownKey(kid.unwrap_or("<none>").to_string()))
    }
}
