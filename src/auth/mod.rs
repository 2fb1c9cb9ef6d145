// src/auth/mod.rs
//! Caller identification for registry operations.

pub mod clock;
pub mod keys;
pub mod token;

use std::sync::Arc;

use chrono::Duration;
use thiserror::Error;
use tracing::warn;

pub use clock::{Clock, SystemClock};
pub use keys::{HttpKeySource, Jwk, JwkSet, KeyCache, KeySource};
pub use token::{Claims, TokenVerifier};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("malformed token: {0}")]
    Malformed(String),
    #[error("unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("unknown signing key: {0}")]
    UnknownKey(String),
    #[error("signature verification failed")]
    BadSignature,
    #[error("token has expired")]
    Expired,
    #[error("token is not valid yet")]
    NotYetValid,
    #[error("invalid claims: {0}")]
    InvalidClaims(String),
    #[error("could not fetch signing keys: {0}")]
    KeyFetch(String),
    #[error("authentication is not configured")]
    NotConfigured,
}

/// Resolves the caller's user id from an `Authorization` header value.
#[derive(Debug)]
pub struct Authenticator {
    verifier: TokenVerifier,
}

impl Authenticator {
    pub fn new(verifier: TokenVerifier) -> Self {
        Self { verifier }
    }

    /// Build from optional JWKS URL and HS256 secret; either, both, or none
    /// may be given. With none every request is rejected.
    pub fn from_parts(
        jwks_url: Option<&str>,
        jwks_ttl: Duration,
        secret: Option<&str>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AuthError> {
        let mut verifier = TokenVerifier::new(clock.clone());
        if let Some(url) = jwks_url.filter(|u| !u.trim().is_empty()) {
            let source = Arc::new(HttpKeySource::new(url)?);
            verifier = verifier.with_key_cache(KeyCache::new(source, clock, jwks_ttl));
        }
        if let Some(secret) = secret.filter(|s| !s.is_empty()) {
            verifier = verifier.with_secret(secret.as_bytes());
        }
        if !verifier.is_configured() {
            warn!("No JWKS url or secret configured; registry operations will be rejected");
        }
        Ok(Self::new(verifier))
    }

    pub async fn authenticate(&self, authorization: Option<&str>) -> Result<String, AuthError> {
        let token = authorization
            .map(str::trim)
            .and_then(|value| {
                let (scheme, token) = value.split_once(' ')?;
                scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
            })
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingToken)?;

        if !self.verifier.is_configured() {
            return Err(AuthError::NotConfigured);
        }
        let claims = self.verifier.verify(token).await?;
        Ok(claims.sub)
    }

    /// Forget cached signing keys.
    pub async fn invalidate_keys(&self) {
        if let Some(cache) = self.verifier.key_cache() {
            cache.invalidate().await;
        }
    }
}
