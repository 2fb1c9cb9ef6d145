// src/auth/token.rs
//! Bearer-token verification.
//!
//! Every token is signature-checked before any claim is trusted: RS256
//! against the cached key set, HS256 against the configured secret. Any
//! other `alg` (including `none`) is rejected.

use std::sync::Arc;

use base64::prelude::BASE64_URL_SAFE_NO_PAD;
use base64::Engine;
use ring::signature::{RsaPublicKeyComponents, RSA_PKCS1_2048_8192_SHA256};
use ring::hmac;
use serde::Deserialize;

use super::clock::Clock;
use super::keys::KeyCache;
use super::AuthError;

/// Allowed clock skew when checking `exp` / `nbf`.
const LEEWAY_SECS: i64 = 30;

#[derive(Debug, Deserialize)]
struct Header {
    alg: String,
    #[serde(default)]
    kid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    #[serde(default)]
    pub nbf: Option<i64>,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub iss: Option<String>,
}

#[derive(Debug)]
pub struct TokenVerifier {
    keys: Option<KeyCache>,
    secret: Option<hmac::Key>,
    clock: Arc<dyn Clock>,
}

fn decode_segment(segment: &str, what: &str) -> Result<Vec<u8>, AuthError> {
    BASE64_URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| AuthError::Malformed(format!("{} is not base64url: {}", what, e)))
}

impl TokenVerifier {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            keys: None,
            secret: None,
            clock,
        }
    }

    pub fn with_key_cache(mut self, keys: KeyCache) -> Self {
        self.keys = Some(keys);
        self
    }

    pub fn with_secret(mut self, secret: &[u8]) -> Self {
        self.secret = Some(hmac::Key::new(hmac::HMAC_SHA256, secret));
        self
    }

    pub fn is_configured(&self) -> bool {
        self.keys.is_some() || self.secret.is_some()
    }

    /// Key cache backing RS256 verification, if any.
    pub fn key_cache(&self) -> Option<&KeyCache> {
        self.keys.as_ref()
    }

    pub async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut parts = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(sig_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::Malformed("expected three dot-separated segments".to_string()));
        };

        let header: Header = serde_json::from_slice(&decode_segment(header_b64, "header")?)
            .map_err(|e| AuthError::Malformed(format!("bad header: {}", e)))?;
        let signature = decode_segment(sig_b64, "signature")?;
        let signing_input = &token[..header_b64.len() + 1 + claims_b64.len()];

        match header.alg.as_str() {
            "RS256" => {
                let keys = self
                    .keys
                    .as_ref()
                    .ok_or_else(|| AuthError::UnsupportedAlgorithm(header.alg.clone()))?;
                let jwk = keys.key(header.kid.as_deref()).await?;
                let (Some(n), Some(e)) = (jwk.n.as_deref(), jwk.e.as_deref()) else {
                    return Err(AuthError::UnknownKey(format!(
                        "{} has no RSA components",
                        jwk.kid.as_deref().unwrap_or("<none>")
                    )));
                };
                let components = RsaPublicKeyComponents {
                    n: decode_segment(n, "modulus")?,
                    e: decode_segment(e, "exponent")?,
                };
                components
                    .verify(&RSA_PKCS1_2048_8192_SHA256, signing_input.as_bytes(), &signature)
                    .map_err(|_| AuthError::BadSignature)?;
            }
            "HS256" => {
                let secret = self
                    .secret
                    .as_ref()
                    .ok_or_else(|| AuthError::UnsupportedAlgorithm(header.alg.clone()))?;
                hmac::verify(secret, signing_input.as_bytes(), &signature)
                    .map_err(|_| AuthError::BadSignature)?;
            }
            other => return Err(AuthError::UnsupportedAlgorithm(other.to_string())),
        }

        let claims: Claims = serde_json::from_slice(&decode_segment(claims_b64, "claims")?)
            .map_err(|e| AuthError::InvalidClaims(e.to_string()))?;

        let now = self.clock.now().timestamp();
        if now > claims.exp.saturating_add(LEEWAY_SECS) {
            return Err(AuthError::Expired);
        }
        if claims.nbf.is_some_and(|nbf| nbf > now.saturating_add(LEEWAY_SECS)) {
            return Err(AuthError::NotYetValid);
        }
        if claims.sub.trim().is_empty() {
            return Err(AuthError::InvalidClaims("empty subject".to_string()));
        }
        Ok(claims)
    }
}
