// src/sheets/google/credentials.rs
//! Service-account credentials and the OAuth2 JWT-bearer token exchange.

use std::fmt;

use base64::prelude::BASE64_URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use ring::signature::RsaKeyPair;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::sheets::store::{StoreError, StoreResult};

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
pub const DRIVE_METADATA_SCOPE: &str = "https://www.googleapis.com/auth/drive.metadata.readonly";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The JSON key file of a Google service account. Only the fields needed for
/// the token exchange are required.
#[derive(Clone, Deserialize)]
pub struct ServiceAccount {
    pub client_email: String,
    private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub private_key_id: Option<String>,
}

impl fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .field("project_id", &self.project_id)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct JwtHeader<'a> {
    alg: &'static str,
    typ: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    kid: Option<&'a str>,
}

#[derive(Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    exp: i64,
    iat: i64,
}

#[derive(Debug, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub expires_in: i64,
}

impl ServiceAccount {
    pub fn try_from_str(input: &str) -> StoreResult<Self> {
        serde_json::from_str(input).map_err(|e| {
            StoreError::Credentials(format!("Failed to deserialize service account key: {}", e))
        })
    }

    /// Build and sign the JWT assertion presented to the token endpoint.
    pub fn signed_assertion(&self, scope: &str, now: DateTime<Utc>) -> StoreResult<String> {
        let claims = JwtClaims {
            iss: &self.client_email,
            scope,
            aud: &self.token_uri,
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
        };
        let header = JwtHeader {
            alg: "RS256",
            typ: "JWT",
            kid: self.private_key_id.as_deref(),
        };

        let header_json = serde_json::to_string(&header)
            .map_err(|e| StoreError::Credentials(format!("Failed to encode jwt header: {}", e)))?;
        let claims_json = serde_json::to_string(&claims)
            .map_err(|e| StoreError::Credentials(format!("Failed to encode jwt claims: {}", e)))?;
        let signing_input = format!(
            "{}.{}",
            BASE64_URL_SAFE_NO_PAD.encode(header_json),
            BASE64_URL_SAFE_NO_PAD.encode(claims_json)
        );

        let key_pair = load_rsa_key_pair(&self.private_key).map_err(StoreError::Credentials)?;
        let signature =
            sign_rs256(&key_pair, signing_input.as_bytes()).map_err(StoreError::Credentials)?;

        Ok(format!(
            "{}.{}",
            signing_input,
            BASE64_URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    /// Exchange a freshly signed assertion for an access token.
    pub async fn fetch_access_token(&self, client: &reqwest::Client) -> StoreResult<AccessToken> {
        let scope = format!("{} {}", SHEETS_SCOPE, DRIVE_METADATA_SCOPE);
        let jwt = self.signed_assertion(&scope, Utc::now())?;
        let params = [
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", jwt.as_str()),
        ];

        debug!(client_email = %self.client_email, "Requesting access token");
        let response = client.post(&self.token_uri).form(&params).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Credentials(format!(
                "Token exchange failed with HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }
        Ok(response.json::<AccessToken>().await?)
    }
}

/// Parse a PEM private key (PKCS#8 or PKCS#1) into an RSA key pair.
pub fn load_rsa_key_pair(pem: &str) -> Result<RsaKeyPair, String> {
    let mut reader = std::io::Cursor::new(pem.as_bytes());
    let item = rustls_pemfile::read_one(&mut reader)
        .map_err(|e| format!("invalid PEM private key: {}", e))?;
    match item {
        Some(rustls_pemfile::Item::Pkcs8Key(der)) => RsaKeyPair::from_pkcs8(der.secret_pkcs8_der())
            .map_err(|_| "Failed to create rsa key pair from pkcs8 key".to_string()),
        Some(rustls_pemfile::Item::Pkcs1Key(der)) => RsaKeyPair::from_der(der.secret_pkcs1_der())
            .map_err(|_| "Failed to create rsa key pair from pkcs1 key".to_string()),
        _ => Err("Missing private key".to_string()),
    }
}

/// Sign with PKCS#1 v1.5 SHA-256 (RS256).
pub fn sign_rs256(key_pair: &RsaKeyPair, message: &[u8]) -> Result<Vec<u8>, String> {
    let mut signature = vec![0; key_pair.public().modulus_len()];
    key_pair
        .sign(
            &ring::signature::RSA_PKCS1_SHA256,
            &ring::rand::SystemRandom::new(),
            message,
            &mut signature,
        )
        .map_err(|_| "Failed to sign payload".to_string())?;
    Ok(signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ring::signature::{UnparsedPublicKey, RSA_PKCS1_2048_8192_SHA256};

    const TEST_KEY: &str = include_str!("../../../tests/fixtures/test_rsa_key.pem");

    fn account() -> ServiceAccount {
        let json = serde_json::json!({
            "type": "service_account",
            "client_email": "sheets-bot@demo-project.iam.gserviceaccount.com",
            "private_key": TEST_KEY,
            "private_key_id": "abc123",
        });
        ServiceAccount::try_from_str(&json.to_string()).unwrap()
    }

    #[test]
    fn test_defaults_token_uri() {
        let account = account();
        assert_eq!(account.token_uri, DEFAULT_TOKEN_URI);
        let debug = format!("{:?}", account);
        assert!(!debug.contains("PRIVATE KEY"));
    }

    #[test]
    fn test_signed_assertion_verifies() {
        let account = account();
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let jwt = account.signed_assertion(SHEETS_SCOPE, now).unwrap();

        let parts: Vec<&str> = jwt.split('.').collect();
        assert_eq!(parts.len(), 3);

        let header: serde_json::Value =
            serde_json::from_slice(&BASE64_URL_SAFE_NO_PAD.decode(parts[0]).unwrap()).unwrap();
        assert_eq!(header["alg"], "RS256");
        assert_eq!(header["kid"], "abc123");

        let claims: serde_json::Value =
            serde_json::from_slice(&BASE64_URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();
        assert_eq!(claims["iss"], "sheets-bot@demo-project.iam.gserviceaccount.com");
        assert_eq!(claims["exp"], 1_700_003_600);

        let key_pair = load_rsa_key_pair(TEST_KEY).unwrap();
        let signature = BASE64_URL_SAFE_NO_PAD.decode(parts[2]).unwrap();
        let signing_input = format!("{}.{}", parts[0], parts[1]);
        UnparsedPublicKey::new(&RSA_PKCS1_2048_8192_SHA256, key_pair.public().as_ref())
            .verify(signing_input.as_bytes(), &signature)
            .unwrap();
    }

    #[test]
    fn test_rejects_bad_key_material() {
        assert!(ServiceAccount::try_from_str("{}").is_err());
        assert!(load_rsa_key_pair("not a pem").is_err());
    }
}
