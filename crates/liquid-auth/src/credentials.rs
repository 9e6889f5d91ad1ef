//! Authentication credentials for the Liquid API
//!
//! Liquid signs private requests with an HS256 JWT over
//! `{path, nonce, token_id}`, carried in the `X-Quoine-Auth` header.
//!
//! # Security
//!
//! Token secrets are stored using the `secrecy` crate which:
//! - Zeroizes memory on drop (prevents memory scanning)
//! - Prevents accidental logging via Debug impl
//! - Provides explicit access via `expose_secret()`

use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL, Engine};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretBox};
use serde::Serialize;
use sha2::Sha256;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

use crate::error::AuthResult;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the signature on private requests
pub const SIGNATURE_HEADER: &str = "X-Quoine-Auth";

/// Atomic nonce counter to ensure unique nonces even with rapid requests
static NONCE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// HTTP method of the request being signed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// Canonical description of a request to be signed
///
/// The realtime handshake signs `GET /realtime` with an empty body; REST
/// calls describe their own path and body.
#[derive(Debug, Clone)]
pub struct RequestDescriptor<'a> {
    /// Request path (e.g. "/realtime")
    pub path: &'a str,
    /// HTTP method
    pub method: Method,
    /// Request body ("" for GET)
    pub body: &'a str,
}

impl<'a> RequestDescriptor<'a> {
    /// Describe a GET request with an empty body
    pub fn get(path: &'a str) -> Self {
        Self {
            path,
            method: Method::Get,
            body: "",
        }
    }
}

#[derive(Serialize)]
struct JwtHeader {
    alg: &'static str,
    typ: &'static str,
}

#[derive(Serialize)]
struct JwtClaims<'a> {
    path: &'a str,
    nonce: String,
    token_id: &'a str,
}

/// API token credentials for authenticated requests
///
/// The token secret is automatically zeroized when the Credentials are
/// dropped, preventing sensitive data from remaining in memory.
pub struct Credentials {
    /// Token id (public)
    token_id: String,
    /// Token secret (zeroized on drop)
    secret: SecretBox<Vec<u8>>,
}

impl Credentials {
    /// Create new credentials from a token id and secret
    pub fn new(token_id: impl Into<String>, secret: impl AsRef<str>) -> AuthResult<Self> {
        Ok(Self {
            token_id: token_id.into(),
            secret: SecretBox::new(Box::new(secret.as_ref().as_bytes().to_vec())),
        })
    }

    /// Create credentials from environment variables
    ///
    /// Reads `LIQUID_TOKEN_ID` and `LIQUID_TOKEN_SECRET` from the environment.
    pub fn from_env() -> AuthResult<Self> {
        let token_id = std::env::var("LIQUID_TOKEN_ID")
            .map_err(|_| crate::AuthError::EnvVarNotSet("LIQUID_TOKEN_ID".to_string()))?;
        let secret = std::env::var("LIQUID_TOKEN_SECRET")
            .map_err(|_| crate::AuthError::EnvVarNotSet("LIQUID_TOKEN_SECRET".to_string()))?;

        Self::new(token_id, secret)
    }

    /// Get the token id
    pub fn token_id(&self) -> &str {
        &self.token_id
    }

    /// Generate a unique nonce for this request
    ///
    /// Nonces must be strictly increasing. We use a millisecond timestamp
    /// plus an atomic counter to handle rapid successive requests.
    pub fn generate_nonce() -> String {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards")
            .as_millis() as u64;

        // Combine timestamp with counter for uniqueness
        let counter = NONCE_COUNTER.fetch_add(1, Ordering::SeqCst);
        format!("{}{:06}", timestamp, counter % 1_000_000)
    }

    /// Sign a request descriptor, returning the auth headers
    ///
    /// Produces a header map containing [`SIGNATURE_HEADER`] with an HS256
    /// JWT over `{path, nonce, token_id}`. Only the path participates in
    /// the signature; method and body are part of the canonical descriptor
    /// for interface symmetry with the REST signer.
    pub fn sign_request(&self, request: &RequestDescriptor<'_>) -> AuthResult<HashMap<String, String>> {
        let signature = self.sign_path(request.path, &Self::generate_nonce())?;
        debug!(path = request.path, token_id = %self.token_id, "signed request");

        let mut headers = HashMap::with_capacity(1);
        headers.insert(SIGNATURE_HEADER.to_string(), signature);
        Ok(headers)
    }

    /// Build the JWT signature for a path with an explicit nonce
    pub fn sign_path(&self, path: &str, nonce: &str) -> AuthResult<String> {
        let header = serde_json::to_vec(&JwtHeader {
            alg: "HS256",
            typ: "JWT",
        })?;
        let claims = serde_json::to_vec(&JwtClaims {
            path,
            nonce: nonce.to_string(),
            token_id: &self.token_id,
        })?;

        let mut signing_input = BASE64URL.encode(header);
        signing_input.push('.');
        signing_input.push_str(&BASE64URL.encode(claims));

        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let tag = mac.finalize();

        Ok(format!(
            "{}.{}",
            signing_input,
            BASE64URL.encode(tag.into_bytes())
        ))
    }
}

impl Clone for Credentials {
    /// Clone credentials (creates a new SecretBox with the same content)
    fn clone(&self) -> Self {
        Self {
            token_id: self.token_id.clone(),
            secret: SecretBox::new(Box::new(self.secret.expose_secret().clone())),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("token_id", &self.token_id)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonce_generation() {
        let nonce1 = Credentials::generate_nonce();
        let nonce2 = Credentials::generate_nonce();
        assert_ne!(nonce1, nonce2);
    }

    #[test]
    fn test_nonce_is_numeric() {
        let nonce = Credentials::generate_nonce();
        assert!(nonce.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let creds = Credentials::new("651514", "very-secret-token").unwrap();
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("very-secret-token"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_jwt_shape() {
        let creds = Credentials::new("651514", "secret").unwrap();
        let jwt = creds.sign_path("/realtime", "1616492376594").unwrap();

        let segments: Vec<&str> = jwt.split('.').collect();
        assert_eq!(segments.len(), 3);

        let header = BASE64URL.decode(segments[0]).unwrap();
        let header: serde_json::Value = serde_json::from_slice(&header).unwrap();
        assert_eq!(header["alg"], "HS256");

        let claims = BASE64URL.decode(segments[1]).unwrap();
        let claims: serde_json::Value = serde_json::from_slice(&claims).unwrap();
        assert_eq!(claims["path"], "/realtime");
        assert_eq!(claims["nonce"], "1616492376594");
        assert_eq!(claims["token_id"], "651514");
    }

    #[test]
    fn test_signing_consistency() {
        let creds = Credentials::new("651514", "secret").unwrap();
        let jwt1 = creds.sign_path("/realtime", "1616492376594").unwrap();
        let jwt2 = creds.sign_path("/realtime", "1616492376594").unwrap();
        assert_eq!(jwt1, jwt2);

        // A different nonce must produce a different signature
        let jwt3 = creds.sign_path("/realtime", "1616492376595").unwrap();
        assert_ne!(jwt1, jwt3);
    }

    #[test]
    fn test_sign_request_headers() {
        let creds = Credentials::new("651514", "secret").unwrap();
        let headers = creds
            .sign_request(&RequestDescriptor::get("/realtime"))
            .unwrap();
        assert_eq!(headers.len(), 1);
        assert!(headers.contains_key(SIGNATURE_HEADER));
    }
}
