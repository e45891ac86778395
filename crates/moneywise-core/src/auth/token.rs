//! Access token payload decoding.
//!
//! Reads the JWT payload segment to find out who the session belongs to.
//! The signature is NOT verified: the server does that on every request,
//! and the decoded identity is only used to scope data requests.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Invalid token format: expected 3 segments, got {0}")]
    Format(usize),

    #[error("Invalid token payload base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("Invalid token payload JSON: {0}")]
    Payload(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct Claims {
    id: i64,
    email: String,
    #[serde(default)]
    exp: Option<i64>,
}

/// The user an access token was issued to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: i64,
    pub email: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Identity {
    pub fn from_access_token(token: &str) -> Result<Self, TokenError> {
        let segments: Vec<&str> = token.split('.').collect();
        if segments.len() != 3 {
            return Err(TokenError::Format(segments.len()));
        }

        // Some issuers pad the payload anyway
        let payload = URL_SAFE_NO_PAD.decode(segments[1].trim_end_matches('='))?;
        let claims: Claims = serde_json::from_slice(&payload)?;

        Ok(Self {
            id: claims.id,
            email: claims.email,
            expires_at: claims.exp.and_then(|exp| DateTime::from_timestamp(exp, 0)),
        })
    }

    /// Tokens without an `exp` claim never read as expired.
    pub fn is_expired(&self) -> bool {
        self.expires_at.map(|exp| Utc::now() >= exp).unwrap_or(false)
    }
}

#[cfg(test)]
pub(crate) fn encode_test_token(payload: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{}.{}.signature", header, body)
}
