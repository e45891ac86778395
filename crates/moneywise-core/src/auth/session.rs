use std::fmt;
use std::sync::Arc;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::credentials::{CredentialStore, StoreError};
use super::token::{Identity, TokenError};

/// Store key for the access token
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

/// Store key for the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Access tokens are short-lived.
const ACCESS_TOKEN_TTL_DAYS: i64 = 1;

/// Refresh tokens outlive access tokens so a session survives a week of inactivity.
const REFRESH_TOKEN_TTL_DAYS: i64 = 7;

/// Why the logged-in identity could not be read.
#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Credential store error: {0}")]
    Store(#[from] StoreError),

    #[error("Stored access token is unreadable: {0}")]
    Token(#[from] TokenError),
}

/// The (access, refresh) token pair persisted for a session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl CredentialPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

// Tokens must never end up in logs
impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Typed view over a `CredentialStore` holding the session's token pair.
///
/// Every accessor reads the store, so callers always see the latest
/// persisted tokens rather than a copy cached across requests.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn CredentialStore>,
}

impl Session {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    pub fn access_token(&self) -> Result<Option<String>, StoreError> {
        self.store.get(ACCESS_TOKEN_KEY)
    }

    pub fn refresh_token(&self) -> Result<Option<String>, StoreError> {
        self.store.get(REFRESH_TOKEN_KEY)
    }

    /// The stored pair, or `None` if either half is missing.
    pub fn credentials(&self) -> Result<Option<CredentialPair>, StoreError> {
        match (self.access_token()?, self.refresh_token()?) {
            (Some(access), Some(refresh)) => Ok(Some(CredentialPair::new(access, refresh))),
            _ => Ok(None),
        }
    }

    pub fn save(&self, pair: &CredentialPair) -> Result<(), StoreError> {
        self.store.set(
            ACCESS_TOKEN_KEY,
            &pair.access_token,
            Duration::days(ACCESS_TOKEN_TTL_DAYS),
        )?;
        self.store.set(
            REFRESH_TOKEN_KEY,
            &pair.refresh_token,
            Duration::days(REFRESH_TOKEN_TTL_DAYS),
        )?;
        debug!("Credential pair saved");
        Ok(())
    }

    /// Remove both tokens. Both deletes are attempted even if the first fails.
    pub fn clear(&self) -> Result<(), StoreError> {
        let access = self.store.delete(ACCESS_TOKEN_KEY);
        let refresh = self.store.delete(REFRESH_TOKEN_KEY);
        debug!("Credential pair cleared");
        access.and(refresh)
    }

    /// Route-guard check: a session exists when both tokens are stored.
    pub fn is_present(&self) -> bool {
        matches!(self.credentials(), Ok(Some(_)))
    }

    /// Decode the identity carried by the stored access token.
    /// `Ok(None)` only when no access token is stored.
    pub fn identity(&self) -> Result<Option<Identity>, IdentityError> {
        match self.access_token()? {
            Some(token) => Ok(Some(Identity::from_access_token(&token)?)),
            None => Ok(None),
        }
    }
}
