//! Authentication state: credential storage and session tokens.
//!
//! This module provides:
//! - `CredentialStore`: persistent key-value storage with per-entry expiry
//!   (`MemoryStore`, `FileStore`, `KeyringStore`)
//! - `Session`: the access/refresh token pair held in a store
//! - `Identity`: the user decoded from an access token
//!
//! Access tokens are kept for 1 day, refresh tokens for 7 days.

pub mod credentials;
pub mod session;
pub mod token;

pub use credentials::{CredentialStore, FileStore, KeyringStore, MemoryStore, StoreError};
pub use session::{CredentialPair, IdentityError, Session, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
pub use token::{Identity, TokenError};
