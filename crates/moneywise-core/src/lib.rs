//! MoneyWise client core.
//!
//! Session handling for the MoneyWise personal finance API: token storage,
//! authenticated requests with single-flight token renewal, and typed
//! endpoint wrappers.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiError, SessionClient};
pub use auth::{CredentialPair, Identity, IdentityError, Session};
pub use config::Config;
