//! REST API client module for the MoneyWise backend.
//!
//! This module provides the `SessionClient`, which attaches the stored
//! bearer token to each request and renews expired tokens, plus typed
//! wrappers for the goal, finance and assistant endpoints.

pub mod assistant;
pub mod client;
pub mod error;
pub mod finances;
pub mod goals;
pub mod transport;

#[cfg(test)]
pub(crate) mod mock;

pub use assistant::AssistantReply;
pub use client::SessionClient;
pub use error::{ApiError, TransportError};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
