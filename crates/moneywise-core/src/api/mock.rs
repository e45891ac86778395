//! Scripted transport for exercising the session protocol in tests.

use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tokio::sync::watch;

use super::error::TransportError;
use super::transport::{HttpRequest, HttpResponse, Transport};

type Handler = Box<dyn Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync>;

pub(crate) const REFRESH_PATH: &str = "/user/generate-token";

pub(crate) struct MockTransport {
    handler: Handler,
    calls: Mutex<Vec<HttpRequest>>,
    // Number of 401 responses served so far
    unauthorized: watch::Sender<usize>,
    hold_refresh_until: Option<usize>,
}

impl MockTransport {
    pub(crate) fn new<F>(handler: F) -> Self
    where
        F: Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    {
        let (unauthorized, _) = watch::channel(0);
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
            unauthorized,
            hold_refresh_until: None,
        }
    }

    /// Keep refresh calls pending until `count` 401s have been served, so
    /// several requests are guaranteed to observe expiry before it resolves.
    pub(crate) fn hold_refresh_until(mut self, count: usize) -> Self {
        self.hold_refresh_until = Some(count);
        self
    }

    pub(crate) fn calls(&self) -> Vec<HttpRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn calls_to(&self, path: &str) -> Vec<HttpRequest> {
        self.calls()
            .into_iter()
            .filter(|call| call.path == path)
            .collect()
    }

    pub(crate) fn refresh_calls(&self) -> usize {
        self.calls_to(REFRESH_PATH).len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.calls.lock().unwrap().push(request.clone());

        if request.path == REFRESH_PATH {
            if let Some(count) = self.hold_refresh_until {
                let mut rx = self.unauthorized.subscribe();
                while *rx.borrow() < count {
                    if rx.changed().await.is_err() {
                        break;
                    }
                }
            }
        }

        let response = (self.handler)(&request)?;
        if response.status == StatusCode::UNAUTHORIZED {
            self.unauthorized.send_modify(|served| *served += 1);
        }
        Ok(response)
    }
}

pub(crate) fn json_response(
    status: StatusCode,
    body: Value,
) -> Result<HttpResponse, TransportError> {
    Ok(HttpResponse::new(status, body.to_string()))
}

pub(crate) fn unauthorized() -> Result<HttpResponse, TransportError> {
    json_response(StatusCode::UNAUTHORIZED, serde_json::json!({"message": "jwt expired"}))
}
