//! Session client for the MoneyWise REST API.
//!
//! Every authenticated call goes through `SessionClient::request`, which
//! attaches the stored access token, and on a 401 renews the token pair
//! once and retries once. Concurrent requests that hit an expired token
//! share a single refresh call.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use anyhow::Context;
use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::auth::{CredentialPair, Identity, IdentityError, Session};
use crate::config::{Config, Endpoints};
use crate::models::user::UserEnvelope;
use crate::models::{RegisterData, UserProfile};

use super::error::ApiError;
use super::transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};

/// Outcome of a refresh as seen by every request waiting on it
type RefreshOutcome = Result<CredentialPair, Arc<ApiError>>;

struct PendingRefresh {
    id: u64,
    outcome: Shared<BoxFuture<'static, RefreshOutcome>>,
}

/// Token-issuing endpoints answer with this shape.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl TokenResponse {
    fn into_pair(self) -> Result<CredentialPair, String> {
        if self.success == Some(false) {
            return Err(self.message.unwrap_or_else(|| "success: false".to_string()));
        }
        match (self.access_token, self.refresh_token) {
            (Some(access), Some(refresh)) if !access.is_empty() && !refresh.is_empty() => {
                Ok(CredentialPair::new(access, refresh))
            }
            _ => Err("response carried no token pair".to_string()),
        }
    }
}

/// Retry eligibility of one logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    First,
    Retry,
}

struct Inner {
    transport: Arc<dyn Transport>,
    session: Session,
    endpoints: Endpoints,
    pending: Mutex<Option<PendingRefresh>>,
    next_refresh_id: AtomicU64,
}

/// Authenticated API client.
/// Clone is cheap - all clones share the transport, store and refresh state.
#[derive(Clone)]
pub struct SessionClient {
    inner: Arc<Inner>,
}

impl SessionClient {
    pub fn new(transport: Arc<dyn Transport>, session: Session, endpoints: Endpoints) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                session,
                endpoints,
                pending: Mutex::new(None),
                next_refresh_id: AtomicU64::new(1),
            }),
        }
    }

    /// Build a client talking to `config.api_url` with the configured store.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let transport = ReqwestTransport::new(&config.api_url, config.request_timeout())
            .context("Failed to build HTTP client")?;
        let store = config.open_store()?;
        Ok(Self::new(
            Arc::new(transport),
            Session::new(store),
            config.endpoints.clone(),
        ))
    }

    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    /// Route-guard check: true when a token pair is stored.
    pub fn is_authenticated(&self) -> bool {
        self.inner.session.is_present()
    }

    /// Identity of the logged-in user, decoded from the stored access token.
    pub fn identity(&self) -> Result<Option<Identity>, IdentityError> {
        self.inner.session.identity()
    }

    // ========================================================================
    // Authenticated requests
    // ========================================================================

    /// Send a request with the stored credentials, renewing them once on 401.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<HttpResponse, ApiError> {
        let mut request = HttpRequest::new(method, path);
        request.body = body;

        let mut attempt = Attempt::First;
        let mut token = self.inner.session.access_token()?;

        loop {
            let response = self
                .inner
                .transport
                .send(request.clone().with_bearer(token.clone()))
                .await?;

            if response.is_success() {
                return Ok(response);
            }
            if response.status != StatusCode::UNAUTHORIZED {
                return Err(response.into_error());
            }

            match attempt {
                Attempt::First => {
                    debug!(path, "Access token rejected, renewing");
                    attempt = Attempt::Retry;
                    token = Some(self.renewed_access_token(token.as_deref()).await?);
                }
                Attempt::Retry => {
                    warn!(path, "Request rejected again after token renewal");
                    return Err(ApiError::Unauthorized);
                }
            }
        }
    }

    /// `request` and deserialize the response body.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, ApiError> {
        self.request(method, path, body).await?.json()
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request_json(Method::GET, path, None).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body)?;
        self.request_json(Method::POST, path, Some(body)).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body)?;
        self.request_json(Method::PUT, path, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request_json(Method::DELETE, path, None).await
    }

    /// Find the token to retry with after `rejected` got a 401.
    async fn renewed_access_token(&self, rejected: Option<&str>) -> Result<String, ApiError> {
        // A refresh may have finished while this request was in flight
        if let Some(current) = self.inner.session.access_token()? {
            if rejected != Some(current.as_str()) {
                debug!("Token already renewed, retrying with stored token");
                return Ok(current);
            }
        }

        match self.shared_refresh().await {
            Ok(pair) => Ok(pair.access_token),
            Err(err) => match err.as_ref() {
                ApiError::NoRefreshToken => Err(ApiError::Unauthorized),
                _ => Err(ApiError::SessionExpired),
            },
        }
    }

    /// Join the in-flight refresh, or start one if none is running.
    async fn shared_refresh(&self) -> RefreshOutcome {
        let outcome = {
            let mut slot = self.inner.pending.lock().await;
            match slot.as_ref() {
                Some(pending) => {
                    debug!(refresh_id = pending.id, "Joining in-flight token refresh");
                    pending.outcome.clone()
                }
                None => {
                    let id = self.inner.next_refresh_id.fetch_add(1, Ordering::Relaxed);
                    info!(refresh_id = id, "Starting token refresh");
                    let outcome = run_refresh(
                        Arc::downgrade(&self.inner),
                        self.inner.transport.clone(),
                        self.inner.session.clone(),
                        self.inner.endpoints.refresh.clone(),
                        id,
                    )
                    .boxed()
                    .shared();
                    *slot = Some(PendingRefresh {
                        id,
                        outcome: outcome.clone(),
                    });
                    outcome
                }
            }
        };
        outcome.await
    }

    // ========================================================================
    // Session lifecycle
    // ========================================================================

    /// Mint a new token pair from the stored refresh token and persist it.
    ///
    /// On failure the store is left as it was; clearing credentials after a
    /// failed renewal is up to the caller.
    pub async fn refresh(&self) -> Result<CredentialPair, ApiError> {
        mint_pair(
            self.inner.transport.as_ref(),
            &self.inner.session,
            &self.inner.endpoints.refresh,
        )
        .await
    }

    /// Authenticate and persist the returned token pair.
    ///
    /// Returns `Ok(false)` when the server rejects the credentials; stored
    /// credentials are only touched on success.
    pub async fn login(&self, email: &str, password: &str) -> Result<bool, ApiError> {
        let request = HttpRequest::new(Method::POST, &self.inner.endpoints.login)
            .with_body(json!({ "email": email, "password": password }));
        let response = self.inner.transport.send(request).await?;

        if response.status.is_client_error() {
            info!(status = response.status.as_u16(), "Login rejected");
            return Ok(false);
        }
        if !response.is_success() {
            return Err(response.into_error());
        }

        match response.json::<TokenResponse>()?.into_pair() {
            Ok(pair) => {
                self.inner.session.save(&pair)?;
                info!("Login succeeded");
                Ok(true)
            }
            Err(reason) => {
                info!(reason = %reason, "Login rejected");
                Ok(false)
            }
        }
    }

    /// Create an account. A token pair in the response logs the user in.
    pub async fn register(&self, data: &RegisterData) -> Result<bool, ApiError> {
        let request = HttpRequest::new(Method::POST, &self.inner.endpoints.register)
            .with_body(serde_json::to_value(data)?);
        let response = self.inner.transport.send(request).await?;

        if response.status.is_client_error() {
            info!(status = response.status.as_u16(), "Registration rejected");
            return Ok(false);
        }
        if !response.is_success() {
            return Err(response.into_error());
        }

        // Some deployments answer with a bare status and no JSON body
        let tokens = match response.json::<TokenResponse>() {
            Ok(tokens) => tokens,
            Err(err) => {
                debug!(error = %err, "Registration response carried no token body");
                TokenResponse::default()
            }
        };
        if tokens.success == Some(false) {
            info!("Registration rejected");
            return Ok(false);
        }
        if let Ok(pair) = tokens.into_pair() {
            self.inner.session.save(&pair)?;
            debug!("Registration returned a session");
        }
        Ok(true)
    }

    /// Tell the server the session ended, then drop local credentials.
    ///
    /// The remote call is best effort; local credentials are cleared
    /// whatever it returns.
    pub async fn logout(&self) {
        let token = self.inner.session.access_token().ok().flatten();
        let request =
            HttpRequest::new(Method::POST, &self.inner.endpoints.logout).with_bearer(token);

        match self.inner.transport.send(request).await {
            Ok(response) if response.is_success() => debug!("Remote logout acknowledged"),
            Ok(response) => debug!(status = response.status.as_u16(), "Remote logout rejected"),
            Err(err) => warn!(error = %err, "Remote logout failed"),
        }

        if let Err(err) = self.inner.session.clear() {
            warn!(error = %err, "Failed to clear credentials on logout");
        }
        info!("Logged out");
    }

    pub async fn current_user(&self) -> Result<UserProfile, ApiError> {
        let path = self.inner.endpoints.current_user.clone();
        let envelope: UserEnvelope = self.get(&path).await?;
        Ok(envelope.user)
    }
}

/// Exchange the stored refresh token for a new pair and persist it.
async fn mint_pair(
    transport: &dyn Transport,
    session: &Session,
    path: &str,
) -> Result<CredentialPair, ApiError> {
    let refresh_token = session.refresh_token()?.ok_or(ApiError::NoRefreshToken)?;

    let request =
        HttpRequest::new(Method::POST, path).with_body(json!({ "refreshToken": refresh_token }));
    let response = transport.send(request).await?;
    if !response.is_success() {
        return Err(response.into_error());
    }

    let pair = response
        .json::<TokenResponse>()?
        .into_pair()
        .map_err(ApiError::Rejected)?;
    session.save(&pair)?;
    Ok(pair)
}

/// Body of the shared refresh future.
///
/// The future is stored inside `Inner`, so it only holds a `Weak` back to it.
async fn run_refresh(
    inner: Weak<Inner>,
    transport: Arc<dyn Transport>,
    session: Session,
    path: String,
    id: u64,
) -> RefreshOutcome {
    let result = mint_pair(transport.as_ref(), &session, &path).await;
    match &result {
        Ok(_) => info!(refresh_id = id, "Token refresh succeeded"),
        Err(err) => {
            warn!(refresh_id = id, error = %err, "Token refresh failed, clearing credentials");
            if let Err(clear_err) = session.clear() {
                warn!(error = %clear_err, "Failed to clear credentials");
            }
        }
    }

    // Release the slot unless a newer refresh already replaced it
    if let Some(inner) = inner.upgrade() {
        let mut slot = inner.pending.lock().await;
        if slot.as_ref().map(|pending| pending.id) == Some(id) {
            *slot = None;
        }
    }

    result.map_err(Arc::new)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex as StdMutex;

    use super::*;
    use crate::api::error::TransportError;
    use crate::api::mock::{json_response, unauthorized, MockTransport, REFRESH_PATH};
    use crate::auth::{CredentialStore, FileStore, MemoryStore, StoreError, ACCESS_TOKEN_KEY};
    use chrono::Duration;

    const GOALS_PATH: &str = "/goals/getGoals/7";

    fn client_with(
        transport: MockTransport,
        pair: Option<(&str, &str)>,
    ) -> (SessionClient, Arc<MockTransport>, Session) {
        let store = Arc::new(MemoryStore::new());
        let session = Session::new(store);
        if let Some((access, refresh)) = pair {
            session.save(&CredentialPair::new(access, refresh)).unwrap();
        }
        let transport = Arc::new(transport);
        let client = SessionClient::new(transport.clone(), session.clone(), Endpoints::default());
        (client, transport, session)
    }

    /// Protected endpoint accepts only `valid`; refresh swaps R1 for A2/R2.
    fn expiring_api(valid: &'static str) -> MockTransport {
        MockTransport::new(move |req| match req.path.as_str() {
            REFRESH_PATH => {
                if req.body == Some(json!({"refreshToken": "R1"})) {
                    json_response(
                        StatusCode::OK,
                        json!({"accessToken": "A2", "refreshToken": "R2", "success": true}),
                    )
                } else {
                    json_response(StatusCode::UNAUTHORIZED, json!({"success": false}))
                }
            }
            _ if req.bearer.as_deref() == Some(valid) => {
                json_response(StatusCode::OK, json!({"id": 7}))
            }
            _ => unauthorized(),
        })
    }

    #[tokio::test]
    async fn test_refreshes_and_retries_once_on_401() {
        let (client, transport, session) = client_with(expiring_api("A2"), Some(("A1", "R1")));

        let body: Value = client.get(GOALS_PATH).await.unwrap();
        assert_eq!(body, json!({"id": 7}));

        assert_eq!(
            session.credentials().unwrap(),
            Some(CredentialPair::new("A2", "R2"))
        );
        let tokens: Vec<_> = transport
            .calls_to(GOALS_PATH)
            .into_iter()
            .map(|call| call.bearer)
            .collect();
        assert_eq!(tokens, vec![Some("A1".to_string()), Some("A2".to_string())]);
        assert_eq!(transport.refresh_calls(), 1);
        assert_eq!(transport.calls_to(REFRESH_PATH)[0].bearer, None);
    }

    #[tokio::test]
    async fn test_two_concurrent_401s_share_one_refresh() {
        let (client, transport, session) =
            client_with(expiring_api("A2").hold_refresh_until(2), Some(("A1", "R1")));

        let (first, second) = tokio::join!(
            client.get::<Value>(GOALS_PATH),
            client.get::<Value>("/finance/getFinances/7"),
        );

        assert_eq!(first.unwrap(), json!({"id": 7}));
        assert_eq!(second.unwrap(), json!({"id": 7}));
        assert_eq!(transport.refresh_calls(), 1);
        assert_eq!(session.access_token().unwrap().as_deref(), Some("A2"));

        let retried_with: Vec<_> = transport
            .calls()
            .into_iter()
            .filter(|call| call.path != REFRESH_PATH && call.bearer.as_deref() == Some("A2"))
            .collect();
        assert_eq!(retried_with.len(), 2);
    }

    #[tokio::test]
    async fn test_many_concurrent_401s_share_one_refresh() {
        const REQUESTS: usize = 6;
        let (client, transport, _session) =
            client_with(expiring_api("A2").hold_refresh_until(REQUESTS), Some(("A1", "R1")));

        let results = futures::future::join_all(
            (0..REQUESTS).map(|_| client.get::<Value>(GOALS_PATH)),
        )
        .await;

        assert!(results.iter().all(|r| matches!(r, Ok(v) if v == &json!({"id": 7}))));
        assert_eq!(transport.refresh_calls(), 1);
        assert_eq!(transport.calls_to(GOALS_PATH).len(), REQUESTS * 2);
    }

    #[tokio::test]
    async fn test_second_401_after_refresh_is_final() {
        // Endpoint rejects every token, even fresh ones
        let (client, transport, session) = client_with(expiring_api("never"), Some(("A1", "R1")));

        let err = client.get::<Value>(GOALS_PATH).await.unwrap_err();

        assert!(matches!(err, ApiError::Unauthorized));
        assert_eq!(transport.calls_to(GOALS_PATH).len(), 2);
        assert_eq!(transport.refresh_calls(), 1);
        // The refresh itself worked, so the new pair stays
        assert_eq!(
            session.credentials().unwrap(),
            Some(CredentialPair::new("A2", "R2"))
        );
    }

    #[tokio::test]
    async fn test_failed_refresh_clears_credentials() {
        let (client, transport, session) = client_with(expiring_api("A2"), Some(("A1", "Rbad")));

        let err = client.get::<Value>(GOALS_PATH).await.unwrap_err();

        assert!(matches!(err, ApiError::SessionExpired));
        assert_eq!(transport.refresh_calls(), 1);
        assert_eq!(
            transport.calls_to(REFRESH_PATH)[0].body,
            Some(json!({"refreshToken": "Rbad"}))
        );
        assert_eq!(session.access_token().unwrap(), None);
        assert_eq!(session.refresh_token().unwrap(), None);
        assert!(!client.is_authenticated());
    }

    #[tokio::test]
    async fn test_failed_refresh_fails_every_waiter() {
        let (client, transport, session) =
            client_with(expiring_api("A2").hold_refresh_until(2), Some(("A1", "Rbad")));

        let (first, second) = tokio::join!(
            client.get::<Value>(GOALS_PATH),
            client.get::<Value>(GOALS_PATH),
        );

        assert!(matches!(first, Err(ApiError::SessionExpired)));
        assert!(matches!(second, Err(ApiError::SessionExpired)));
        assert_eq!(transport.refresh_calls(), 1);
        assert!(!session.is_present());
    }

    #[tokio::test]
    async fn test_refresh_without_success_flag_is_fatal() {
        let transport = MockTransport::new(|req| match req.path.as_str() {
            REFRESH_PATH => json_response(
                StatusCode::OK,
                json!({"success": false, "message": "refresh token revoked"}),
            ),
            _ => unauthorized(),
        });
        let (client, _transport, session) = client_with(transport, Some(("A1", "R1")));

        let err = client.get::<Value>(GOALS_PATH).await.unwrap_err();
        assert!(matches!(err, ApiError::SessionExpired));
        assert!(!session.is_present());
    }

    #[tokio::test]
    async fn test_missing_refresh_token_fails_without_calling_refresh() {
        let store = Arc::new(MemoryStore::new());
        store.set(ACCESS_TOKEN_KEY, "A1", Duration::days(1)).unwrap();
        let transport = Arc::new(expiring_api("A2"));
        let client = SessionClient::new(
            transport.clone(),
            Session::new(store.clone()),
            Endpoints::default(),
        );

        let err = client.get::<Value>(GOALS_PATH).await.unwrap_err();

        assert!(matches!(err, ApiError::Unauthorized));
        assert_eq!(transport.refresh_calls(), 0);
        assert_eq!(transport.calls_to(GOALS_PATH).len(), 1);
        assert_eq!(store.get(ACCESS_TOKEN_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_transport_errors_skip_refresh() {
        let transport = MockTransport::new(|req| match req.path.as_str() {
            REFRESH_PATH => json_response(
                StatusCode::OK,
                json!({"accessToken": "A2", "refreshToken": "R2", "success": true}),
            ),
            _ => Err(TransportError::Connection("connection refused".to_string())),
        });
        let (client, transport, session) = client_with(transport, Some(("A1", "R1")));

        let err = client.get::<Value>(GOALS_PATH).await.unwrap_err();

        assert!(matches!(err, ApiError::Transport(TransportError::Connection(_))));
        assert_eq!(transport.refresh_calls(), 0);
        assert_eq!(
            session.credentials().unwrap(),
            Some(CredentialPair::new("A1", "R1"))
        );
    }

    #[tokio::test]
    async fn test_other_error_statuses_pass_through() {
        let transport = MockTransport::new(|_| {
            json_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({"error": "target_amount required"}),
            )
        });
        let (client, transport, _session) = client_with(transport, Some(("A1", "R1")));

        let err = client
            .post::<Value, _>("/goals/creategoal", &json!({"goal_name": "Trip"}))
            .await
            .unwrap_err();

        match err {
            ApiError::Remote { status, body } => {
                assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
                assert!(body.contains("target_amount required"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_request_without_session_sends_no_bearer() {
        let transport = MockTransport::new(|_| json_response(StatusCode::OK, json!({"ok": true})));
        let (client, transport, _session) = client_with(transport, None);

        let body: Value = client.get("/health").await.unwrap();
        assert_eq!(body, json!({"ok": true}));
        assert_eq!(transport.calls()[0].bearer, None);
    }

    #[tokio::test]
    async fn test_retries_with_token_renewed_elsewhere() {
        // While A1 is in flight another request finishes a refresh
        let renewed = Arc::new(StdMutex::new(None::<Session>));
        let renewed_in_handler = renewed.clone();
        let transport = MockTransport::new(move |req| match req.bearer.as_deref() {
            Some("A1") => {
                if let Some(session) = renewed_in_handler.lock().unwrap().as_ref() {
                    session.save(&CredentialPair::new("A2", "R2")).unwrap();
                }
                unauthorized()
            }
            Some("A2") => json_response(StatusCode::OK, json!({"id": 7})),
            _ => unauthorized(),
        });
        let (client, transport, session) = client_with(transport, Some(("A1", "R1")));
        *renewed.lock().unwrap() = Some(session.clone());

        let body: Value = client.get(GOALS_PATH).await.unwrap();

        assert_eq!(body, json!({"id": 7}));
        assert_eq!(transport.refresh_calls(), 0);
    }

    #[tokio::test]
    async fn test_refresh_slot_is_released_after_each_refresh() {
        let valid = Arc::new(StdMutex::new("A1".to_string()));
        let minted = Arc::new(AtomicUsize::new(1));
        let (valid_in_handler, minted_in_handler) = (valid.clone(), minted.clone());
        let transport = MockTransport::new(move |req| {
            if req.path == REFRESH_PATH {
                let n = minted_in_handler.fetch_add(1, Ordering::SeqCst) + 1;
                let access = format!("A{}", n);
                *valid_in_handler.lock().unwrap() = access.clone();
                return json_response(
                    StatusCode::OK,
                    json!({"accessToken": access, "refreshToken": format!("R{}", n), "success": true}),
                );
            }
            if req.bearer.as_deref() == Some(valid_in_handler.lock().unwrap().as_str()) {
                json_response(StatusCode::OK, json!({"id": 7}))
            } else {
                unauthorized()
            }
        });
        let (client, transport, session) = client_with(transport, Some(("A0", "R0")));

        client.get::<Value>(GOALS_PATH).await.unwrap();
        *valid.lock().unwrap() = "revoked".to_string();
        client.get::<Value>(GOALS_PATH).await.unwrap();

        assert_eq!(transport.refresh_calls(), 2);
        assert_eq!(session.access_token().unwrap().as_deref(), Some("A3"));
    }

    #[tokio::test]
    async fn test_abandoned_refresh_does_not_keep_client_alive() {
        let transport = expiring_api("A2").hold_refresh_until(usize::MAX);
        let (client, transport, _session) = client_with(transport, Some(("A1", "R1")));
        let inner = Arc::downgrade(&client.inner);

        // One poll gets the request as far as the parked refresh call
        let pending = client.get::<Value>(GOALS_PATH).now_or_never();
        assert!(pending.is_none());
        assert_eq!(transport.refresh_calls(), 1);
        assert!(client.inner.pending.try_lock().unwrap().is_some());

        drop(client);
        assert!(inner.upgrade().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_store_is_reported_not_treated_as_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "not json").unwrap();
        let transport = Arc::new(expiring_api("A1"));
        let client = SessionClient::new(
            transport.clone(),
            Session::new(Arc::new(FileStore::new(path.clone()))),
            Endpoints::default(),
        );

        assert!(matches!(
            client.identity(),
            Err(IdentityError::Store(StoreError::Corrupt(_)))
        ));
        let err = client.get::<Value>(GOALS_PATH).await.unwrap_err();
        assert!(matches!(err, ApiError::Store(StoreError::Corrupt(_))));
        assert!(!err.requires_login());
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_primitive() {
        let (client, _transport, session) = client_with(expiring_api("A2"), Some(("A1", "R1")));

        let pair = client.refresh().await.unwrap();
        assert_eq!(pair, CredentialPair::new("A2", "R2"));
        assert_eq!(session.credentials().unwrap(), Some(pair));
    }

    #[tokio::test]
    async fn test_refresh_primitive_failure_leaves_store_alone() {
        let (client, _transport, session) = client_with(expiring_api("A2"), Some(("A1", "Rbad")));

        let err = client.refresh().await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::Remote { status, .. } if status == StatusCode::UNAUTHORIZED
        ));
        assert_eq!(
            session.credentials().unwrap(),
            Some(CredentialPair::new("A1", "Rbad"))
        );
    }

    #[tokio::test]
    async fn test_refresh_primitive_needs_refresh_token() {
        let (client, transport, _session) = client_with(expiring_api("A2"), None);

        assert!(matches!(client.refresh().await, Err(ApiError::NoRefreshToken)));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_login_persists_pair() {
        let transport = MockTransport::new(|req| {
            assert_eq!(req.body, Some(json!({"email": "x@x.com", "password": "pw"})));
            json_response(
                StatusCode::OK,
                json!({"success": true, "accessToken": "A", "refreshToken": "R"}),
            )
        });
        let (client, transport, session) = client_with(transport, None);

        assert!(client.login("x@x.com", "pw").await.unwrap());
        assert_eq!(
            session.credentials().unwrap(),
            Some(CredentialPair::new("A", "R"))
        );
        assert_eq!(transport.calls()[0].path, "/login");
    }

    #[tokio::test]
    async fn test_login_rejected_keeps_store() {
        let transport = MockTransport::new(|_| {
            json_response(StatusCode::UNAUTHORIZED, json!({"success": false}))
        });
        let (client, transport, session) = client_with(transport, Some(("A0", "R0")));

        assert!(!client.login("x@x.com", "wrong").await.unwrap());
        assert_eq!(
            session.credentials().unwrap(),
            Some(CredentialPair::new("A0", "R0"))
        );
        // Login failures never trigger a refresh
        assert_eq!(transport.refresh_calls(), 0);
    }

    #[tokio::test]
    async fn test_login_success_false_is_rejection() {
        let transport = MockTransport::new(|_| {
            json_response(StatusCode::OK, json!({"success": false, "message": "bad password"}))
        });
        let (client, _transport, session) = client_with(transport, None);

        assert!(!client.login("x@x.com", "pw").await.unwrap());
        assert!(!session.is_present());
    }

    #[tokio::test]
    async fn test_login_network_error() {
        let transport =
            MockTransport::new(|_| Err(TransportError::Connection("offline".to_string())));
        let (client, _transport, session) = client_with(transport, Some(("A0", "R0")));

        assert!(matches!(
            client.login("x@x.com", "pw").await,
            Err(ApiError::Transport(_))
        ));
        assert!(session.is_present());
    }

    #[tokio::test]
    async fn test_logout_clears_even_when_remote_fails() {
        let transport =
            MockTransport::new(|_| Err(TransportError::Connection("offline".to_string())));
        let (client, transport, session) = client_with(transport, Some(("A1", "R1")));

        client.logout().await;

        assert!(!session.is_present());
        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].path, "/logout");
        assert_eq!(calls[0].bearer.as_deref(), Some("A1"));
    }

    #[tokio::test]
    async fn test_register_with_and_without_session() {
        let data = RegisterData {
            name: "Ana".to_string(),
            lastname: "Ruiz".to_string(),
            email: "ana@example.com".to_string(),
            password: "pw".to_string(),
        };

        let transport = MockTransport::new(|_| {
            json_response(StatusCode::CREATED, json!({"success": true, "message": "created"}))
        });
        let (client, _transport, session) = client_with(transport, None);
        assert!(client.register(&data).await.unwrap());
        assert!(!session.is_present());

        let transport = MockTransport::new(|_| {
            json_response(
                StatusCode::OK,
                json!({"success": true, "accessToken": "A", "refreshToken": "R"}),
            )
        });
        let (client, _transport, session) = client_with(transport, None);
        assert!(client.register(&data).await.unwrap());
        assert!(session.is_present());

        let transport = MockTransport::new(|_| {
            json_response(StatusCode::CONFLICT, json!({"message": "email taken"}))
        });
        let (client, _transport, _session) = client_with(transport, None);
        assert!(!client.register(&data).await.unwrap());
    }

    #[tokio::test]
    async fn test_register_accepts_body_without_tokens() {
        let data = RegisterData {
            name: "Ana".to_string(),
            lastname: "Ruiz".to_string(),
            email: "ana@example.com".to_string(),
            password: "pw".to_string(),
        };
        let transport =
            MockTransport::new(|_| Ok(HttpResponse::new(StatusCode::CREATED, "Created")));
        let (client, _transport, session) = client_with(transport, None);

        assert!(client.register(&data).await.unwrap());
        assert!(!session.is_present());
    }

    #[tokio::test]
    async fn test_current_user() {
        let transport = MockTransport::new(|req| {
            assert_eq!(req.path, "/user/me");
            json_response(
                StatusCode::OK,
                json!({"token": "ignored", "user": {"id": 7, "name": "Ana", "email": "ana@example.com"}}),
            )
        });
        let (client, _transport, _session) = client_with(transport, Some(("A1", "R1")));

        let user = client.current_user().await.unwrap();
        assert_eq!(user.id, 7);
        assert_eq!(user.display_name(), "Ana");
    }

    #[test]
    fn test_token_response_into_pair() {
        let ok: TokenResponse =
            serde_json::from_value(json!({"accessToken": "A", "refreshToken": "R"})).unwrap();
        assert_eq!(ok.into_pair().unwrap(), CredentialPair::new("A", "R"));

        let rejected: TokenResponse =
            serde_json::from_value(json!({"success": false, "accessToken": "A", "refreshToken": "R"}))
                .unwrap();
        assert!(rejected.into_pair().is_err());

        let partial: TokenResponse =
            serde_json::from_value(json!({"success": true, "accessToken": "A"})).unwrap();
        assert!(partial.into_pair().is_err());
    }
}
