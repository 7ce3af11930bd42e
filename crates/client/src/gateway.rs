// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request gateway: bearer injection, single-flight token refresh, and
//! error classification for every outgoing call.
//!
//! At most one refresh runs per gateway. Requests that need a fresh token
//! while it is in flight queue behind it and are settled in FIFO order when
//! it finishes. The refresh itself runs on a spawned task so that dropping
//! or cancelling any caller, including the one that started it, never
//! abandons the queue.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{broadcast, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::endpoint::{self, REFRESH_PATH};
use crate::error::{classify, ApiError, RefreshError};
use crate::events::SessionEvent;
use crate::store::TokenStore;
use crate::token::DEFAULT_EXPIRY_BUFFER_SECS;

/// Initial backoff between transient refresh failures.
const INITIAL_RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Maximum backoff between transient refresh failures.
const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(8);

/// Gateway tuning, usually built from [`crate::ClientConfig`].
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub base_url: String,
    pub expiry_buffer_secs: u64,
    /// Bound on a whole refresh cycle, retries included.
    pub refresh_timeout: Duration,
    pub refresh_retries: u32,
    pub request_timeout: Option<Duration>,
    /// Announced in [`SessionEvent::SessionExpired`].
    pub login_path: String,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            base_url: crate::config::DEFAULT_BASE_URL.to_owned(),
            expiry_buffer_secs: DEFAULT_EXPIRY_BUFFER_SECS,
            refresh_timeout: Duration::from_secs(10),
            refresh_retries: 0,
            request_timeout: None,
            login_path: "/login".to_owned(),
        }
    }
}

/// Per-request options.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    body: Option<Value>,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    cancel: Option<CancellationToken>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// JSON request body.
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_owned(), value.to_string()));
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Abort the request (including any wait on a refresh) when `token` fires.
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Decoded body of a successful response.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
    Empty,
}

impl Payload {
    fn decode(status: StatusCode, content_type: Option<&str>, body: &[u8]) -> Result<Self, ApiError> {
        if status == StatusCode::NO_CONTENT || body.is_empty() {
            return Ok(Self::Empty);
        }
        if content_type.is_some_and(|ct| ct.contains("json")) {
            return Ok(Self::Json(serde_json::from_slice(body)?));
        }
        Ok(Self::Text(String::from_utf8_lossy(body).into_owned()))
    }

    /// Deserialize the payload. Text bodies are parsed as JSON; an empty
    /// body deserializes from `null`.
    pub fn json<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        let value = match self {
            Self::Json(v) => v,
            Self::Text(t) => serde_json::from_str(&t)?,
            Self::Empty => Value::Null,
        };
        Ok(serde_json::from_value(value)?)
    }

    pub fn into_value(self) -> Value {
        match self {
            Self::Json(v) => v,
            Self::Text(t) => Value::String(t),
            Self::Empty => Value::Null,
        }
    }
}

/// Snapshot of gateway counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GatewayStats {
    pub requests: u64,
    pub failed_requests: u64,
    pub refresh_cycles: u64,
}

#[derive(Debug, Default)]
struct Counters {
    requests: AtomicU64,
    failed_requests: AtomicU64,
    refresh_cycles: AtomicU64,
}

type RefreshOutcome = Result<String, RefreshError>;

enum RefreshState {
    Idle,
    Refreshing { waiters: Vec<oneshot::Sender<RefreshOutcome>> },
}

/// How a caller obtains a fresh token.
enum Ticket {
    /// Someone else already refreshed; use this token.
    Ready(String),
    /// This caller started the refresh.
    Leader(oneshot::Receiver<RefreshOutcome>),
    /// A refresh was already running; this caller queued behind it.
    Follower(oneshot::Receiver<RefreshOutcome>),
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
}

struct RefreshedTokens {
    access_token: String,
    /// Present only when the server rotated the refresh token.
    refresh_token: Option<String>,
}

/// Sends every API request and owns the refresh protocol.
pub struct RequestGateway {
    http: reqwest::Client,
    settings: GatewaySettings,
    store: Arc<dyn TokenStore>,
    state: Mutex<RefreshState>,
    event_tx: broadcast::Sender<SessionEvent>,
    counters: Counters,
}

impl RequestGateway {
    pub fn new(settings: GatewaySettings, store: Arc<dyn TokenStore>) -> Result<Arc<Self>, ApiError> {
        crate::ensure_crypto();
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = settings.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        let (event_tx, _) = broadcast::channel(64);

        Ok(Arc::new(Self {
            http,
            settings,
            store,
            state: Mutex::new(RefreshState::Idle),
            event_tx,
            counters: Counters::default(),
        }))
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    pub fn stats(&self) -> GatewayStats {
        GatewayStats {
            requests: self.counters.requests.load(Ordering::Relaxed),
            failed_requests: self.counters.failed_requests.load(Ordering::Relaxed),
            refresh_cycles: self.counters.refresh_cycles.load(Ordering::Relaxed),
        }
    }

    /// Whether a refresh is currently in flight.
    pub fn is_refreshing(&self) -> bool {
        matches!(*self.state.lock(), RefreshState::Refreshing { .. })
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }

    /// Send a request.
    ///
    /// With `require_auth` set and a non-public endpoint, the bearer token is
    /// refreshed before sending when missing or close to expiry, and a 401
    /// triggers one refresh and one replay.
    pub async fn send(
        self: &Arc<Self>,
        method: Method,
        endpoint: &str,
        options: RequestOptions,
        require_auth: bool,
    ) -> Result<Payload, ApiError> {
        self.counters.requests.fetch_add(1, Ordering::Relaxed);

        let result = match options.cancel.clone() {
            Some(cancel) => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        debug!(endpoint, "request cancelled");
                        Err(ApiError::Cancelled)
                    }
                    result = self.dispatch(&method, endpoint, &options, require_auth) => result,
                }
            }
            None => self.dispatch(&method, endpoint, &options, require_auth).await,
        };

        if result.is_err() {
            self.counters.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    /// Refresh proactively when the access token expires within `margin_secs`.
    ///
    /// Joins any refresh already in flight. Returns whether a fresh token had
    /// to be obtained. Without a refresh token there is nothing to do.
    pub async fn ensure_fresh(self: &Arc<Self>, margin_secs: u64) -> Result<bool, ApiError> {
        if self.store.refresh_token().is_none() {
            return Ok(false);
        }
        match self.store.access_token() {
            Some(token) if !self.store.is_expired(&token, margin_secs) => Ok(false),
            stale => {
                self.fresh_token(stale.as_deref()).await?;
                Ok(true)
            }
        }
    }

    async fn dispatch(
        self: &Arc<Self>,
        method: &Method,
        endpoint: &str,
        options: &RequestOptions,
        require_auth: bool,
    ) -> Result<Payload, ApiError> {
        let url = endpoint::resolve(&self.settings.base_url, endpoint, &options.query)?;

        if !require_auth || endpoint::is_public(endpoint) {
            let response = self.execute(method, url, options, None).await?;
            return self.finish(endpoint, response).await;
        }

        let token = self.preflight().await?;
        let response = self.execute(method, url.clone(), options, Some(&token)).await?;
        if response.status() != StatusCode::UNAUTHORIZED || endpoint::is_auth_endpoint(endpoint) {
            return self.finish(endpoint, response).await;
        }

        debug!(endpoint, "401 from backend, refreshing and replaying once");
        let fresh = self.fresh_token(Some(&token)).await?;
        let response = self.execute(method, url, options, Some(&fresh)).await?;
        self.finish(endpoint, response).await
    }

    /// The current access token, refreshed first if missing or expiring.
    async fn preflight(self: &Arc<Self>) -> Result<String, ApiError> {
        match self.store.access_token() {
            Some(token) if !self.store.is_expired(&token, self.settings.expiry_buffer_secs) => {
                Ok(token)
            }
            stale => {
                debug!(missing = stale.is_none(), "access token needs refresh before request");
                self.fresh_token(stale.as_deref()).await
            }
        }
    }

    /// Obtain a token newer than `stale`, refreshing or queueing as needed.
    async fn fresh_token(self: &Arc<Self>, stale: Option<&str>) -> Result<String, ApiError> {
        let (rx, leader) = match self.join(stale) {
            Ticket::Ready(token) => return Ok(token),
            Ticket::Leader(rx) => (rx, true),
            Ticket::Follower(rx) => (rx, false),
        };

        match rx.await {
            Ok(Ok(token)) => Ok(token),
            Ok(Err(e)) if leader || e == RefreshError::StillExpired => {
                Err(ApiError::SessionExpired { reason: e.to_string() })
            }
            Ok(Err(e)) => Err(ApiError::RefreshFailed(e)),
            Err(_) => Err(ApiError::SessionExpired {
                reason: "refresh task ended without a result".to_owned(),
            }),
        }
    }

    fn join(self: &Arc<Self>, stale: Option<&str>) -> Ticket {
        let (tx, rx) = oneshot::channel();
        {
            let mut state = self.state.lock();
            if let RefreshState::Refreshing { waiters } = &mut *state {
                waiters.push(tx);
                return Ticket::Follower(rx);
            }

            if let Some(current) = self.store.access_token() {
                if stale != Some(current.as_str())
                    && !self.store.is_expired(&current, self.settings.expiry_buffer_secs)
                {
                    return Ticket::Ready(current);
                }
            }

            *state = RefreshState::Refreshing { waiters: vec![tx] };
        }

        let gateway = Arc::clone(self);
        tokio::spawn(async move { gateway.run_refresh().await });
        Ticket::Leader(rx)
    }

    /// One refresh cycle: call the backend, update the store, drain the queue.
    async fn run_refresh(self: Arc<Self>) {
        self.counters.refresh_cycles.fetch_add(1, Ordering::Relaxed);
        let limit = self.settings.refresh_timeout;

        let outcome = match tokio::time::timeout(limit, self.refresh_with_retries()).await {
            Ok(result) => result,
            Err(_) => Err(RefreshError::Timeout(u64::try_from(limit.as_millis()).unwrap_or(u64::MAX))),
        };
        let outcome = outcome.and_then(|tokens| {
            if self.store.is_expired(&tokens.access_token, 0) {
                Err(RefreshError::StillExpired)
            } else {
                Ok(tokens)
            }
        });

        // The store must be settled before the state goes idle so that a
        // joiner seeing `Idle` reads the outcome.
        let result = match outcome {
            Ok(tokens) => {
                self.store.set_tokens(&tokens.access_token, tokens.refresh_token.as_deref());
                info!(rotated = tokens.refresh_token.is_some(), "access token refreshed");
                Ok(tokens.access_token)
            }
            Err(e) => {
                self.store.clear_tokens();
                warn!(error = %e, "token refresh failed, session cleared");
                Err(e)
            }
        };

        let waiters = match std::mem::replace(&mut *self.state.lock(), RefreshState::Idle) {
            RefreshState::Refreshing { waiters } => waiters,
            RefreshState::Idle => Vec::new(),
        };
        debug!(waiters = waiters.len(), "settling refresh queue");
        for waiter in waiters {
            // Cancelled callers have dropped their receiver.
            let _ = waiter.send(result.clone());
        }

        match result {
            Ok(_) => self.emit(SessionEvent::TokenRefreshed),
            Err(e) => self.emit(SessionEvent::SessionExpired {
                login_path: self.settings.login_path.clone(),
                reason: e.to_string(),
            }),
        }
    }

    async fn refresh_with_retries(&self) -> Result<RefreshedTokens, RefreshError> {
        let mut backoff = INITIAL_RETRY_BACKOFF;
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.do_refresh().await {
                Ok(tokens) => return Ok(tokens),
                Err(e) if e.is_transient() && attempt <= self.settings.refresh_retries => {
                    warn!(
                        attempt,
                        max = self.settings.refresh_retries + 1,
                        error = %e,
                        "refresh failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_RETRY_BACKOFF);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// A single `POST /auth/refresh`. No bearer header is attached.
    async fn do_refresh(&self) -> Result<RefreshedTokens, RefreshError> {
        let refresh_token = self.store.refresh_token().ok_or(RefreshError::MissingRefreshToken)?;
        let url = endpoint::resolve(&self.settings.base_url, REFRESH_PATH, &[])
            .map_err(|e| RefreshError::Transport(e.to_string()))?;

        let response = self
            .http
            .post(url)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(|e| RefreshError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RefreshError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| RefreshError::Transport(e.to_string()))?;
        let parsed: RefreshResponse =
            serde_json::from_slice(&body).map_err(|e| RefreshError::Malformed(e.to_string()))?;

        let access_token = parsed
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(RefreshError::MissingAccessToken)?;
        let refresh_token = parsed.refresh_token.filter(|t| !t.is_empty());
        Ok(RefreshedTokens { access_token, refresh_token })
    }

    async fn execute(
        &self,
        method: &Method,
        url: Url,
        options: &RequestOptions,
        bearer: Option<&str>,
    ) -> Result<reqwest::Response, ApiError> {
        let mut request = self.http.request(method.clone(), url);
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        if let Some(ref body) = options.body {
            request = request.json(body);
        }

        request.send().await.map_err(|e| {
            warn!(%method, error = %e, "request failed to reach the backend");
            ApiError::Network(e)
        })
    }

    async fn finish(&self, endpoint: &str, response: reqwest::Response) -> Result<Payload, ApiError> {
        let status = response.status();
        let content_type =
            response.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()).map(str::to_owned);
        let body = response.bytes().await?;

        if status.is_success() {
            return Payload::decode(status, content_type.as_deref(), &body);
        }

        let err = classify(status.as_u16(), &body);
        if err.is_not_found() {
            debug!(endpoint, "not found");
        } else {
            warn!(endpoint, status = status.as_u16(), error = %err, "request failed");
        }
        Err(err)
    }
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod tests;
