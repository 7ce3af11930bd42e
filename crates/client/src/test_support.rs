// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: token minting and a mock marketplace backend.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crate::gateway::{GatewaySettings, RequestGateway};
use crate::store::{MemoryTokenStore, TokenStore};
use crate::token::epoch_secs;

/// Unsigned JWT-shaped token expiring `exp_offset_secs` from now.
pub fn mint_token(exp_offset_secs: i64) -> String {
    mint_token_with(exp_offset_secs, json!({}))
}

/// Like [`mint_token`], merging `extra` into the payload claims.
pub fn mint_token_with(exp_offset_secs: i64, extra: Value) -> String {
    let exp = epoch_secs().saturating_add_signed(exp_offset_secs);
    let mut claims = json!({ "exp": exp });
    if let (Some(map), Value::Object(extra)) = (claims.as_object_mut(), extra) {
        map.extend(extra);
    }
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.c2lnbmF0dXJl")
}

/// Canned response: status and JSON body.
pub type Canned = (u16, Value);

/// Mock backend behaviour.
#[derive(Default)]
pub struct MockConfig {
    /// Responses for successive `POST /api/auth/refresh` calls; the last one repeats.
    pub refresh: Vec<Canned>,
    /// Delay before answering each refresh call.
    pub refresh_delay: Duration,
    /// When set, other routes answer 401 unless `Authorization: Bearer <token>`
    /// carries one of these.
    pub accept: Option<Vec<String>>,
    /// Fixed answers keyed by `"METHOD /path"`, checked before auth.
    pub routes: HashMap<String, Canned>,
}

impl MockConfig {
    pub fn refresh_ok(access: &str, refresh: Option<&str>) -> Canned {
        let mut body = json!({ "access_token": access, "token_type": "bearer" });
        if let Some(rt) = refresh {
            body["refresh_token"] = json!(rt);
        }
        (200, body)
    }

    pub fn route(mut self, key: &str, status: u16, body: Value) -> Self {
        self.routes.insert(key.to_owned(), (status, body));
        self
    }
}

/// A request seen by the mock backend.
#[derive(Debug, Clone)]
pub struct Seen {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

struct MockState {
    config: MockConfig,
    refresh_calls: AtomicU32,
    seen: Mutex<Vec<Seen>>,
}

/// Handle to a running mock backend.
#[derive(Clone)]
pub struct MockBackend {
    pub addr: SocketAddr,
    state: Arc<MockState>,
}

impl MockBackend {
    pub async fn start(config: MockConfig) -> anyhow::Result<Self> {
        let state = Arc::new(MockState {
            config,
            refresh_calls: AtomicU32::new(0),
            seen: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/api/auth/refresh", post(refresh_handler))
            .fallback(any_handler)
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Ok(Self { addr, state })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub fn refresh_calls(&self) -> u32 {
        self.state.refresh_calls.load(Ordering::SeqCst)
    }

    /// All requests seen so far, refresh calls included.
    pub fn seen(&self) -> Vec<Seen> {
        self.state.seen.lock().clone()
    }

    /// Requests seen for `path`, e.g. `/api/products`.
    pub fn seen_at(&self, path: &str) -> Vec<Seen> {
        self.seen().into_iter().filter(|s| s.path == path).collect()
    }

    /// Settings pointed at this backend, with short timeouts for tests.
    pub fn settings(&self) -> GatewaySettings {
        GatewaySettings {
            base_url: self.base_url(),
            refresh_timeout: Duration::from_secs(5),
            ..GatewaySettings::default()
        }
    }

    /// A gateway over an in-memory store seeded with `access`/`refresh`.
    pub fn gateway(
        &self,
        access: Option<&str>,
        refresh: Option<&str>,
    ) -> anyhow::Result<(Arc<RequestGateway>, Arc<MemoryTokenStore>)> {
        self.gateway_with(self.settings(), access, refresh)
    }

    pub fn gateway_with(
        &self,
        settings: GatewaySettings,
        access: Option<&str>,
        refresh: Option<&str>,
    ) -> anyhow::Result<(Arc<RequestGateway>, Arc<MemoryTokenStore>)> {
        let store = Arc::new(MemoryTokenStore::with_tokens(access, refresh));
        let gateway = RequestGateway::new(settings, Arc::clone(&store) as Arc<dyn TokenStore>)?;
        Ok((gateway, store))
    }
}

fn record(state: &MockState, method: &Method, uri: &Uri, headers: &HeaderMap, body: &[u8]) {
    let authorization =
        headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()).map(str::to_owned);
    state.seen.lock().push(Seen {
        method: method.to_string(),
        path: uri.path().to_owned(),
        query: uri.query().map(str::to_owned),
        authorization,
        body: serde_json::from_slice(body).ok(),
    });
}

fn canned(status: u16, body: &Value) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, "application/json")], body.to_string()).into_response()
}

async fn refresh_handler(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    record(&state, &method, &uri, &headers, &body);
    let idx = state.refresh_calls.fetch_add(1, Ordering::SeqCst) as usize;
    if !state.config.refresh_delay.is_zero() {
        tokio::time::sleep(state.config.refresh_delay).await;
    }
    let refresh = &state.config.refresh;
    match refresh.get(idx).or_else(|| refresh.last()) {
        Some((status, body)) => canned(*status, body),
        None => canned(500, &json!({ "detail": "no refresh response configured" })),
    }
}

async fn any_handler(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    record(&state, &method, &uri, &headers, &body);

    let key = format!("{method} {}", uri.path());
    if let Some((status, body)) = state.config.routes.get(&key) {
        return canned(*status, body);
    }

    if let Some(ref accepted) = state.config.accept {
        let bearer = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        if !bearer.is_some_and(|b| accepted.iter().any(|a| a == b)) {
            return canned(401, &json!({ "detail": "Could not validate credentials" }));
        }
    }

    canned(200, &json!({ "path": uri.path(), "ok": true }))
}
