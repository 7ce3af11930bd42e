// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The authenticated API client: HTTP verbs plus session management.
//!
//! Resource-specific calls live in [`crate::api`].

use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::endpoint::encode_segment;
use crate::error::ApiError;
use crate::events::SessionEvent;
use crate::gateway::{Payload, RequestGateway, RequestOptions};
use crate::store::{FileTokenStore, TokenStore};
use crate::token::{self, Claims};

/// Body returned by the login, admin-login and register endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub user: Option<Value>,
}

/// Marketplace API client.
#[derive(Clone)]
pub struct ApiClient {
    gateway: Arc<RequestGateway>,
}

impl ApiClient {
    pub fn new(gateway: Arc<RequestGateway>) -> Self {
        Self { gateway }
    }

    /// Build a client whose tokens persist at `config.token_path()`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::open(config.token_path()));
        Ok(Self::new(RequestGateway::new(config.gateway_settings(), store)?))
    }

    pub fn gateway(&self) -> &Arc<RequestGateway> {
        &self.gateway
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.gateway.subscribe()
    }

    fn store(&self) -> &Arc<dyn TokenStore> {
        self.gateway.store()
    }

    // -- Verbs ----------------------------------------------------------------

    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        options: RequestOptions,
        require_auth: bool,
    ) -> Result<Payload, ApiError> {
        self.gateway.send(method, endpoint, options, require_auth).await
    }

    pub async fn get(
        &self,
        endpoint: &str,
        options: RequestOptions,
        require_auth: bool,
    ) -> Result<Payload, ApiError> {
        self.request(Method::GET, endpoint, options, require_auth).await
    }

    pub async fn post(
        &self,
        endpoint: &str,
        options: RequestOptions,
        require_auth: bool,
    ) -> Result<Payload, ApiError> {
        self.request(Method::POST, endpoint, options, require_auth).await
    }

    pub async fn put(
        &self,
        endpoint: &str,
        options: RequestOptions,
        require_auth: bool,
    ) -> Result<Payload, ApiError> {
        self.request(Method::PUT, endpoint, options, require_auth).await
    }

    pub async fn patch(
        &self,
        endpoint: &str,
        options: RequestOptions,
        require_auth: bool,
    ) -> Result<Payload, ApiError> {
        self.request(Method::PATCH, endpoint, options, require_auth).await
    }

    pub async fn delete(
        &self,
        endpoint: &str,
        options: RequestOptions,
        require_auth: bool,
    ) -> Result<Payload, ApiError> {
        self.request(Method::DELETE, endpoint, options, require_auth).await
    }

    /// Send and deserialize the response body.
    pub(crate) async fn fetch<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        options: RequestOptions,
        require_auth: bool,
    ) -> Result<T, ApiError> {
        self.request(method, endpoint, options, require_auth).await?.json()
    }

    // -- Session --------------------------------------------------------------

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let body = json!({ "email": email, "password": password });
        self.authenticate("/auth/login", body).await
    }

    pub async fn admin_login(
        &self,
        email: &str,
        password: &str,
        admin_code: &str,
    ) -> Result<AuthResponse, ApiError> {
        let body = json!({ "email": email, "password": password, "admin_code": admin_code });
        self.authenticate("/auth/admin-login", body).await
    }

    /// Register a new account. Tokens are stored when the backend issues them.
    pub async fn register(&self, user: Value) -> Result<AuthResponse, ApiError> {
        self.authenticate("/auth/register", user).await
    }

    async fn authenticate(&self, endpoint: &str, body: Value) -> Result<AuthResponse, ApiError> {
        let response: AuthResponse =
            self.fetch(Method::POST, endpoint, RequestOptions::new().json(body), false).await?;

        if let Some(access) = response.access_token.as_deref().filter(|t| !t.is_empty()) {
            // A new session never inherits the previous refresh token.
            self.store().clear_tokens();
            self.store().set_tokens(access, response.refresh_token.as_deref());
            info!(endpoint, "session established");
        }
        Ok(response)
    }

    /// End the session.
    ///
    /// The backend is told on a best-effort basis; tokens are cleared and
    /// [`SessionEvent::LoggedOut`] is broadcast whatever it answers.
    pub async fn logout(&self) {
        if let Some(refresh) = self.store().refresh_token() {
            let mut options = RequestOptions::new().json(json!({ "refresh_token": refresh }));
            if let Some(access) = self.store().access_token() {
                options = options.header("Authorization", &format!("Bearer {access}"));
            }
            // Sent without the refresh machinery: an expired session must not
            // be renewed just to be closed.
            if let Err(e) = self.post("/auth/logout", options, false).await {
                debug!(error = %e, "logout call failed, clearing tokens anyway");
            }
        }
        self.store().clear_tokens();
        self.gateway.emit(SessionEvent::LoggedOut);
        info!("logged out");
    }

    pub async fn current_user(&self) -> Result<Value, ApiError> {
        self.fetch(Method::GET, "/auth/me", RequestOptions::new(), true).await
    }

    pub async fn check_email_exists(&self, email: &str) -> Result<bool, ApiError> {
        let endpoint = format!("/auth/check-email/{}", encode_segment(email));
        let value: Value = self.fetch(Method::GET, &endpoint, RequestOptions::new(), false).await?;
        Ok(exists(&value))
    }

    pub async fn check_phone_exists(&self, phone: &str) -> Result<bool, ApiError> {
        let options = RequestOptions::new().json(json!({ "phone": phone }));
        let value: Value = self.fetch(Method::POST, "/auth/check-phone", options, false).await?;
        Ok(exists(&value))
    }

    pub async fn check_shop_name_exists(&self, name: &str) -> Result<bool, ApiError> {
        let options = RequestOptions::new().json(json!({ "name": name }));
        let value: Value = self.fetch(Method::POST, "/shops/check-name", options, false).await?;
        Ok(exists(&value))
    }

    /// Whether the backend answers `GET /health` with a 2xx.
    pub async fn health(&self) -> bool {
        match self.get("/health", RequestOptions::new(), false).await {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "health check failed");
                false
            }
        }
    }

    /// Whether a usable session exists: an unexpired access token, or a
    /// refresh token that can still renew one.
    pub fn is_authenticated(&self) -> bool {
        let Some(access) = self.store().access_token() else {
            return false;
        };
        let buffer = self.gateway.settings().expiry_buffer_secs;
        if !self.store().is_expired(&access, buffer) {
            return true;
        }
        match self.store().refresh_token() {
            // Opaque refresh tokens carry no expiry; only a decodable one can be judged.
            Some(refresh) => match token::decode_claims(&refresh).and_then(|c| c.exp) {
                Some(_) => !token::is_expired(&refresh, 0),
                None => true,
            },
            None => false,
        }
    }

    /// Identity claims from the current access token.
    pub fn user_info(&self) -> Option<Claims> {
        self.store().access_token().as_deref().and_then(token::decode_claims)
    }
}

/// Read the availability flag the check endpoints return.
fn exists(value: &Value) -> bool {
    value.get("exists").and_then(Value::as_bool).unwrap_or(false)
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
