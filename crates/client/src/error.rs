// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy and classification of non-2xx responses.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors returned by the API client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// 401 from the backend.
    #[error("{message}")]
    Unauthorized { message: String },

    /// 403 from the backend.
    #[error("{message}")]
    Forbidden { message: String },

    /// 422 with per-field messages.
    #[error("{message}")]
    Validation { message: String, fields: Vec<FieldError> },

    /// 429 from the backend.
    #[error("{message}")]
    RateLimited { message: String },

    /// 5xx from the backend.
    #[error("{message}")]
    Server { status: u16, message: String },

    /// Any other non-2xx status.
    #[error("{message}")]
    Http { status: u16, message: String },

    /// Transport failure (DNS, connection refused, TLS, ...).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The token refresh this request was waiting on failed.
    #[error("token refresh failed: {0}")]
    RefreshFailed(RefreshError),

    /// The session can no longer be renewed; the user must log in again.
    #[error("authentication expired: {reason}")]
    SessionExpired { reason: String },

    /// The caller cancelled the request.
    #[error("request cancelled")]
    Cancelled,

    /// The response body could not be decoded.
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// HTTP status of the response this error was classified from.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(401),
            Self::Forbidden { .. } => Some(403),
            Self::Validation { .. } => Some(422),
            Self::RateLimited { .. } => Some(429),
            Self::Server { status, .. } | Self::Http { status, .. } => Some(*status),
            Self::RefreshFailed(RefreshError::Status(status)) => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// A 404: the benign "nothing here yet" outcome.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Whether this error ends the session (tokens are gone).
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired { .. } | Self::RefreshFailed(_))
    }
}

/// Why a refresh cycle failed.
///
/// `Clone` because one failure rejects every queued request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    #[error("no refresh token available")]
    MissingRefreshToken,

    #[error("refresh endpoint returned {0}")]
    Status(u16),

    #[error("refresh transport error: {0}")]
    Transport(String),

    #[error("no access token in refresh response")]
    MissingAccessToken,

    #[error("refresh response was not valid JSON: {0}")]
    Malformed(String),

    #[error("refresh timed out after {0} ms")]
    Timeout(u64),

    /// The refreshed access token was already past `exp`.
    #[error("access token still expired after refresh")]
    StillExpired,
}

impl RefreshError {
    /// Transport failures and 5xx are worth another attempt; anything the
    /// server rejected outright is not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status(status) => *status >= 500,
            _ => false,
        }
    }
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Map a non-2xx response to an [`ApiError`]. Pure: no I/O, no logging.
pub fn classify(status: u16, body: &[u8]) -> ApiError {
    let json: Option<Value> = serde_json::from_slice(body).ok();
    let json = json.as_ref();

    if status == 422 {
        if let Some(fields) = json.and_then(validation_fields) {
            let joined = fields
                .iter()
                .map(|f| format!("{}: {}", f.field, f.message))
                .collect::<Vec<_>>()
                .join(", ");
            return ApiError::Validation { message: format!("Validation error: {joined}"), fields };
        }
    }

    let message = error_message(status, json, body);
    match status {
        401 => ApiError::Unauthorized { message },
        403 => ApiError::Forbidden { message },
        422 => ApiError::Validation { message, fields: Vec::new() },
        429 => ApiError::RateLimited { message },
        s if s >= 500 => ApiError::Server { status, message },
        _ => ApiError::Http { status, message },
    }
}

/// Field errors from either `{"errors":[{field,message}]}` or FastAPI's
/// `{"detail":[{loc,msg}]}`.
fn validation_fields(json: &Value) -> Option<Vec<FieldError>> {
    if let Some(errors) = json.get("errors").and_then(Value::as_array) {
        let fields = errors
            .iter()
            .map(|e| FieldError {
                field: text(e.get("field")),
                message: text(e.get("message")),
            })
            .collect();
        return Some(fields);
    }

    let detail = json.get("detail")?.as_array()?;
    let fields = detail
        .iter()
        .map(|e| {
            let field = e
                .get("loc")
                .and_then(Value::as_array)
                .map(|loc| loc.iter().map(|p| text(Some(p))).collect::<Vec<_>>().join("."))
                .unwrap_or_default();
            FieldError { field, message: text(e.get("msg")) }
        })
        .collect();
    Some(fields)
}

fn error_message(status: u16, json: Option<&Value>, body: &[u8]) -> String {
    if let Some(json) = json {
        for key in ["detail", "message"] {
            if let Some(msg) = json.get(key).and_then(Value::as_str) {
                if !msg.is_empty() {
                    return msg.to_owned();
                }
            }
        }
    } else {
        let text = String::from_utf8_lossy(body);
        let text = text.trim();
        if !text.is_empty() {
            return text.to_owned();
        }
    }
    format!("HTTP error! status: {status}")
}

/// Render a JSON scalar without quotes.
fn text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
