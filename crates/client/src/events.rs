// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::Serialize;

/// Session lifecycle events broadcast by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A refresh cycle stored a new access token.
    TokenRefreshed,
    /// The user logged out explicitly.
    LoggedOut,
    /// Tokens were cleared because the session could not be renewed.
    /// The front end should send the user to `login_path`.
    SessionExpired { login_path: String, reason: String },
}
