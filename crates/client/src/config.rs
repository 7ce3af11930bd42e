// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;
use std::time::Duration;

use crate::gateway::GatewaySettings;

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Name of the persisted token file inside the state directory.
pub const TOKEN_FILE_NAME: &str = "tokens.json";

/// Configuration for the API client.
#[derive(Debug, Clone, clap::Args)]
pub struct ClientConfig {
    /// Base URL of the marketplace API.
    #[arg(long, default_value = DEFAULT_BASE_URL, env = "IZISHOP_API_URL")]
    pub api_url: String,

    /// Token file path. Defaults to `tokens.json` in the state directory.
    #[arg(long, env = "IZISHOP_TOKEN_FILE")]
    pub token_file: Option<PathBuf>,

    /// Seconds before `exp` at which the access token is refreshed ahead of a request.
    #[arg(long, default_value_t = 30, env = "IZISHOP_EXPIRY_BUFFER_SECS")]
    pub expiry_buffer_secs: u64,

    /// Upper bound on one refresh cycle, retries included, in milliseconds.
    #[arg(long, default_value_t = 10_000, env = "IZISHOP_REFRESH_TIMEOUT_MS")]
    pub refresh_timeout_ms: u64,

    /// Extra refresh attempts after a transport error or 5xx.
    #[arg(long, default_value_t = 0, env = "IZISHOP_REFRESH_RETRIES")]
    pub refresh_retries: u32,

    /// Per-request timeout in milliseconds. Unset means no timeout.
    #[arg(long, env = "IZISHOP_REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: Option<u64>,

    /// Login entry point announced when the session expires.
    #[arg(long, default_value = "/login", env = "IZISHOP_LOGIN_PATH")]
    pub login_path: String,

    /// Token monitor check interval in seconds.
    #[arg(long, default_value_t = 30, env = "IZISHOP_MONITOR_INTERVAL_SECS")]
    pub monitor_interval_secs: u64,

    /// Token monitor refreshes tokens expiring within this many seconds.
    #[arg(long, default_value_t = 300, env = "IZISHOP_MONITOR_MARGIN_SECS")]
    pub monitor_margin_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_BASE_URL.to_owned(),
            token_file: None,
            expiry_buffer_secs: crate::token::DEFAULT_EXPIRY_BUFFER_SECS,
            refresh_timeout_ms: 10_000,
            refresh_retries: 0,
            request_timeout_ms: None,
            login_path: "/login".to_owned(),
            monitor_interval_secs: 30,
            monitor_margin_secs: 300,
        }
    }
}

impl ClientConfig {
    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_millis(self.refresh_timeout_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_secs)
    }

    /// Resolved token file: `--token-file`, else `tokens.json` under [`state_dir`].
    pub fn token_path(&self) -> PathBuf {
        self.token_file.clone().unwrap_or_else(|| state_dir().join(TOKEN_FILE_NAME))
    }

    pub fn gateway_settings(&self) -> GatewaySettings {
        GatewaySettings {
            base_url: self.api_url.clone(),
            expiry_buffer_secs: self.expiry_buffer_secs,
            refresh_timeout: self.refresh_timeout(),
            refresh_retries: self.refresh_retries,
            request_timeout: self.request_timeout(),
            login_path: self.login_path.clone(),
        }
    }
}

/// Directory for persisted client state.
///
/// `$IZISHOP_STATE_DIR`, else `$XDG_STATE_HOME/izishop`, else
/// `$HOME/.local/state/izishop`.
pub fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("IZISHOP_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("izishop");
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_owned());
    PathBuf::from(home).join(".local").join("state").join("izishop")
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
