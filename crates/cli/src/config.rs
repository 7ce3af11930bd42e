// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::{Parser, Subcommand};
use izishop_client::ClientConfig;
use reqwest::Method;

/// Command-line client for the IziShop marketplace API.
#[derive(Debug, Parser)]
#[command(name = "izishop", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub client: ClientConfig,

    /// Log format (json or text).
    #[arg(long, env = "IZISHOP_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "IZISHOP_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and store the issued tokens
    Login {
        #[arg(long, env = "IZISHOP_EMAIL")]
        email: String,
        #[arg(long, env = "IZISHOP_PASSWORD")]
        password: String,
    },
    /// Log in to the admin console
    AdminLogin {
        #[arg(long, env = "IZISHOP_EMAIL")]
        email: String,
        #[arg(long, env = "IZISHOP_PASSWORD")]
        password: String,
        #[arg(long, env = "IZISHOP_ADMIN_CODE")]
        admin_code: String,
    },
    /// End the session and forget stored tokens
    Logout,
    /// Show the identity in the stored access token
    Whoami,
    /// Show session state
    Status,
    /// Check backend reachability
    Health,
    /// Send a request through the authenticated gateway
    Request {
        /// HTTP method (GET, POST, PUT, PATCH, DELETE)
        method: String,
        /// Endpoint relative to the API base, e.g. /products
        endpoint: String,
        /// JSON request body
        #[arg(long)]
        data: Option<String>,
        /// Query pair as key=value (repeatable)
        #[arg(long = "query", short = 'q')]
        query: Vec<String>,
        /// Send without a bearer token and skip refresh
        #[arg(long)]
        public: bool,
    },
    /// Show the caller's shop
    Shop,
    /// Show shop owner dashboard figures
    Analytics {
        /// Reporting period, e.g. 7d, 30d, 90d
        #[arg(long, default_value = "30d")]
        period: String,
    },
    /// Keep the session fresh in the background until interrupted
    Watch,
}

impl Cli {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !matches!(self.log_format.as_str(), "json" | "text") {
            anyhow::bail!("--log-format must be json or text, got {}", self.log_format);
        }
        if self.client.monitor_interval_secs == 0 {
            anyhow::bail!("--monitor-interval-secs must be greater than zero");
        }
        if self.client.refresh_timeout_ms == 0 {
            anyhow::bail!("--refresh-timeout-ms must be greater than zero");
        }
        if let Command::Request { ref method, ref data, ref query, .. } = self.command {
            parse_method(method)?;
            if let Some(data) = data {
                serde_json::from_str::<serde_json::Value>(data)
                    .map_err(|e| anyhow::anyhow!("--data is not valid JSON: {e}"))?;
            }
            for pair in query {
                parse_query_pair(pair)?;
            }
        }
        Ok(())
    }
}

pub fn parse_method(raw: &str) -> anyhow::Result<Method> {
    match raw.to_ascii_uppercase().as_str() {
        "GET" => Ok(Method::GET),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "PATCH" => Ok(Method::PATCH),
        "DELETE" => Ok(Method::DELETE),
        other => anyhow::bail!("unsupported method: {other}"),
    }
}

pub fn parse_query_pair(raw: &str) -> anyhow::Result<(&str, &str)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key, value)),
        _ => anyhow::bail!("query must be key=value, got {raw}"),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
