// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authenticated client for the IziShop marketplace API.
//!
//! [`ApiClient`] wraps a [`RequestGateway`] that attaches bearer tokens,
//! refreshes them (one refresh at a time, with concurrent callers queued
//! behind it), and classifies error responses into [`ApiError`].

pub mod api;
pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod events;
pub mod fallback;
pub mod gateway;
pub mod monitor;
pub mod store;
pub mod token;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Once;

pub use client::{ApiClient, AuthResponse};
pub use config::ClientConfig;
pub use error::{ApiError, FieldError, RefreshError};
pub use events::SessionEvent;
pub use fallback::with_default;
pub use gateway::{GatewaySettings, GatewayStats, Payload, RequestGateway, RequestOptions};
pub use monitor::spawn_token_monitor;
pub use store::{FileTokenStore, MemoryTokenStore, TokenPair, TokenStore};
pub use token::Claims;

static CRYPTO_INIT: Once = Once::new();

/// Install the rustls crypto provider reqwest needs, even for plain HTTP.
/// Safe to call multiple times; only the first call has effect.
pub fn ensure_crypto() {
    CRYPTO_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
