// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::*;
use crate::store::TokenStore;
use crate::test_support::{mint_token, MockBackend, MockConfig};

#[tokio::test]
async fn refreshes_token_nearing_expiry_once() -> anyhow::Result<()> {
    let new = mint_token(3600);
    let backend = MockBackend::start(MockConfig {
        refresh: vec![MockConfig::refresh_ok(&new, None)],
        ..Default::default()
    })
    .await?;
    let (gateway, store) = backend.gateway(Some(&mint_token(120)), Some("r0"))?;

    let shutdown = CancellationToken::new();
    let handle = spawn_token_monitor(gateway, Duration::from_millis(20), 300, shutdown.clone());
    tokio::time::sleep(Duration::from_millis(200)).await;
    shutdown.cancel();
    handle.await?;

    assert_eq!(backend.refresh_calls(), 1);
    assert_eq!(store.access_token(), Some(new));
    Ok(())
}

#[tokio::test]
async fn leaves_fresh_tokens_alone() -> anyhow::Result<()> {
    let token = mint_token(3600);
    let backend = MockBackend::start(MockConfig::default()).await?;
    let (gateway, store) = backend.gateway(Some(&token), Some("r0"))?;

    let shutdown = CancellationToken::new();
    let handle = spawn_token_monitor(gateway, Duration::from_millis(20), 300, shutdown.clone());
    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown.cancel();
    handle.await?;

    assert_eq!(backend.refresh_calls(), 0);
    assert_eq!(store.access_token(), Some(token));
    Ok(())
}

#[tokio::test]
async fn failed_refresh_ends_session_and_keeps_running() -> anyhow::Result<()> {
    let backend = MockBackend::start(MockConfig {
        refresh: vec![(401, serde_json::json!({ "detail": "revoked" }))],
        ..Default::default()
    })
    .await?;
    let (gateway, store) = backend.gateway(Some(&mint_token(60)), Some("r0"))?;

    let shutdown = CancellationToken::new();
    let handle = spawn_token_monitor(gateway, Duration::from_millis(20), 300, shutdown.clone());
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(!handle.is_finished());
    shutdown.cancel();
    handle.await?;

    // Without a refresh token later ticks have nothing to do.
    assert_eq!(backend.refresh_calls(), 1);
    assert!(store.access_token().is_none());
    Ok(())
}

#[tokio::test]
async fn zero_interval_is_clamped_instead_of_panicking() -> anyhow::Result<()> {
    let new = mint_token(3600);
    let backend = MockBackend::start(MockConfig {
        refresh: vec![MockConfig::refresh_ok(&new, None)],
        ..Default::default()
    })
    .await?;
    let (gateway, store) = backend.gateway(Some(&mint_token(120)), Some("r0"))?;

    let shutdown = CancellationToken::new();
    let handle = spawn_token_monitor(gateway, Duration::ZERO, 300, shutdown.clone());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!handle.is_finished());
    shutdown.cancel();
    handle.await?;

    assert_eq!(backend.refresh_calls(), 1);
    assert_eq!(store.access_token(), Some(new));
    Ok(())
}

#[tokio::test]
async fn refresh_token_alone_restores_session() -> anyhow::Result<()> {
    let new = mint_token(3600);
    let backend = MockBackend::start(MockConfig {
        refresh: vec![MockConfig::refresh_ok(&new, None)],
        ..Default::default()
    })
    .await?;
    let (gateway, store) = backend.gateway(None, Some("r0"))?;

    let shutdown = CancellationToken::new();
    let handle = spawn_token_monitor(gateway, Duration::from_millis(20), 300, shutdown.clone());
    tokio::time::sleep(Duration::from_millis(150)).await;
    shutdown.cancel();
    handle.await?;

    assert_eq!(backend.refresh_calls(), 1);
    assert_eq!(store.access_token(), Some(new));
    Ok(())
}
