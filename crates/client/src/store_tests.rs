// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::mint_token;

#[test]
fn set_tokens_keeps_refresh_when_not_rotated() {
    let store = MemoryTokenStore::with_tokens(Some("a1"), Some("r1"));
    store.set_tokens("a2", None);
    assert_eq!(store.access_token().as_deref(), Some("a2"));
    assert_eq!(store.refresh_token().as_deref(), Some("r1"));

    store.set_tokens("a3", Some("r2"));
    assert_eq!(store.access_token().as_deref(), Some("a3"));
    assert_eq!(store.refresh_token().as_deref(), Some("r2"));
}

#[test]
fn clear_tokens_is_idempotent() {
    let store = MemoryTokenStore::with_tokens(Some("a"), Some("r"));
    store.clear_tokens();
    store.clear_tokens();
    assert!(store.access_token().is_none());
    assert!(store.refresh_token().is_none());
}

#[test]
fn store_delegates_expiry_check() {
    let store = MemoryTokenStore::new();
    assert!(!store.is_expired(&mint_token(600), 30));
    assert!(store.is_expired(&mint_token(600), 900));
    assert!(store.is_expired("garbage", 0));
}

#[test]
fn file_store_survives_reopen() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("nested").join("tokens.json");

    let store = FileTokenStore::open(&path);
    assert!(store.access_token().is_none());
    store.set_tokens("access-1", Some("refresh-1"));
    store.set_tokens("access-2", None);
    drop(store);

    let reopened = FileTokenStore::open(&path);
    assert_eq!(reopened.access_token().as_deref(), Some("access-2"));
    assert_eq!(reopened.refresh_token().as_deref(), Some("refresh-1"));

    let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    assert!(raw["saved_at"].as_u64().is_some_and(|t| t > 0));
    Ok(())
}

#[test]
fn file_store_clear_removes_file_and_tolerates_repeat() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("tokens.json");

    let store = FileTokenStore::open(&path);
    store.set_tokens("a", Some("r"));
    assert!(path.exists());

    store.clear_tokens();
    store.clear_tokens();
    assert!(!path.exists());
    assert!(store.access_token().is_none());
    assert!(store.refresh_token().is_none());
    Ok(())
}

#[test]
fn file_store_ignores_corrupt_file() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("tokens.json");
    std::fs::write(&path, "{ not json")?;

    let store = FileTokenStore::open(&path);
    assert!(store.access_token().is_none());
    assert!(store.refresh_token().is_none());
    Ok(())
}

#[test]
fn file_store_loads_refresh_only() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("tokens.json");
    std::fs::write(&path, r#"{"refresh_token":"r-only"}"#)?;

    let store = FileTokenStore::open(&path);
    assert!(store.access_token().is_none());
    assert_eq!(store.refresh_token().as_deref(), Some("r-only"));
    Ok(())
}
