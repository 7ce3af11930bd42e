// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token storage: the single source of truth for the access/refresh pair.
//!
//! Stores never perform network I/O. The file-backed store survives process
//! restarts the way browser storage survives a page reload.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::token::{self, epoch_secs};

/// The current access/refresh token pair.
///
/// A refresh token may be present without an access token (e.g. right after
/// loading from disk when only the refresh token was kept).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl TokenPair {
    /// Replace the access token, keeping the refresh token unless rotated.
    fn apply(&mut self, access: &str, refresh: Option<&str>) {
        self.access_token = Some(access.to_owned());
        if let Some(rt) = refresh {
            self.refresh_token = Some(rt.to_owned());
        }
    }
}

/// Storage for the token pair.
pub trait TokenStore: Send + Sync {
    fn access_token(&self) -> Option<String>;

    fn refresh_token(&self) -> Option<String>;

    /// Overwrite the access token. `refresh = None` keeps the previous
    /// refresh token (servers are not required to rotate it).
    fn set_tokens(&self, access: &str, refresh: Option<&str>);

    /// Remove both tokens. Idempotent.
    fn clear_tokens(&self);

    /// Whether `token` is expired or within `buffer_secs` of expiring.
    /// Undecodable tokens are treated as expired.
    fn is_expired(&self, token: &str, buffer_secs: u64) -> bool {
        token::is_expired(token, buffer_secs)
    }
}

/// In-process token store.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    pair: Mutex<TokenPair>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(access: Option<&str>, refresh: Option<&str>) -> Self {
        Self {
            pair: Mutex::new(TokenPair {
                access_token: access.map(str::to_owned),
                refresh_token: refresh.map(str::to_owned),
            }),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn access_token(&self) -> Option<String> {
        self.pair.lock().access_token.clone()
    }

    fn refresh_token(&self) -> Option<String> {
        self.pair.lock().refresh_token.clone()
    }

    fn set_tokens(&self, access: &str, refresh: Option<&str>) {
        self.pair.lock().apply(access, refresh);
    }

    fn clear_tokens(&self) {
        *self.pair.lock() = TokenPair::default();
    }
}

/// On-disk format for [`FileTokenStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PersistedTokens {
    #[serde(flatten)]
    pair: TokenPair,
    /// When the pair was last written, epoch seconds.
    #[serde(default)]
    saved_at: u64,
}

/// Write-through token store backed by a JSON file.
pub struct FileTokenStore {
    path: PathBuf,
    pair: Mutex<TokenPair>,
}

impl FileTokenStore {
    /// Open the store at `path`, loading any tokens already on disk.
    ///
    /// A missing file yields an empty store. An unreadable or corrupt file is
    /// logged and also yields an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let pair = load(&path).unwrap_or_default();
        Self { path, pair: Mutex::new(pair) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, pair: &TokenPair) {
        let persisted = PersistedTokens { pair: pair.clone(), saved_at: epoch_secs() };
        if let Err(e) = save(&self.path, &persisted) {
            warn!(path = %self.path.display(), "failed to persist tokens: {e}");
        }
    }
}

impl TokenStore for FileTokenStore {
    fn access_token(&self) -> Option<String> {
        self.pair.lock().access_token.clone()
    }

    fn refresh_token(&self) -> Option<String> {
        self.pair.lock().refresh_token.clone()
    }

    fn set_tokens(&self, access: &str, refresh: Option<&str>) {
        let mut pair = self.pair.lock();
        pair.apply(access, refresh);
        // Written under the lock so concurrent saves land in call order.
        self.persist(&pair);
    }

    fn clear_tokens(&self) {
        let mut pair = self.pair.lock();
        *pair = TokenPair::default();
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "cleared persisted tokens"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), "failed to remove token file: {e}"),
        }
    }
}

fn load(path: &Path) -> Option<TokenPair> {
    let data = match std::fs::read_to_string(path) {
        Ok(d) => d,
        Err(e) => {
            debug!(path = %path.display(), "no persisted tokens: {e}");
            return None;
        }
    };
    match serde_json::from_str::<PersistedTokens>(&data) {
        Ok(p) => Some(p.pair),
        Err(e) => {
            warn!(path = %path.display(), "failed to parse persisted tokens: {e}");
            None
        }
    }
}

/// Atomic write: serialize to a sibling tmp file, then rename over `path`.
fn save(path: &Path, tokens: &PersistedTokens) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(tokens)?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
