// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Access token claims, read without signature verification.
//!
//! The client only ever inspects `exp` (and a few identity fields for
//! display). Signatures are the backend's concern.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Default safety buffer before `exp` at which a token counts as expired.
pub const DEFAULT_EXPIRY_BUFFER_SECS: u64 = 30;

/// Claims carried in the access token payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Expiry as epoch seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

impl Claims {
    /// Seconds until `exp`, or `None` if already past or absent.
    pub fn expires_in_secs(&self) -> Option<u64> {
        let exp = self.exp?;
        let now = epoch_secs();
        if exp > now {
            Some(exp - now)
        } else {
            None
        }
    }
}

/// Decode the payload segment of a JWT-shaped token.
///
/// Returns `None` for anything that is not `header.payload.signature` with a
/// base64url JSON object in the middle.
pub fn decode_claims(token: &str) -> Option<Claims> {
    let mut parts = token.split('.');
    let (_header, payload, _sig) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    // Tolerate padded encoders.
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Whether `token` is expired, or will be within `buffer_secs`.
///
/// Undecodable tokens and tokens without `exp` count as expired.
pub fn is_expired(token: &str, buffer_secs: u64) -> bool {
    match decode_claims(token).and_then(|c| c.exp) {
        Some(exp) => exp <= epoch_secs().saturating_add(buffer_secs),
        None => true,
    }
}

pub fn epoch_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
