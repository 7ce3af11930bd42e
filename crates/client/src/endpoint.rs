// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Endpoint classification and URL building.

use reqwest::Url;

use crate::error::ApiError;

/// Path of the token refresh endpoint, relative to the API base.
pub const REFRESH_PATH: &str = "/auth/refresh";

/// A route reachable without an access token.
struct PublicRoute {
    path: &'static str,
    /// Match any path under `path` (e.g. `/auth/check-email/{email}`).
    prefix: bool,
}

/// Routes that must never engage the refresh machinery: calling them before
/// authentication is the normal case.
const PUBLIC_ROUTES: &[PublicRoute] = &[
    PublicRoute { path: "/auth/login", prefix: false },
    PublicRoute { path: "/auth/register", prefix: false },
    PublicRoute { path: "/auth/admin-login", prefix: false },
    PublicRoute { path: REFRESH_PATH, prefix: false },
    PublicRoute { path: "/auth/check-email/", prefix: true },
    PublicRoute { path: "/auth/check-phone", prefix: false },
    PublicRoute { path: "/shops/check-name", prefix: false },
];

/// Reduce an endpoint to its route: drop scheme and host, the query string,
/// trailing slashes, and any leading `/api` segments.
fn normalize(endpoint: &str) -> &str {
    let mut path = endpoint.split(['?', '#']).next().unwrap_or_default();
    if let Some((_, rest)) = path.split_once("://") {
        path = rest.find('/').map_or("", |i| &rest[i..]);
    }
    while let Some(rest) = path.strip_prefix("/api") {
        if rest.is_empty() || rest.starts_with('/') {
            path = rest;
        } else {
            break;
        }
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

/// Whether `endpoint` is on the public allowlist.
pub fn is_public(endpoint: &str) -> bool {
    let path = normalize(endpoint);
    PUBLIC_ROUTES.iter().any(|route| {
        if route.prefix {
            path.starts_with(route.path) && path.len() > route.path.len()
        } else {
            path == route.path
        }
    })
}

/// Whether `endpoint` belongs to the auth API. A 401 from these is a real
/// answer, not a cue to refresh.
pub fn is_auth_endpoint(endpoint: &str) -> bool {
    normalize(endpoint).contains("/auth/")
}

/// Percent-encode a value for use as one path segment.
pub fn encode_segment(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'@' => {
                out.push(char::from(byte));
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Join an endpoint onto the API base URL and append query pairs.
///
/// Absolute `http(s)://` endpoints are used as-is.
pub fn resolve(base: &str, endpoint: &str, query: &[(String, String)]) -> Result<Url, ApiError> {
    let raw = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_owned()
    } else {
        let base = base.trim_end_matches('/');
        if endpoint.starts_with('/') {
            format!("{base}{endpoint}")
        } else {
            format!("{base}/{endpoint}")
        }
    };

    let mut url = Url::parse(&raw).map_err(|e| ApiError::InvalidUrl(format!("{raw}: {e}")))?;
    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (k, v) in query {
            pairs.append_pair(k, v);
        }
    }
    Ok(url)
}

#[cfg(test)]
#[path = "endpoint_tests.rs"]
mod tests;
