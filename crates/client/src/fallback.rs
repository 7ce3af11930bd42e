// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::future::Future;

use tracing::debug;

use crate::error::ApiError;

/// Await `fut`, substituting `default` on any error.
///
/// Only for non-critical display reads. Mutations must propagate errors.
pub async fn with_default<T, F>(fut: F, default: T) -> T
where
    F: Future<Output = Result<T, ApiError>>,
{
    match fut.await {
        Ok(value) => value,
        Err(e) => {
            debug!(error = %e, status = ?e.status(), "read failed, using default");
            default
        }
    }
}

#[cfg(test)]
#[path = "fallback_tests.rs"]
mod tests;
