// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background token monitor.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::gateway::RequestGateway;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Spawn a task that refreshes the access token ahead of expiry.
///
/// Every `interval` the stored token is checked; one expiring within
/// `margin_secs` is refreshed through the gateway's single-flight path, so
/// the monitor never races a request-driven refresh. A zero `interval` is
/// raised to one millisecond.
pub fn spawn_token_monitor(
    gateway: Arc<RequestGateway>,
    interval: Duration,
    margin_secs: u64,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    let interval = interval.max(MIN_INTERVAL);
    tokio::spawn(async move {
        info!(interval_secs = interval.as_secs(), margin_secs, "token monitor started");
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = timer.tick() => {}
            }

            match gateway.ensure_fresh(margin_secs).await {
                Ok(true) => debug!("token monitor refreshed access token"),
                Ok(false) => {}
                Err(e) => warn!(err = %e, "token monitor refresh failed"),
            }
        }
        debug!("token monitor stopped");
    })
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
