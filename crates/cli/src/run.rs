// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use reqwest::Method;
use serde::Serialize;
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use izishop_client::{spawn_token_monitor, ApiClient, RequestOptions};

use crate::config::{parse_method, parse_query_pair, Cli, Command};

/// Initialize tracing on stderr so stdout stays machine-readable.
pub fn init_tracing(cli: &Cli) {
    use tracing_subscriber::fmt;

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));

    let result = match cli.log_format.as_str() {
        "json" => fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).json().try_init(),
        _ => fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init(),
    };
    drop(result);
}

/// Execute one subcommand, printing its result as JSON on stdout.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let client = ApiClient::from_config(&cli.client)?;
    debug!(api_url = %cli.client.api_url, token_file = %cli.client.token_path().display(), "client ready");

    match cli.command {
        Command::Login { ref email, ref password } => {
            let response = client.login(email, password).await?;
            print_json(&json!({ "authenticated": client.is_authenticated(), "user": response.user }))
        }
        Command::AdminLogin { ref email, ref password, ref admin_code } => {
            let response = client.admin_login(email, password, admin_code).await?;
            print_json(&json!({ "authenticated": client.is_authenticated(), "user": response.user }))
        }
        Command::Logout => {
            client.logout().await;
            print_json(&json!({ "authenticated": false }))
        }
        Command::Whoami => match client.user_info() {
            Some(claims) => print_json(&claims),
            None => anyhow::bail!("not logged in"),
        },
        Command::Status => print_json(&json!({
            "authenticated": client.is_authenticated(),
            "api_url": cli.client.api_url,
            "token_file": cli.client.token_path(),
            "user": client.user_info(),
            "refresh_token": client.gateway().store().refresh_token().is_some(),
        })),
        Command::Health => {
            let healthy = client.health().await;
            print_json(&json!({ "healthy": healthy }))?;
            if !healthy {
                anyhow::bail!("backend unreachable at {}", cli.client.api_url);
            }
            Ok(())
        }
        Command::Request { ref method, ref endpoint, ref data, ref query, public } => {
            let method: Method = parse_method(method)?;
            let mut options = RequestOptions::new();
            if let Some(data) = data {
                options = options.json(serde_json::from_str(data)?);
            }
            for pair in query {
                let (key, value) = parse_query_pair(pair)?;
                options = options.query(key, value);
            }
            let payload = client.request(method, endpoint, options, !public).await?;
            print_json(&payload.into_value())
        }
        Command::Shop => print_json(&client.my_shop().await?),
        Command::Analytics { ref period } => {
            let (analytics, today, products, ratings) = tokio::join!(
                client.shop_owner_analytics(period),
                client.today_stats(),
                client.my_product_stats(),
                client.my_shop_rating_stats(),
            );
            print_json(&json!({
                "period": period,
                "analytics": analytics,
                "today": today,
                "products": products,
                "ratings": ratings,
            }))
        }
        Command::Watch => watch(&client, &cli).await,
    }
}

/// Run the token monitor until ctrl-c, echoing session events as JSON lines.
async fn watch(client: &ApiClient, cli: &Cli) -> anyhow::Result<()> {
    if !can_watch(client) {
        anyhow::bail!("not logged in");
    }
    let shutdown = CancellationToken::new();
    let mut events = client.subscribe();
    let monitor = spawn_token_monitor(
        client.gateway().clone(),
        cli.client.monitor_interval(),
        cli.client.monitor_margin_secs,
        shutdown.clone(),
    );
    info!("watching session, press ctrl-c to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(event) => {
                    println!("{}", serde_json::to_string(&event)?);
                    if matches!(event, izishop_client::SessionEvent::SessionExpired { .. }) {
                        break;
                    }
                }
                Err(RecvError::Lagged(n)) => debug!(skipped = n, "event stream lagged"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    shutdown.cancel();
    monitor.await?;
    Ok(())
}

/// A stored refresh token alone is enough: the first tick renews the session.
fn can_watch(client: &ApiClient) -> bool {
    client.is_authenticated() || client.gateway().store().refresh_token().is_some()
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
