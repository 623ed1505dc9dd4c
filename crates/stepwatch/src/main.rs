// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Stepwatch - Execution Status Notifier
//!
//! Watches workflow executions on a managed state-machine service and
//! posts Slack alerts for delayed, failed, and timed-out executions.

use std::sync::Arc;

use tracing::info;

use stepwatch::config::Config;
use stepwatch::notify::SlackNotifier;
use stepwatch::runtime::Runtime;
use stepwatch::store;
use stepwatch::workflow::HttpWorkflowService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A .env file may provide CONFIG_PATH.
    let _ = dotenvy::dotenv();

    let config_path = std::env::var("CONFIG_PATH")
        .map_err(|_| anyhow::anyhow!("CONFIG_PATH environment variable is not set"))?;
    let config = Config::load(&config_path)?;

    let default_filter = if config.debug {
        "stepwatch=debug"
    } else {
        "stepwatch=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    info!(
        config_path = %config_path,
        region = %config.region,
        workflows = config.workflows.len(),
        "Starting stepwatch"
    );

    let store = store::connect(&config.database_url).await?;
    info!("Connected to tracking store");

    let service = Arc::new(HttpWorkflowService::new(&config.service_endpoint)?);
    let notifier = Arc::new(SlackNotifier::new());

    let runtime = Runtime::start(store, service, notifier, Arc::new(config));

    wait_for_shutdown_signal().await?;

    runtime.shutdown().await;

    info!("Stepwatch shut down");

    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> anyhow::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("SIGINT received");
        }
        _ = terminate.recv() => {
            info!("SIGTERM received");
        }
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> anyhow::Result<()> {
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    Ok(())
}
