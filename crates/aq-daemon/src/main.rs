// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use aq_daemon::{config::Config, logging, spawn_background_tasks, startup};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path =
        std::env::var("AQ_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("config.toml"));
    let config = Config::load(&config_path)?;
    let _log_guard = logging::init(config.log_dir.as_deref());

    tracing::info!(
        host = %config.host,
        port = config.port,
        data_dir = %config.data_dir.display(),
        "starting aqd"
    );

    let daemon = startup(&config).await?;
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "http facade listening");

    let cancel = CancellationToken::new();
    let (heartbeat_handle, orchestrator_handle, router) =
        spawn_background_tasks(daemon, cancel.clone());

    let shutdown = {
        let cancel = cancel.clone();
        async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
            cancel.cancel();
        }
    };

    axum::serve(listener, router).with_graceful_shutdown(shutdown).await?;

    cancel.cancel();
    let _ = heartbeat_handle.await;
    let _ = orchestrator_handle.await;
    Ok(())
}
