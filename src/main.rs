//! Verdict Engine daemon
//!
//! Loads ~/.verdict-engine/config.json, starts the queue worker and serves
//! the status API until Ctrl-C.

use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use verdict_engine::server;
use verdict_engine::state::AppState;
use verdict_engine::storage::ConfigService;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Verdict Engine v{} starting", env!("CARGO_PKG_VERSION"));

    let config_service = ConfigService::new()?;
    info!(path = %config_service.path().display(), "configuration loaded");
    let config = config_service.into_config();

    let shutdown = CancellationToken::new();
    let (state, worker) = AppState::initialize(config, shutdown.clone())?;
    let state = Arc::new(state);

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Shutting down gracefully");
        signal.cancel();
    });

    server::run(state, shutdown.clone()).await?;
    shutdown.cancel();
    worker.await?;

    info!("Verdict Engine stopped");
    Ok(())
}
