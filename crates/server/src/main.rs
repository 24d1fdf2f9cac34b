mod bootstrap;
mod health;
pub mod routes;

use anyhow::Result;
use wavebot_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use tracing::Level;
    use wavebot_core::config::LogFormat::*;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    // Bootstrap using the same config we already loaded
    let app = bootstrap::bootstrap_with_config(config).await?;

    let bind = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind).await?;

    tracing::info!(
        event_name = "system.server.started",
        address = %bind,
        correlation_id = "bootstrap",
        "wavebot-server listening"
    );

    let shutdown_grace = app.config.server.graceful_shutdown_secs;
    axum::serve(listener, app.router)
        .with_graceful_shutdown(wait_for_shutdown(shutdown_grace))
        .await?;

    tracing::info!(
        event_name = "system.server.stopped",
        correlation_id = "shutdown",
        "wavebot-server stopped"
    );

    Ok(())
}

async fn wait_for_shutdown(grace_secs: u64) {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!(
            event_name = "system.server.signal_error",
            correlation_id = "shutdown",
            "failed to install ctrl-c handler; shutting down immediately"
        );
        return;
    }
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        grace_secs,
        "shutdown signal received; draining connections"
    );
}
