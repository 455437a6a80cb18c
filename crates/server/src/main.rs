mod api;
mod app;
mod auth;
mod bootstrap;
mod error;
mod health;
mod pages;
mod templates;

use std::time::Duration;

use anyhow::{Context, Result};
use salesbook_core::config::{AppConfig, LoadOptions};
use tokio::net::TcpListener;

fn init_logging(config: &AppConfig) {
    use salesbook_core::config::LogFormat::*;
    use tracing::Level;

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
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    if app.config.auth.password.is_none() {
        tracing::warn!(
            event_name = "system.server.login_disabled",
            "auth.password is not set; every login attempt will be rejected"
        );
    }

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener =
        TcpListener::bind(&address).await.with_context(|| format!("failed to bind {address}"))?;
    let router = app::router(app::AppState::new(&app.config, app.db_pool.clone()));

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        %address,
        "salesbook-server listening"
    );
    axum::serve(listener, router).with_graceful_shutdown(wait_for_shutdown()).await?;

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "salesbook-server stopping"
    );
    let drain = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    if tokio::time::timeout(drain, app.db_pool.close()).await.is_err() {
        tracing::warn!(
            event_name = "system.server.pool_close_timeout",
            timeout_secs = app.config.server.graceful_shutdown_secs,
            "database pool did not close before the shutdown deadline"
        );
    }

    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(event_name = "system.server.signal_failed", %error, "ctrl-c handler failed");
    }
}
