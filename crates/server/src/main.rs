mod bootstrap;
mod health;
mod open;

use anyhow::Result;
use scout_core::config::{AppConfig, LoadOptions};
use tracing::info;

fn init_logging(config: &AppConfig) {
    use scout_core::config::LogFormat::*;
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
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    let http_router = health::router(app.db_pool.clone()).merge(open::router(open::OpenState {
        orchestrator: app.orchestrator.clone(),
        search: app.config.search.clone(),
    }));
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!(
        event_name = "system.server.http_started",
        bind_address = %address,
        "health and open-redirect endpoints started"
    );
    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, http_router).await {
            tracing::error!(
                event_name = "system.server.http_error",
                error = %error,
                "http server terminated unexpectedly"
            );
        }
    });

    app.slack_runner.start().await?;
    info!(event_name = "system.server.started", "scout-server started");

    wait_for_shutdown().await?;
    info!(event_name = "system.server.stopping", "scout-server stopping");

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
