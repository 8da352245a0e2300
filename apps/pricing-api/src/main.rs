//! # Quickshop Pricing API server
//!
//! Loads configuration, opens the rule store, and serves the pricing routes
//! until Ctrl+C or SIGTERM.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use quickshop_db::Database;
use quickshop_pricing_api::{routes, ApiConfig, AppState, LogFormat};

const DEFAULT_LOG_FILTER: &str = "info,quickshop=debug,sqlx=warn";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ApiConfig::load().context("loading configuration")?;
    init_tracing(config.log_format);

    info!("Starting Quickshop pricing API...");
    info!(
        port = config.http_port,
        database = %config.database_path,
        max_connections = config.db_max_connections,
        "Configuration loaded"
    );

    let addr = config.listen_addr()?;

    let db = Database::new(config.db_config())
        .await
        .context("opening rule store")?;
    info!("Connected to rule store");

    let app = routes::router(AppState::new(Arc::new(db.clone())));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "Starting HTTP server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// `RUST_LOG` wins over the built-in filter.
fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.with_thread_ids(true).pretty().init(),
    }
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
