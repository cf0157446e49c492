//! depmon: DEP status collector
//!
//! Receives status reports from `depnag` reporters, tallies them into
//! fixed windows and serves the dominant status of the last window.
//!
//! # Configuration
//!
//! The server reads configuration from:
//! 1. `DEPMON_CONFIG` environment variable (path to TOML file)
//! 2. `./depmon.toml` in current directory
//! 3. Default configuration
//!
//! `DEPMON_AUTH_TOKEN` must be set unless the file provides `auth_token`.
//!
//! # Example
//!
//! ```bash
//! DEPMON_AUTH_TOKEN=secret ./depmon
//!
//! curl -u depmon:secret -X POST http://localhost:8080/depnag -d success
//! curl http://localhost:8080/
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use depmon::http::{build_router, AppState, BasicAuth};
use depmon::shutdown::shutdown_signal;
use depmon::{Aggregator, Collector, CollectorConfig, Error};
use tokio::sync::broadcast;
use tracing::{error, info};

async fn serve(config: CollectorConfig) -> depmon::Result<()> {
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let (aggregator, aggregator_task) = Aggregator::spawn(config.aggregator(), shutdown_rx);

    let auth = BasicAuth::new(
        config.auth_username.clone(),
        config.auth_token.clone().unwrap_or_default(),
    );
    let state = Arc::new(AppState::new(Collector::new(aggregator), auth));
    let app = build_router(state, config.request_timeout());

    let addr: SocketAddr = config.listen_addr.parse().map_err(|e| {
        Error::Configuration(format!("invalid listen address {}: {e}", config.listen_addr))
    })?;
    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(());
    if let Err(e) = aggregator_task.await {
        error!(error = %e, "Aggregator task failed");
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("depmon=info,tower_http=info")),
        )
        .init();

    info!("depmon starting, version {}", env!("CARGO_PKG_VERSION"));

    let config = match CollectorConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };
    info!(
        listen_addr = %config.listen_addr,
        window_secs = config.window_secs,
        "Configuration loaded"
    );

    if let Err(e) = serve(config).await {
        error!(error = %e, "Server failed");
        std::process::exit(1);
    }

    info!("Server shutdown complete");
}
