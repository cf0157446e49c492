//! depnag: DEP status reporter
//!
//! Runs `mdmclient dep nag` every interval and posts the result to a
//! depmon collector.
//!
//! ```bash
//! sudo depnag --interval 25m \
//!     --server.url https://depmon.example.com/depnag \
//!     --server.auth_token secret
//! ```
//!
//! Exits with status 1 on missing configuration, when mdmclient cannot be
//! run, or when it has to be run as root.

use clap::Parser;
use depmon::reporter::{
    CommandProbe, HttpTransport, HttpTransportConfig, Reporter, ReporterArgs, ReporterConfig,
};
use depmon::shutdown::{forward_shutdown, shutdown_signal};
use depmon::Error;
use tokio::sync::broadcast;
use tracing::{error, info};

fn fail(e: &Error) -> ! {
    error!(error = %e, "depnag stopping");
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    let args = ReporterArgs::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("depmon=info,depnag=info")),
        )
        .init();

    let config = ReporterConfig::try_from(args).unwrap_or_else(|e| fail(&e));
    info!(?config, "depnag starting, version {}", env!("CARGO_PKG_VERSION"));

    let mut transport_config =
        HttpTransportConfig::new(config.server_url.clone(), config.auth_token.clone());
    transport_config.timeout = config.delivery_timeout;
    let transport = HttpTransport::new(transport_config).unwrap_or_else(|e| fail(&e.into()));

    let probe = CommandProbe::mdmclient(config.mdmclient.clone(), config.probe_timeout);
    let reporter = Reporter::new(probe, transport, config.interval);

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(forward_shutdown(shutdown_signal(), shutdown_tx));

    if let Err(e) = reporter.run(shutdown_rx).await {
        fail(&e);
    }
}
