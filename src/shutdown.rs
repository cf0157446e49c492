//! Process shutdown signals shared by both binaries

use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info};

/// Resolves on Ctrl+C or, on unix, SIGTERM
///
/// A handler that cannot be installed never fires, so a missing handler
/// does not look like a shutdown request.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received");
}

/// Broadcast a shutdown once `signal` resolves
pub async fn forward_shutdown<F>(signal: F, shutdown_tx: broadcast::Sender<()>)
where
    F: std::future::Future<Output = ()>,
{
    signal.await;
    let _ = shutdown_tx.send(());
}
