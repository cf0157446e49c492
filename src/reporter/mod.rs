//! Reporter poll loop
//!
//! Each cycle runs the probe, classifies its output and delivers the result
//! to the collector, then waits out the rest of the poll interval:
//!
//! ```text
//! Probing ──▶ Classifying ──▶ Reporting ──▶ Waiting ──┐
//!    ▲                                                 │
//!    └─────────────────────────────────────────────────┘
//! ```
//!
//! A probe that cannot run and the root-privilege message end the loop with
//! an error. Delivery failures are logged and the loop carries on; the next
//! cycle's report supersedes the lost one.

pub mod classify;
pub mod config;
pub mod probe;
pub mod transport;

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::error::Result;
use crate::types::Classification;

pub use classify::{classify, PRIVILEGE_MARKER};
pub use config::{ReporterArgs, ReporterConfig};
pub use probe::{CommandProbe, Probe, ProbeOutput};
pub use transport::{HttpTransport, HttpTransportConfig, Transport};

/// Periodic probe-and-report driver
pub struct Reporter<P, T> {
    probe: P,
    transport: T,
    interval: Duration,
}

impl<P: Probe, T: Transport> Reporter<P, T> {
    pub fn new(probe: P, transport: T, interval: Duration) -> Self {
        Self {
            probe,
            transport,
            interval,
        }
    }

    /// Probe, classify and report once
    ///
    /// Returns the classification whether or not it was delivered.
    pub async fn run_cycle(&self) -> Result<Classification> {
        let output = self.probe.run().await?;
        let classification = classify(&output.text)?;

        if let Err(e) = self.transport.deliver(&classification).await {
            warn!(error = %e, status = %classification, "Failed to report DEP status");
        }

        Ok(classification)
    }

    /// Run cycles until shutdown or a fatal error
    ///
    /// Cycles start one interval apart, measured from the start of the
    /// previous cycle.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                result = shutdown.recv() => {
                    match result {
                        Ok(()) | Err(broadcast::error::RecvError::Closed) => {
                            info!("Reporter received shutdown signal");
                            return Ok(());
                        }
                        Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    }
                }

                _ = ticker.tick() => {}
            }

            let status = self.run_cycle().await?;
            info!(
                status = %status,
                "last status {}, waiting {:?} to run again",
                status,
                self.interval
            );
        }
    }
}
