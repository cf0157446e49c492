//! Collector ingestion and verdict exposure
//!
//! Turns wire strings from reporters into statuses for the aggregator and
//! hands the aggregator's verdict to the rendering layer.

use crate::services::{AggregatorHandle, WindowSummary};
use crate::types::{Classification, StatusCode};

/// What happened to one inbound report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Queued for the live window
    Accepted(StatusCode),
    /// Not a known status string, dropped
    Unrecognized,
}

/// Front door to the aggregator for the HTTP layer
#[derive(Debug, Clone)]
pub struct Collector {
    aggregator: AggregatorHandle,
}

impl Collector {
    /// Wrap a running aggregator
    pub fn new(aggregator: AggregatorHandle) -> Self {
        Self { aggregator }
    }

    /// Map a reported string to a status and queue it
    ///
    /// Only `success` and the service-unavailable code reach the
    /// aggregator. Returns without waiting for the aggregator to count it.
    pub fn ingest(&self, report: &str) -> IngestOutcome {
        match Classification::from_wire(report).and_then(|c| c.status()) {
            Some(status) => {
                self.aggregator.record(status);
                tracing::debug!(%status, "Accepted DEP status report");
                IngestOutcome::Accepted(status)
            }
            None => {
                tracing::warn!(report = %report, "unknown DEP status reported");
                IngestOutcome::Unrecognized
            }
        }
    }

    /// Current verdict for the status page
    pub fn verdict(&self) -> StatusCode {
        self.aggregator.current_verdict()
    }

    /// Last closed window, for the JSON status endpoint
    pub fn summary(&self) -> WindowSummary {
        self.aggregator.summary()
    }

    /// Underlying aggregator handle
    pub fn aggregator(&self) -> &AggregatorHandle {
        &self.aggregator
    }
}
