//! Error types for the reporter and the collector

use std::time::Duration;

use thiserror::Error;

/// Main error type
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid setting, detected before any loop starts
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The probe refused to run without root
    #[error("Must run as root")]
    PrivilegeRequired,

    /// The probe could not be run to completion
    #[error("Probe error: {0}")]
    Probe(#[from] ProbeError),

    /// The status report did not reach the collector
    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    /// Socket or file I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The aggregator task is no longer running
    #[error("Aggregator task has stopped")]
    AggregatorClosed,
}

/// Probe execution errors
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The probe command could not be started or waited on
    #[error("failed to run probe: {0}")]
    Launch(#[source] std::io::Error),

    /// The probe did not finish in time and was killed
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
}

/// Status delivery errors
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// Network failure or client timeout
    #[error("posting status to server: {0}")]
    Request(#[from] reqwest::Error),

    /// The collector answered with a non-success HTTP status
    #[error("server rejected status report with HTTP {0}")]
    Rejected(u16),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
