//! DEP enrollment API health monitor
//!
//! Two processes share this library:
//!
//! - **depnag** (reporter) periodically runs `mdmclient dep nag`, classifies
//!   the output and posts the result to the collector.
//! - **depmon** (collector) tallies incoming reports into one-minute windows
//!   and serves the most frequent status of the last window on a status page.
//!
//! ```text
//! mdmclient ──▶ classify ──▶ POST /depnag ──▶ Collector ──▶ Aggregator ──▶ GET /
//! ```

pub mod collector;
pub mod config;
pub mod error;
pub mod http;
pub mod reporter;
pub mod services;
pub mod shutdown;
pub mod types;

pub use collector::{Collector, IngestOutcome};
pub use config::CollectorConfig;
pub use error::{DeliveryError, Error, ProbeError, Result};
pub use services::{Aggregator, AggregatorConfig, AggregatorHandle, Tally, WindowSummary};
pub use types::{Classification, StatusCode};
