//! Background Services Module
//!
//! Long-running tasks owned by the collector process.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐  record (unbounded)  ┌──────────────────┐
//! │  Ingest handler │─────────────────────▶│    Aggregator    │
//! └─────────────────┘                      │  (owning task)   │
//!                                          │  live Tally      │
//! ┌─────────────────┐  read verdict        │  window timer    │
//! │   Status page   │◀─────────────────────│  WindowSummary   │
//! └─────────────────┘                      └──────────────────┘
//! ```

pub mod aggregator;

pub use aggregator::{Aggregator, AggregatorConfig, AggregatorHandle, Tally, WindowSummary};
