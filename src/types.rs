//! Core data types shared by the reporter and the collector

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error code `mdmclient` prints when the DEP service is unavailable
pub const SERVICE_UNAVAILABLE_CODE: &str = "34006";

/// Wire string for a probe that found no error code
pub const SUCCESS_WIRE: &str = "success";

/// Health of the DEP enrollment API as seen by the collector
///
/// Variant order is the tie-break order used when two statuses share the
/// highest count in a window: the earlier variant wins.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum StatusCode {
    /// The enrollment API answered without an error code
    Available,
    /// The enrollment API reported the service-unavailable code
    Unavailable,
    /// No data for the window, or nothing has been observed yet
    #[default]
    Unknown,
}

impl StatusCode {
    /// All variants in tie-break order
    pub const ALL: [StatusCode; 3] = [
        StatusCode::Available,
        StatusCode::Unavailable,
        StatusCode::Unknown,
    ];

    /// Human-readable label rendered on the status page
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCode::Available => "Available",
            StatusCode::Unavailable => "Unavailable",
            StatusCode::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying one probe run, as carried on the wire
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Classification {
    /// No `Code=` marker in the probe output
    Success,
    /// Integer following the first `Code=` marker, sign included
    ErrorCode(String),
}

impl Classification {
    /// Parse a request body received from a reporter
    ///
    /// Returns `None` for anything that is neither `success` nor an integer
    /// (ASCII digits with an optional leading `-`).
    pub fn from_wire(body: &str) -> Option<Self> {
        if body == SUCCESS_WIRE {
            return Some(Classification::Success);
        }
        let digits = body.strip_prefix('-').unwrap_or(body);
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            return Some(Classification::ErrorCode(body.to_string()));
        }
        None
    }

    /// Request body sent to the collector
    pub fn as_wire(&self) -> &str {
        match self {
            Classification::Success => SUCCESS_WIRE,
            Classification::ErrorCode(code) => code,
        }
    }

    /// Map to the status tallied by the aggregator
    ///
    /// Only `success` and the service-unavailable code are known; any other
    /// error code has no status and is dropped by the collector.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Classification::Success => Some(StatusCode::Available),
            Classification::ErrorCode(code) if code == SERVICE_UNAVAILABLE_CODE => {
                Some(StatusCode::Unavailable)
            }
            Classification::ErrorCode(_) => None,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}
