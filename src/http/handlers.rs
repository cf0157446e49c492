//! HTTP Handlers for the collector
//!
//! Status page, report ingestion and JSON views of the aggregator.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    Json,
};
use serde::Serialize;
use tracing::warn;

use super::AppState;
use crate::collector::IngestOutcome;
use crate::types::StatusCode as DepStatus;

// =============================================================================
// Response Types
// =============================================================================

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Verdict and the window it was computed from
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: DepStatus,
    pub window_secs: u64,
    pub windows_closed: u64,
    pub last_window: BTreeMap<DepStatus, u64>,
}

// =============================================================================
// Status Page
// =============================================================================

const INDEX_TEMPLATE: &str = r#"
<html>
<head>
<title>MicroMDM: DEP Status</title>
</head>
<body>
<div class="container">
	<b>DEP Services Status: {status}</b>
</div>
</body>
</html>
"#;

/// Render the status page for a verdict
pub fn render_status_page(status: DepStatus) -> String {
    INDEX_TEMPLATE.replace("{status}", status.as_str())
}

/// Status page
pub async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_status_page(state.collector.verdict()))
}

// =============================================================================
// Ingestion
// =============================================================================

/// Accept a status report from a reporter
///
/// The body is the classification string. The report is queued for the
/// aggregator and acknowledged with 202 whether or not it was recognized.
pub async fn ingest_status(State(state): State<Arc<AppState>>, body: Bytes) -> impl IntoResponse {
    let report = match std::str::from_utf8(&body) {
        Ok(report) => report,
        Err(e) => {
            warn!(error = %e, "Malformed status report body");
            return (StatusCode::BAD_REQUEST, format!("malformed status report: {e}\n"));
        }
    };

    match state.collector.ingest(report) {
        IngestOutcome::Accepted(_) => (StatusCode::ACCEPTED, String::new()),
        IngestOutcome::Unrecognized => (
            StatusCode::ACCEPTED,
            "unrecognized status ignored\n".to_string(),
        ),
    }
}

// =============================================================================
// Health & Status
// =============================================================================

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Current verdict with the counts behind it
pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let summary = state.collector.summary();
    Json(StatusResponse {
        status: summary.verdict,
        window_secs: state.collector.aggregator().window().as_secs(),
        windows_closed: summary.windows_closed,
        last_window: summary.tally.counts().clone(),
    })
}

// =============================================================================
// Tests
// =============================================================================
