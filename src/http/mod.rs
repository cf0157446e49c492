//! HTTP surface of the collector
//!
//! # Endpoints
//!
//! - `GET /` - Status page with the current verdict
//! - `POST /depnag` - Status report from a reporter (Basic auth)
//! - `GET /health` - Liveness check
//! - `GET /api/v1/status` - Verdict and last window counts as JSON

pub mod auth;
pub mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::collector::Collector;

pub use auth::BasicAuth;

/// Path reporters post their status to
pub const REPORT_PATH: &str = "/depnag";

/// Shared application state
pub struct AppState {
    pub collector: Collector,
    pub auth: BasicAuth,
}

impl AppState {
    pub fn new(collector: Collector, auth: BasicAuth) -> Self {
        Self { collector, auth }
    }
}

/// Build the router with all endpoints
pub fn build_router(state: Arc<AppState>, request_timeout: Duration) -> Router {
    let reports: Router<Arc<AppState>> = Router::new()
        .route(REPORT_PATH, post(handlers::ingest_status))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_basic_auth,
        ));

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/api/v1/status", get(handlers::status))
        .merge(reports)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
