//! # Basic Authentication Middleware
//!
//! Reporters authenticate with HTTP Basic auth: a fixed username and the
//! shared token as password.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::{debug, warn};

use super::AppState;

/// Challenge sent with every 401
pub const CHALLENGE: &str = r#"Basic realm="depmon""#;

/// Expected Basic-auth credentials
#[derive(Clone)]
pub struct BasicAuth {
    username: String,
    token: String,
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            token: token.into(),
        }
    }

    /// Check an `Authorization` header value
    pub fn verify(&self, header: Option<&HeaderValue>) -> bool {
        let Some(value) = header.and_then(|h| h.to_str().ok()) else {
            return false;
        };
        match decode_basic(value) {
            Some((username, password)) => username == self.username && password == self.token,
            None => false,
        }
    }
}

/// Split a `Basic <base64(user:pass)>` header into its credentials
fn decode_basic(header: &str) -> Option<(String, String)> {
    let (scheme, encoded) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// Reject requests without the expected credentials
pub async fn require_basic_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if state.auth.verify(request.headers().get(AUTHORIZATION)) {
        debug!("Authenticated status report");
        return next.run(request).await;
    }

    warn!(uri = %request.uri(), "Rejected request with missing or invalid credentials");
    unauthorized()
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(WWW_AUTHENTICATE, CHALLENGE)],
        "you need to log in\n",
    )
        .into_response()
}
