//! # Status Transport
//!
//! Delivers a classification to the collector over authenticated HTTP.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::debug;

use crate::config::DEFAULT_AUTH_USERNAME;
use crate::error::DeliveryError;
use crate::types::Classification;

/// Sink for classification results
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver one classification
    async fn deliver(&self, classification: &Classification) -> Result<(), DeliveryError>;
}

/// Configuration for the HTTP transport
#[derive(Clone)]
pub struct HttpTransportConfig {
    /// Full URL of the collector's report endpoint
    pub server_url: Url,
    /// Basic-auth username
    pub username: String,
    /// Shared token sent as the Basic-auth password
    pub auth_token: String,
    /// Whole-request timeout
    pub timeout: Duration,
}

impl std::fmt::Debug for HttpTransportConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransportConfig")
            .field("server_url", &self.server_url.as_str())
            .field("username", &self.username)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HttpTransportConfig {
    pub fn new(server_url: Url, auth_token: impl Into<String>) -> Self {
        Self {
            server_url,
            username: DEFAULT_AUTH_USERNAME.to_string(),
            auth_token: auth_token.into(),
            timeout: Duration::from_secs(15),
        }
    }
}

/// POSTs the classification as a `text/plain` body
#[derive(Debug)]
pub struct HttpTransport {
    client: Client,
    config: HttpTransportConfig,
}

impl HttpTransport {
    /// Build the HTTP client
    pub fn new(config: HttpTransportConfig) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(format!("depnag/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        debug!(
            server_url = %config.server_url,
            timeout_ms = config.timeout.as_millis() as u64,
            "Created status transport"
        );

        Ok(Self { client, config })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn deliver(&self, classification: &Classification) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(self.config.server_url.clone())
            .basic_auth(&self.config.username, Some(&self.config.auth_token))
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(classification.as_wire().to_string())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Rejected(status.as_u16()));
        }

        debug!(status = %classification, http_status = status.as_u16(), "Delivered status");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{body::Bytes, http::HeaderMap, routing::post, Router};
    use parking_lot::Mutex;

    type Seen = Arc<Mutex<Vec<(Option<String>, String)>>>;

    /// Local collector stand-in recording the auth header and body
    async fn serve(status: axum::http::StatusCode) -> (Url, Seen) {
        let seen: Seen = Arc::default();
        let recorder = Arc::clone(&seen);
        let app = Router::new().route(
            "/depnag",
            post(move |headers: HeaderMap, body: Bytes| {
                let recorder = Arc::clone(&recorder);
                async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    recorder
                        .lock()
                        .push((auth, String::from_utf8_lossy(&body).into_owned()));
                    status
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let url = Url::parse(&format!("http://{addr}/depnag")).unwrap();
        (url, seen)
    }

    #[test]
    fn test_config_defaults() {
        let config = HttpTransportConfig::new(Url::parse("http://localhost/depnag").unwrap(), "t");
        assert_eq!(config.username, "depmon");
        assert_eq!(config.timeout, Duration::from_secs(15));
        assert!(!format!("{config:?}").contains("auth_token"));
    }

    #[tokio::test]
    async fn test_delivers_body_with_basic_auth() {
        let (url, seen) = serve(axum::http::StatusCode::ACCEPTED).await;
        let transport = HttpTransport::new(HttpTransportConfig::new(url, "secret")).unwrap();

        transport
            .deliver(&Classification::ErrorCode("34006".into()))
            .await
            .unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        // depmon:secret
        assert_eq!(seen[0].0.as_deref(), Some("Basic ZGVwbW9uOnNlY3JldA=="));
        assert_eq!(seen[0].1, "34006");
    }

    #[tokio::test]
    async fn test_rejected_status() {
        let (url, _seen) = serve(axum::http::StatusCode::UNAUTHORIZED).await;
        let transport = HttpTransport::new(HttpTransportConfig::new(url, "secret")).unwrap();

        let result = transport.deliver(&Classification::Success).await;
        assert!(matches!(result, Err(DeliveryError::Rejected(401))));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = Url::parse(&format!("http://{addr}/depnag")).unwrap();
        let mut config = HttpTransportConfig::new(url, "secret");
        config.timeout = Duration::from_secs(2);
        let transport = HttpTransport::new(config).unwrap();

        let result = transport.deliver(&Classification::Success).await;
        assert!(matches!(result, Err(DeliveryError::Request(_))));
    }
}
