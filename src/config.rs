//! Collector configuration
//!
//! The collector reads configuration from:
//! 1. `DEPMON_CONFIG` environment variable (path to TOML file)
//! 2. `./depmon.toml` in current directory
//! 3. Default configuration
//!
//! `DEPMON_AUTH_TOKEN` and `DEPMON_LISTEN_ADDR` override the file.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::services::AggregatorConfig;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "DEPMON_CONFIG";

/// Environment variable overriding the shared auth token
pub const AUTH_TOKEN_ENV: &str = "DEPMON_AUTH_TOKEN";

/// Environment variable overriding the listen address
pub const LISTEN_ADDR_ENV: &str = "DEPMON_LISTEN_ADDR";

/// Basic-auth username shared by reporter and collector
pub const DEFAULT_AUTH_USERNAME: &str = "depmon";

/// Collector configuration loaded from TOML or environment
#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    /// HTTP server address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Tally window length in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Basic-auth username expected from reporters
    #[serde(default = "default_auth_username")]
    pub auth_username: String,

    /// Shared token reporters send as the Basic-auth password
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_window_secs() -> u64 {
    60
}

fn default_auth_username() -> String {
    DEFAULT_AUTH_USERNAME.to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            window_secs: default_window_secs(),
            auth_username: default_auth_username(),
            auth_token: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl CollectorConfig {
    /// Parse a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Configuration(e.to_string()))
    }

    /// Read and parse a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Load from the usual locations, apply environment overrides and validate
    pub fn load() -> Result<Self> {
        let mut config = if let Ok(path) = std::env::var(CONFIG_ENV) {
            let config = Self::from_file(&path)?;
            tracing::info!(path = %path, "Loaded configuration from file");
            config
        } else if Path::new("depmon.toml").exists() {
            let config = Self::from_file("depmon.toml")?;
            tracing::info!("Loaded configuration from depmon.toml");
            config
        } else {
            tracing::info!("Using default configuration");
            Self::default()
        };

        config.apply_overrides(
            std::env::var(AUTH_TOKEN_ENV).ok(),
            std::env::var(LISTEN_ADDR_ENV).ok(),
        );
        config.validate()?;
        Ok(config)
    }

    /// Replace file values with those set in the environment
    pub fn apply_overrides(&mut self, auth_token: Option<String>, listen_addr: Option<String>) {
        if let Some(token) = auth_token.filter(|t| !t.is_empty()) {
            self.auth_token = Some(token);
        }
        if let Some(addr) = listen_addr.filter(|a| !a.is_empty()) {
            self.listen_addr = addr;
        }
    }

    /// Reject settings the collector cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.auth_token.as_deref().map_or(true, str::is_empty) {
            return Err(Error::Configuration(format!(
                "auth_token is required (set it in the config file or {AUTH_TOKEN_ENV})"
            )));
        }
        if self.auth_username.is_empty() {
            return Err(Error::Configuration("auth_username must not be empty".into()));
        }
        if self.window_secs == 0 {
            return Err(Error::Configuration("window_secs must be positive".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Configuration(
                "request_timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Tally window length
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Per-request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Aggregator settings derived from this config
    pub fn aggregator(&self) -> AggregatorConfig {
        AggregatorConfig {
            window: self.window(),
        }
    }
}
