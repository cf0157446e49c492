//! Reporter command line
//!
//! Every setting can also come from a `DEPNAG_*` environment variable.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use reqwest::Url;

use super::probe::DEFAULT_MDMCLIENT;
use crate::error::{Error, Result};

/// Check in with the DEP API and report the result to a depmon collector
#[derive(Debug, Clone, Parser)]
#[command(name = "depnag")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct ReporterArgs {
    /// Interval to check in with DEP (e.g. 30s, 25m, 1h)
    #[arg(long, env = "DEPNAG_INTERVAL", default_value = "25m", value_parser = parse_interval)]
    pub interval: Duration,

    /// URL of the depmon report endpoint
    #[arg(long = "server.url", env = "DEPNAG_SERVER_URL")]
    pub server_url: Option<String>,

    /// Authentication token for the depmon server
    #[arg(long = "server.auth_token", env = "DEPNAG_AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: Option<String>,

    /// Kill the probe if it runs longer than this
    #[arg(long, env = "DEPNAG_PROBE_TIMEOUT", default_value = "2m", value_parser = parse_interval)]
    pub probe_timeout: Duration,

    /// Give up on a status delivery after this long
    #[arg(long, env = "DEPNAG_DELIVERY_TIMEOUT", default_value = "15s", value_parser = parse_interval)]
    pub delivery_timeout: Duration,

    /// Path to the mdmclient binary
    #[arg(long, env = "DEPNAG_MDMCLIENT", default_value = DEFAULT_MDMCLIENT)]
    pub mdmclient: PathBuf,
}

/// Validated reporter settings
#[derive(Clone)]
pub struct ReporterConfig {
    pub interval: Duration,
    pub server_url: Url,
    pub auth_token: String,
    pub probe_timeout: Duration,
    pub delivery_timeout: Duration,
    pub mdmclient: PathBuf,
}

impl std::fmt::Debug for ReporterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReporterConfig")
            .field("interval", &self.interval)
            .field("server_url", &self.server_url.as_str())
            .field("probe_timeout", &self.probe_timeout)
            .field("delivery_timeout", &self.delivery_timeout)
            .field("mdmclient", &self.mdmclient)
            .finish_non_exhaustive()
    }
}

impl TryFrom<ReporterArgs> for ReporterConfig {
    type Error = Error;

    fn try_from(args: ReporterArgs) -> Result<Self> {
        let server_url = args
            .server_url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| Error::Configuration("--server.url is required".into()))?;
        let server_url = Url::parse(&server_url)
            .map_err(|e| Error::Configuration(format!("invalid --server.url '{server_url}': {e}")))?;

        let auth_token = args
            .auth_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Configuration("--server.auth_token is required".into()))?;

        Ok(Self {
            interval: args.interval,
            server_url,
            auth_token,
            probe_timeout: args.probe_timeout,
            delivery_timeout: args.delivery_timeout,
            mdmclient: args.mdmclient,
        })
    }
}

/// Parse a duration string like "30s", "25m", "1h" or "2d"
///
/// Zero is rejected.
pub fn parse_interval(interval: &str) -> std::result::Result<Duration, String> {
    let interval = interval.trim().to_lowercase();
    let len = interval.len();
    if len < 2 {
        return Err(format!("invalid duration '{interval}'"));
    }

    let (num_str, unit) = interval.split_at(len - 1);
    let num: u64 = num_str
        .parse()
        .map_err(|_| format!("invalid duration '{interval}'"))?;

    let unit_secs: u64 = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 3_600,
        "d" => 86_400,
        _ => return Err(format!("unknown duration unit in '{interval}' (use s, m, h or d)")),
    };
    let secs = num
        .checked_mul(unit_secs)
        .ok_or_else(|| format!("duration '{interval}' is too large"))?;

    if secs == 0 {
        return Err("duration must be positive".to_string());
    }
    Ok(Duration::from_secs(secs))
}
