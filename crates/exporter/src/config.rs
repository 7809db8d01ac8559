//! Exporter configuration

use anyhow::{bail, Context, Result};
use exporter_lib::reason::{ReasonMode, DEFAULT_REASON};
use exporter_lib::aggregation::DEFAULT_POOL;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Environment variable prefix (`TE_API_URL`, `TE_API_LOGIN`, ...)
pub const ENV_PREFIX: &str = "TE";

/// Paths served by the exporter itself
const RESERVED_PATHS: [&str; 3] = ["/", "/healthz", "/readyz"];

/// Exporter configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExporterConfig {
    /// Address to listen on; a leading `:` means all interfaces
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Path the metrics are served on
    #[serde(default = "default_metric_path")]
    pub metric_path: String,

    /// TeamCity user
    #[serde(default)]
    pub api_login: String,

    /// TeamCity password
    #[serde(default)]
    pub api_password: String,

    /// TeamCity base URL
    #[serde(default)]
    pub api_url: String,

    /// Lower the default log level to debug
    #[serde(default)]
    pub debug: bool,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Abandon scrapes running longer than this many seconds
    #[serde(default)]
    pub scrape_deadline_secs: Option<u64>,

    /// Wait-reason label policy
    #[serde(default)]
    pub reason_mode: ReasonMode,

    /// Reason used for queued builds reporting none
    #[serde(default = "default_reason")]
    pub default_reason: String,

    /// Pool label for agents without a pool name
    #[serde(default = "default_pool")]
    pub default_pool: String,

    /// Track Windows/Linux/macOS availability per queued build
    #[serde(default = "default_true")]
    pub queue_os_flags: bool,

    /// Export the agent fleet table
    #[serde(default = "default_true")]
    pub fleet_metrics: bool,
}

fn default_listen_address() -> String {
    ":9190".to_string()
}

fn default_metric_path() -> String {
    "/metrics".to_string()
}

fn default_request_timeout() -> u64 {
    5
}

fn default_reason() -> String {
    DEFAULT_REASON.to_string()
}

fn default_pool() -> String {
    DEFAULT_POOL.to_string()
}

fn default_true() -> bool {
    true
}

impl ExporterConfig {
    /// Load configuration from the process environment
    pub fn load() -> Result<Self> {
        Self::from_environment(config::Environment::with_prefix(ENV_PREFIX))
    }

    /// Load configuration from an explicit variable map
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self> {
        Self::from_environment(config::Environment::with_prefix(ENV_PREFIX).source(Some(vars)))
    }

    fn from_environment(environment: config::Environment) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(environment)
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    /// Reject configurations the exporter cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.listen_address.is_empty() {
            bail!("Listen address must be defined");
        }
        if self.metric_path.is_empty() {
            bail!("Metric path must be defined");
        }
        if !self.metric_path.starts_with('/') {
            bail!("Metric path must start with '/'");
        }
        if RESERVED_PATHS.contains(&self.metric_path.as_str()) {
            bail!("Metric path {} is reserved", self.metric_path);
        }
        if self.api_login.is_empty() {
            bail!("API login must be defined");
        }
        if self.api_password.is_empty() {
            bail!("API password must be defined");
        }
        if self.api_url.is_empty() {
            bail!("API URL must be defined");
        }
        if self.request_timeout_secs == 0 {
            bail!("Request timeout must be at least one second");
        }
        self.api_url()?;
        Ok(())
    }

    /// Parsed TeamCity base URL
    pub fn api_url(&self) -> Result<Url> {
        Url::parse(&self.api_url).with_context(|| format!("Can't parse API URL {}", self.api_url))
    }

    /// Address in a form the listener accepts
    pub fn socket_address(&self) -> String {
        if self.listen_address.starts_with(':') {
            format!("0.0.0.0{}", self.listen_address)
        } else {
            self.listen_address.clone()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn scrape_deadline(&self) -> Option<Duration> {
        self.scrape_deadline_secs.map(Duration::from_secs)
    }
}
