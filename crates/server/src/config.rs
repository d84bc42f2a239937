use crawler::CrawlerConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use stream::SearchSettings;

use crate::error::ServerError;

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Server bind address
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds. Streaming search responses are exempt.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum request body size in MB
    #[serde(default = "default_max_body_size_mb")]
    pub max_body_size_mb: usize,

    /// Interval between SSE keep-alive comments
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Metrics endpoint enabled
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,

    /// Serve searches from a JSON catalog instead of the live marketplace
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,

    /// Per-request defaults and limits
    #[serde(default)]
    pub search: SearchSettings,

    /// Marketplace access
    #[serde(default)]
    pub crawler: CrawlerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            max_body_size_mb: default_max_body_size_mb(),
            keep_alive_secs: default_keep_alive_secs(),
            enable_cors: default_true(),
            log_level: default_log_level(),
            metrics_enabled: default_true(),
            catalog_path: None,
            search: SearchSettings::default(),
            crawler: CrawlerConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from `.env`, an optional `server.{toml,yaml,json}`
    /// file and `FITSCAN_SERVER__*` environment variables, in that order.
    pub fn load() -> anyhow::Result<Self> {
        // A missing .env is fine
        let _ = dotenvy::dotenv();

        let builder = config::Config::builder()
            .add_source(config::File::with_name("server").required(false))
            .add_source(config::Environment::with_prefix("FITSCAN_SERVER").separator("__"));

        let config: ServerConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check nested sections and limits
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.timeout_secs == 0 {
            return Err(ServerError::Config("timeout_secs must be > 0".into()));
        }
        if self.keep_alive_secs == 0 {
            return Err(ServerError::Config("keep_alive_secs must be > 0".into()));
        }
        self.search
            .validate()
            .map_err(|e| ServerError::Config(format!("search: {e}")))?;
        self.crawler
            .validate()
            .map_err(|e| ServerError::Config(format!("crawler: {e}")))?;
        Ok(())
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.bind_addr, self.port);
        Ok(addr_str.parse()?)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    /// Get max body size in bytes
    pub fn max_body_size(&self) -> usize {
        self.max_body_size_mb * 1024 * 1024
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_body_size_mb() -> usize {
    1
}

fn default_keep_alive_secs() -> u64 {
    15
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}
