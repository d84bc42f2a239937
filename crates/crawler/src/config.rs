//! Crawler configuration.
//!
//! Every field carries a serde default so partial YAML/TOML sections and
//! `FITSCAN_SERVER__CRAWLER__*` overrides deserialize cleanly.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CrawlError;

/// Marketplace root used to resolve seller handles and relative links.
pub const DEFAULT_BASE_URL: &str = "https://www.depop.com/";

/// Newest men's tops, the global browse feed.
pub const DEFAULT_BROWSE_URL: &str =
    "https://www.depop.com/ca/category/mens/tops/?sort=newlyListed";

/// Firefox desktop user agent sent with every request.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_browse_url")]
    pub browse_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Landing-page load limit. Exceeding it fails the run.
    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,
    /// Per-listing load limit. Exceeding it skips the listing.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_browse_url() -> String {
    DEFAULT_BROWSE_URL.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_navigation_timeout_ms() -> u64 {
    60_000
}

fn default_fetch_timeout_ms() -> u64 {
    30_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            browse_url: default_browse_url(),
            user_agent: default_user_agent(),
            navigation_timeout_ms: default_navigation_timeout_ms(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl CrawlerConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), CrawlError> {
        for (name, value) in [("base_url", &self.base_url), ("browse_url", &self.browse_url)] {
            url::Url::parse(value)
                .map_err(|e| CrawlError::InvalidUrl(format!("{name} `{value}`: {e}")))?;
        }
        if self.navigation_timeout_ms == 0 || self.fetch_timeout_ms == 0 {
            return Err(CrawlError::SessionOpen(
                "timeouts must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Per-run session knobs taken from the search request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOptions {
    /// Run without a visible window. Implementations without a window ignore it.
    pub headless: bool,
    /// Delay inserted before each request, in milliseconds.
    pub slowmo_ms: u64,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            headless: true,
            slowmo_ms: 0,
        }
    }
}
