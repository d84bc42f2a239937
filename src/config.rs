//! YAML profile support for the fitscan CLI.
//!
//! One file carries the search defaults and the crawler settings, so a run
//! can be repeated against the same marketplace limits.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "slow and polite"
//!
//! search:
//!   default_p2p_tolerance: 1.0
//!   default_length_tolerance: 0.5
//!   default_max_items: 20
//!   default_max_scrolls: 4
//!   default_slowmo_ms: 250
//!
//! crawler:
//!   navigation_timeout_ms: 60000
//!   fetch_timeout_ms: 30000
//!
//! # Optional: run against a saved catalog instead of the live site
//! catalog: "fixtures/catalog.json"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crawler::CrawlerConfig;
use serde::{Deserialize, Serialize};
use stream::SearchSettings;
use thiserror::Error;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level YAML profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FitscanConfig {
    /// Configuration format version
    pub version: String,

    /// Optional profile name
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub search: SearchSettings,

    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// JSON catalog to search instead of the live marketplace
    #[serde(default)]
    pub catalog: Option<PathBuf>,
}

impl FitscanConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: FitscanConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.search
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("search: {e}")))?;
        self.crawler
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("crawler: {e}")))?;

        Ok(())
    }
}

impl Default for FitscanConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            search: SearchSettings::default(),
            crawler: CrawlerConfig::default(),
            catalog: None,
        }
    }
}
