use crate::config::ServerConfig;
use crate::error::ServerResult;
use crawler::{Browser, HttpBrowser, MemoryBrowser, MemoryCatalog};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use stream::{CancellationRegistry, SearchCoordinator};

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Runs searches; owns the browser and the cancellation registry
    pub coordinator: Arc<SearchCoordinator>,

    /// Renders `/metrics` once a Prometheus recorder is installed
    pub prometheus: Option<PrometheusHandle>,
}

impl ServerState {
    /// Create server state, picking the browser from the configuration:
    /// a JSON catalog when `catalog_path` is set, the live marketplace otherwise.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let browser: Arc<dyn Browser> = match &config.catalog_path {
            Some(path) => {
                tracing::info!(path = %path.display(), "serving searches from catalog file");
                Arc::new(MemoryBrowser::new(MemoryCatalog::from_path(path)?))
            }
            None => Arc::new(HttpBrowser::new(config.crawler.clone())?),
        };
        Ok(Self::with_browser(config, browser))
    }

    /// Create server state around an existing browser
    pub fn with_browser(config: ServerConfig, browser: Arc<dyn Browser>) -> Self {
        let registry = Arc::new(CancellationRegistry::from_settings(&config.search));
        let coordinator = Arc::new(SearchCoordinator::new(
            browser,
            registry,
            config.crawler.clone(),
            config.search.clone(),
        ));

        Self {
            config: Arc::new(config),
            coordinator,
            prometheus: None,
        }
    }

    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }

    pub fn registry(&self) -> &Arc<CancellationRegistry> {
        self.coordinator.registry()
    }
}

/// Server metadata for health checks
#[derive(Debug, serde::Serialize)]
pub struct ServerMetadata {
    pub version: String,
    pub uptime_seconds: u64,
    pub active_searches: usize,
}
