//! Workspace umbrella crate for fitscan.
//!
//! Re-exports the pipeline stages so callers can go from a listing
//! description to a cancellable stream of matches with one dependency:
//!
//! - [`measure`]: description text to a [`MeasurementPair`] in inches
//! - [`matcher`]: measurement pair against targets and tolerances
//! - [`crawler`]: browsing sessions over the live marketplace or a saved catalog
//! - [`stream`]: request validation, cancellation and the search coordinator
//!
//! ```rust
//! use fitscan::{within, MeasurementParser};
//!
//! let pair = MeasurementParser::new().extract("pit to pit 21 inches, length 28");
//! assert_eq!(pair.p2p, Some(21.0));
//! assert!(within(pair.length, Some(28.4), 0.5));
//! ```

pub mod config;

use std::sync::Arc;

pub use crawler;
pub use matcher;
pub use measure;
pub use stream;

pub use crawler::{
    Browser, CatalogTarget, CrawlError, CrawlerConfig, HttpBrowser, MemoryBrowser, MemoryCatalog,
    SessionOptions,
};
pub use matcher::{
    ListingRecord, MatchConfig, MatchError, MatchOutcome, MatchResult, Matcher, ToleranceSpec,
};
pub use measure::{within, MeasurementPair, MeasurementParser};
pub use stream::{
    CancellationRegistry, EventKind, EventSink, FnSink, SearchCoordinator, SearchEvent,
    SearchOutcome, SearchRequest, SearchSettings, Terminal, Validated, ValidatedSearch,
};

pub use crate::config::{ConfigLoadError, FitscanConfig};

/// Browser described by a profile: the saved catalog when one is named, the
/// live marketplace otherwise.
pub fn browser_for(config: &FitscanConfig) -> Result<Arc<dyn Browser>, CrawlError> {
    match &config.catalog {
        Some(path) => Ok(Arc::new(MemoryBrowser::new(MemoryCatalog::from_path(path)?))),
        None => Ok(Arc::new(HttpBrowser::new(config.crawler.clone())?)),
    }
}

/// Coordinator over `browser` with a fresh cancellation registry.
pub fn coordinator_for(config: &FitscanConfig, browser: Arc<dyn Browser>) -> SearchCoordinator {
    let registry = Arc::new(CancellationRegistry::from_settings(&config.search));
    SearchCoordinator::new(
        browser,
        registry,
        config.crawler.clone(),
        config.search.clone(),
    )
}
