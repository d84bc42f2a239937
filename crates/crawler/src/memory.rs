//! In-memory catalog sessions.
//!
//! A [`MemoryCatalog`] scripts what a marketplace would show: for each page
//! URL, one batch of links per scroll position, plus the listing record behind
//! each product URL. It replays recorded crawls in the CLI and drives the
//! search scenarios in tests.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use matcher::ListingRecord;
use serde::{Deserialize, Serialize};

use crate::config::SessionOptions;
use crate::error::CrawlError;
use crate::session::{
    collect_with_scrolls, Browser, BrowsingSession, LinkCollector, LinkLimits, ListingFetcher,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryCatalog {
    /// Page URL to link batches. Batch `n` becomes visible after `n` scrolls.
    #[serde(default)]
    pub pages: HashMap<String, Vec<Vec<String>>>,
    /// Product URL to listing. Unknown URLs fetch as `None`.
    #[serde(default)]
    pub listings: HashMap<String, ListingRecord>,
    /// Page URLs whose navigation fails.
    #[serde(default)]
    pub failing_pages: HashSet<String>,
    /// When set, opening a session fails with this message.
    #[serde(default)]
    pub open_error: Option<String>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, CrawlError> {
        serde_json::from_str(json).map_err(|e| CrawlError::Catalog(e.to_string()))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CrawlError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| CrawlError::Catalog(format!("{}: {e}", path.display())))?;
        Self::from_json(&raw)
    }

    /// Add a page whose link batches appear one scroll at a time.
    pub fn with_page<I, B, S>(mut self, url: impl Into<String>, batches: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let batches = batches
            .into_iter()
            .map(|batch| batch.into_iter().map(Into::into).collect())
            .collect();
        self.pages.insert(url.into(), batches);
        self
    }

    pub fn with_listing(mut self, record: ListingRecord) -> Self {
        self.listings.insert(record.url.clone(), record);
        self
    }

    pub fn with_failing_page(mut self, url: impl Into<String>) -> Self {
        self.failing_pages.insert(url.into());
        self
    }

    pub fn with_open_error(mut self, message: impl Into<String>) -> Self {
        self.open_error = Some(message.into());
        self
    }
}

/// Session lifecycle counters, shared between a browser and its sessions.
#[derive(Debug, Clone, Default)]
pub struct SessionCounters {
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
    fetched: Arc<AtomicUsize>,
}

impl SessionCounters {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn fetched(&self) -> usize {
        self.fetched.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct MemoryBrowser {
    catalog: Arc<MemoryCatalog>,
    counters: SessionCounters,
}

impl MemoryBrowser {
    pub fn new(catalog: MemoryCatalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
            counters: SessionCounters::default(),
        }
    }

    pub fn counters(&self) -> SessionCounters {
        self.counters.clone()
    }
}

impl Browser for MemoryBrowser {
    fn open_session(
        &self,
        _options: &SessionOptions,
    ) -> Result<Box<dyn BrowsingSession>, CrawlError> {
        if let Some(message) = &self.catalog.open_error {
            return Err(CrawlError::SessionOpen(message.clone()));
        }
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySession {
            catalog: Arc::clone(&self.catalog),
            counters: self.counters.clone(),
            page: None,
            closed: false,
        }))
    }
}

struct LoadedPage {
    batches: Vec<Vec<String>>,
    revealed: usize,
}

pub struct MemorySession {
    catalog: Arc<MemoryCatalog>,
    counters: SessionCounters,
    page: Option<LoadedPage>,
    closed: bool,
}

impl LinkCollector for MemorySession {
    fn collect_links(&mut self, limits: &LinkLimits) -> Result<Vec<String>, CrawlError> {
        if self.closed {
            return Err(CrawlError::Closed);
        }
        let page = self
            .page
            .as_mut()
            .ok_or_else(|| CrawlError::Collect("no page loaded".into()))?;

        Ok(collect_with_scrolls(
            limits,
            page,
            |page| {
                page.batches
                    .iter()
                    .take(page.revealed)
                    .flatten()
                    .cloned()
                    .collect()
            },
            |page| {
                if page.revealed < page.batches.len() {
                    page.revealed += 1;
                    true
                } else {
                    false
                }
            },
        ))
    }
}

impl ListingFetcher for MemorySession {
    fn fetch_listing(&mut self, url: &str) -> Option<ListingRecord> {
        if self.closed {
            return None;
        }
        self.counters.fetched.fetch_add(1, Ordering::SeqCst);
        let record = self.catalog.listings.get(url).cloned();
        if record.is_none() {
            tracing::warn!(url, "listing not in catalog");
        }
        record
    }
}

impl BrowsingSession for MemorySession {
    fn navigate(&mut self, url: &str) -> Result<(), CrawlError> {
        if self.closed {
            return Err(CrawlError::Closed);
        }
        if self.catalog.failing_pages.contains(url) {
            return Err(CrawlError::Navigation {
                url: url.to_string(),
                reason: "scripted failure".into(),
            });
        }
        let batches = self.catalog.pages.get(url).cloned().unwrap_or_default();
        self.page = Some(LoadedPage {
            revealed: batches.len().min(1),
            batches,
        });
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.page = None;
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ScopedSession;

    const PAGE: &str = "https://shop.test/seller/";

    fn product(i: usize) -> String {
        format!("https://shop.test/products/{i}/")
    }

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::new()
            .with_page(
                PAGE,
                vec![
                    vec![product(1), product(2)],
                    vec![product(2), product(3)],
                    vec![product(4)],
                ],
            )
            .with_listing(ListingRecord::new(product(1), "p2p 22"))
    }

    #[test]
    fn scrolls_reveal_batches() {
        let browser = MemoryBrowser::new(catalog());
        let mut session = ScopedSession::open(&browser, &SessionOptions::default()).unwrap();
        session.navigate(PAGE).unwrap();

        let first = session.collect_links(&LinkLimits::new(1, None)).unwrap();
        assert_eq!(first, vec![product(1), product(2)]);

        let all = session.collect_links(&LinkLimits::new(8, None)).unwrap();
        assert_eq!(all, (1..=4).map(product).collect::<Vec<_>>());
    }

    #[test]
    fn fetch_hits_and_misses() {
        let browser = MemoryBrowser::new(catalog());
        let mut session = ScopedSession::open(&browser, &SessionOptions::default()).unwrap();
        assert_eq!(
            session.fetch_listing(&product(1)).map(|r| r.description),
            Some("p2p 22".to_string())
        );
        assert!(session.fetch_listing(&product(9)).is_none());
        assert_eq!(browser.counters().fetched(), 2);
    }

    #[test]
    fn scripted_failures() {
        let browser = MemoryBrowser::new(catalog().with_failing_page(PAGE));
        let mut session = ScopedSession::open(&browser, &SessionOptions::default()).unwrap();
        assert!(matches!(
            session.navigate(PAGE),
            Err(CrawlError::Navigation { .. })
        ));

        let browser = MemoryBrowser::new(catalog().with_open_error("no browser"));
        assert!(ScopedSession::open(&browser, &SessionOptions::default()).is_err());
        assert_eq!(browser.counters().opened(), 0);
    }

    #[test]
    fn counters_track_lifecycle() {
        let browser = MemoryBrowser::new(catalog());
        let counters = browser.counters();
        {
            let _a = ScopedSession::open(&browser, &SessionOptions::default()).unwrap();
            let _b = ScopedSession::open(&browser, &SessionOptions::default()).unwrap();
        }
        assert_eq!(counters.opened(), 2);
        assert_eq!(counters.closed(), 2);
    }

    #[test]
    fn catalog_loads_from_json_file() {
        let json = r#"{
            "pages": {"https://shop.test/seller/": [["https://shop.test/products/1/"]]},
            "listings": {
                "https://shop.test/products/1/": {
                    "url": "https://shop.test/products/1/",
                    "description": "chest 20",
                    "soldCount": 80
                }
            }
        }"#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, json).unwrap();

        let catalog = MemoryCatalog::from_path(&path).unwrap();
        assert_eq!(catalog.pages[PAGE].len(), 1);
        assert_eq!(catalog.listings[&product(1)].sold_count, Some(80));
        assert!(MemoryCatalog::from_json("{not json").is_err());
    }
}
