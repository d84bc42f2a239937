//! # Listing Crawler (`crawler`)
//!
//! The boundary between a search run and the marketplace it browses.
//!
//! A run asks a [`Browser`] for one [`BrowsingSession`], wraps it in a
//! [`ScopedSession`] so it is closed exactly once, navigates to a
//! [`CatalogTarget`], collects candidate links with [`LinkCollector`] and
//! fetches each listing with [`ListingFetcher`].
//!
//! Two implementations ship with the crate:
//!
//! - [`HttpBrowser`]: live pages over a blocking `reqwest` client, parsed with
//!   `scraper`. Landing-page navigation is bounded by
//!   [`CrawlerConfig::navigation_timeout_ms`] and fails the run; listing
//!   fetches are bounded by [`CrawlerConfig::fetch_timeout_ms`] and are skipped.
//! - [`MemoryBrowser`]: a scripted [`MemoryCatalog`], loadable from JSON, used
//!   for replays and tests.
//!
//! All session calls block. Callers run them off the async executor.
//!
//! ```rust
//! use crawler::{
//!     Browser, LinkLimits, MemoryBrowser, MemoryCatalog, ScopedSession, SessionOptions,
//! };
//!
//! let catalog = MemoryCatalog::new().with_page(
//!     "https://shop.test/seller/",
//!     vec![vec!["https://shop.test/products/1/"]],
//! );
//! let browser = MemoryBrowser::new(catalog);
//! let mut session = ScopedSession::open(&browser, &SessionOptions::default()).unwrap();
//! session.navigate("https://shop.test/seller/").unwrap();
//! let links = session.collect_links(&LinkLimits::new(8, None)).unwrap();
//! assert_eq!(links, vec!["https://shop.test/products/1/".to_string()]);
//! ```

mod config;
mod error;
mod extract;
mod http;
mod memory;
mod session;
mod time;
mod urls;

pub use crate::config::{
    CrawlerConfig, SessionOptions, DEFAULT_BASE_URL, DEFAULT_BROWSE_URL, DEFAULT_USER_AGENT,
};
pub use crate::error::CrawlError;
pub use crate::extract::{extract_listing, extract_listing_links};
pub use crate::http::{HttpBrowser, HttpSession};
pub use crate::memory::{MemoryBrowser, MemoryCatalog, MemorySession, SessionCounters};
pub use crate::session::{
    Browser, BrowsingSession, LinkCollector, LinkLimits, ListingFetcher, ScopedSession,
};
pub use crate::time::{age_days_from, parse_iso_datetime, parse_relative_time};
pub use crate::urls::{normalize_seller_handle, seller_catalog_url, CatalogTarget};
