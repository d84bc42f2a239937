//! The collaborator boundary between a search run and the marketplace.
//!
//! A run owns exactly one [`BrowsingSession`] for its whole lifetime. The
//! session is sequential and blocking; it is never shared between runs.

use std::collections::HashSet;
use std::ops::{Deref, DerefMut};

use matcher::ListingRecord;

use crate::config::SessionOptions;
use crate::error::CrawlError;

/// Bounds for one link collection call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkLimits {
    /// Scroll passes, each one a scan of the visible links followed by a scroll.
    pub max_scrolls: u32,
    /// Stop as soon as this many unique links are known. `None` or zero is unbounded.
    pub max_links: Option<usize>,
}

impl LinkLimits {
    pub fn new(max_scrolls: u32, max_links: Option<usize>) -> Self {
        Self {
            max_scrolls,
            max_links,
        }
    }

    /// A single scan-and-scroll pass with no link cap.
    pub fn single_pass() -> Self {
        Self::new(1, None)
    }
}

pub trait LinkCollector {
    /// Ordered, deduplicated listing URLs visible on the loaded page.
    fn collect_links(&mut self, limits: &LinkLimits) -> Result<Vec<String>, CrawlError>;
}

pub trait ListingFetcher {
    /// Best-effort fetch of one listing. Failures and timeouts yield `None`.
    ///
    /// Must leave the page that links are collected from untouched.
    fn fetch_listing(&mut self, url: &str) -> Option<ListingRecord>;
}

pub trait BrowsingSession: LinkCollector + ListingFetcher + Send {
    /// Load the landing page. Failure is fatal to the run.
    fn navigate(&mut self, url: &str) -> Result<(), CrawlError>;

    /// Release the session. Called once by [`ScopedSession`].
    fn close(&mut self);
}

/// Factory for browsing sessions, shared across runs.
pub trait Browser: Send + Sync {
    fn open_session(&self, options: &SessionOptions)
        -> Result<Box<dyn BrowsingSession>, CrawlError>;
}

/// Owns one session and closes it exactly once when dropped.
pub struct ScopedSession {
    inner: Box<dyn BrowsingSession>,
    closed: bool,
}

impl ScopedSession {
    pub fn new(inner: Box<dyn BrowsingSession>) -> Self {
        Self {
            inner,
            closed: false,
        }
    }

    /// Open a session from `browser` and wrap it.
    pub fn open(browser: &dyn Browser, options: &SessionOptions) -> Result<Self, CrawlError> {
        browser.open_session(options).map(Self::new)
    }

    /// Close now instead of at end of scope.
    pub fn close(mut self) {
        self.close_once();
    }

    fn close_once(&mut self) {
        if !self.closed {
            self.closed = true;
            self.inner.close();
            tracing::debug!("browsing session closed");
        }
    }
}

impl Deref for ScopedSession {
    type Target = dyn BrowsingSession;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl DerefMut for ScopedSession {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.inner.as_mut()
    }
}

impl Drop for ScopedSession {
    fn drop(&mut self) {
        self.close_once();
    }
}

/// Shared scan-then-scroll loop behind both session implementations.
///
/// `scan` returns every link currently visible on `page`, `scroll` reveals
/// more content and reports whether anything new may have appeared. A pass
/// that adds no new link ends collection early.
pub(crate) fn collect_with_scrolls<P, S, R>(
    limits: &LinkLimits,
    page: &mut P,
    scan: S,
    mut scroll: R,
) -> Vec<String>
where
    S: Fn(&P) -> Vec<String>,
    R: FnMut(&mut P) -> bool,
{
    let cap = limits.max_links.filter(|&n| n > 0);
    let mut seen = HashSet::new();
    let mut ordered = Vec::new();

    for pass in 0..limits.max_scrolls.max(1) {
        let before = ordered.len();
        for href in scan(page) {
            if seen.insert(href.clone()) {
                ordered.push(href);
                if cap.is_some_and(|cap| ordered.len() >= cap) {
                    return ordered;
                }
            }
        }

        if pass > 0 && ordered.len() == before {
            break;
        }
        if !scroll(page) {
            break;
        }
    }

    ordered
}
