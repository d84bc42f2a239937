use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by a browsing session.
///
/// Listing fetches never produce these; a failed fetch is `None`. Everything
/// here is fatal to the run that hit it.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CrawlError {
    #[error("failed to open browsing session: {0}")]
    SessionOpen(String),
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },
    #[error("navigation to {url} timed out after {}s", .after.as_secs())]
    Timeout { url: String, after: Duration },
    #[error("link collection failed: {0}")]
    Collect(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("catalog error: {0}")]
    Catalog(String),
    #[error("session used after close")]
    Closed,
}
