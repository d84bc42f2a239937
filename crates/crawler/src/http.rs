//! Live marketplace sessions over plain HTTP.
//!
//! Pages are fetched with a blocking `reqwest` client and parsed with
//! `scraper`. "Scrolling" loads the next result page of the landing URL.
//! Only extracted links are kept in memory, never parsed documents.

use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use matcher::ListingRecord;
use reqwest::blocking::Client;

use crate::config::{CrawlerConfig, SessionOptions};
use crate::error::CrawlError;
use crate::extract::{extract_listing, extract_listing_links};
use crate::session::{
    collect_with_scrolls, Browser, BrowsingSession, LinkCollector, LinkLimits, ListingFetcher,
};
use crate::urls::with_page_number;

/// Opens [`HttpSession`]s.
///
/// The blocking client is built inside [`Browser::open_session`], which runs
/// on the search worker thread, never on an async executor thread.
#[derive(Debug, Clone)]
pub struct HttpBrowser {
    config: CrawlerConfig,
}

impl HttpBrowser {
    pub fn new(config: CrawlerConfig) -> Result<Self, CrawlError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }
}

impl Browser for HttpBrowser {
    fn open_session(
        &self,
        options: &SessionOptions,
    ) -> Result<Box<dyn BrowsingSession>, CrawlError> {
        let client = Client::builder()
            .user_agent(self.config.user_agent.clone())
            .connect_timeout(self.config.connect_timeout())
            .gzip(true)
            .build()
            .map_err(|e| CrawlError::SessionOpen(e.to_string()))?;

        tracing::debug!(
            headless = options.headless,
            slowmo_ms = options.slowmo_ms,
            "http session opened"
        );
        Ok(Box::new(HttpSession {
            client: Some(client),
            config: self.config.clone(),
            slowmo: Duration::from_millis(options.slowmo_ms),
            last_request: None,
            landing: None,
        }))
    }
}

/// The loaded landing page: its URL and the links of every page seen so far.
#[derive(Debug)]
struct LandingPage {
    url: String,
    pages: Vec<Vec<String>>,
    exhausted: bool,
}

pub struct HttpSession {
    client: Option<Client>,
    config: CrawlerConfig,
    slowmo: Duration,
    last_request: Option<Instant>,
    landing: Option<LandingPage>,
}

enum FetchFailure {
    Timeout,
    Other(String),
}

impl HttpSession {
    fn pace(&mut self) {
        if !self.slowmo.is_zero() {
            if let Some(last) = self.last_request {
                let elapsed = last.elapsed();
                if elapsed < self.slowmo {
                    thread::sleep(self.slowmo - elapsed);
                }
            }
        }
        self.last_request = Some(Instant::now());
    }

    fn get(&mut self, url: &str, timeout: Duration) -> Result<String, FetchFailure> {
        self.pace();
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| FetchFailure::Other("session closed".into()))?;

        let response = client
            .get(url)
            .timeout(timeout)
            .send()
            .and_then(|resp| resp.error_for_status())
            .map_err(classify)?;
        response.text().map_err(classify)
    }

    /// Load the next result page. Returns `false` once no further page yields links.
    fn scroll(&mut self) -> bool {
        let Some(landing) = self.landing.as_ref() else {
            return false;
        };
        if landing.exhausted {
            return false;
        }

        let next_page = landing.pages.len() as u32 + 1;
        let base = landing.url.clone();
        let next_url = match with_page_number(&base, next_page) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(url = %base, error = %e, "cannot build next page url");
                self.mark_exhausted();
                return false;
            }
        };

        let timeout = self.config.navigation_timeout();
        match self.get(&next_url, timeout) {
            Ok(html) => {
                let links = extract_listing_links(&html, &next_url);
                let found = !links.is_empty();
                if let Some(landing) = self.landing.as_mut() {
                    landing.pages.push(links);
                    landing.exhausted = !found;
                }
                found
            }
            Err(failure) => {
                tracing::warn!(url = %next_url, error = %failure.describe(), "next page load failed");
                self.mark_exhausted();
                false
            }
        }
    }

    fn mark_exhausted(&mut self) {
        if let Some(landing) = self.landing.as_mut() {
            landing.exhausted = true;
        }
    }
}

impl FetchFailure {
    fn describe(&self) -> String {
        match self {
            FetchFailure::Timeout => "timed out".to_string(),
            FetchFailure::Other(reason) => reason.clone(),
        }
    }
}

fn classify(err: reqwest::Error) -> FetchFailure {
    if err.is_timeout() {
        FetchFailure::Timeout
    } else {
        FetchFailure::Other(err.to_string())
    }
}

impl LinkCollector for HttpSession {
    fn collect_links(&mut self, limits: &LinkLimits) -> Result<Vec<String>, CrawlError> {
        if self.client.is_none() {
            return Err(CrawlError::Closed);
        }
        if self.landing.is_none() {
            return Err(CrawlError::Collect("no page loaded".into()));
        }

        Ok(collect_with_scrolls(
            limits,
            self,
            |session| {
                session
                    .landing
                    .as_ref()
                    .map(|landing| landing.pages.iter().flatten().cloned().collect())
                    .unwrap_or_default()
            },
            HttpSession::scroll,
        ))
    }
}

impl ListingFetcher for HttpSession {
    fn fetch_listing(&mut self, url: &str) -> Option<ListingRecord> {
        let timeout = self.config.fetch_timeout();
        match self.get(url, timeout) {
            Ok(html) => Some(extract_listing(&html, url, Utc::now())),
            Err(failure) => {
                tracing::warn!(url, error = %failure.describe(), "listing fetch failed");
                None
            }
        }
    }
}

impl BrowsingSession for HttpSession {
    fn navigate(&mut self, url: &str) -> Result<(), CrawlError> {
        let timeout = self.config.navigation_timeout();
        let html = self.get(url, timeout).map_err(|failure| match failure {
            FetchFailure::Timeout => CrawlError::Timeout {
                url: url.to_string(),
                after: timeout,
            },
            FetchFailure::Other(reason) => CrawlError::Navigation {
                url: url.to_string(),
                reason,
            },
        })?;

        let links = extract_listing_links(&html, url);
        tracing::debug!(url, links = links.len(), "landing page loaded");
        self.landing = Some(LandingPage {
            url: url.to_string(),
            pages: vec![links],
            exhausted: false,
        });
        Ok(())
    }

    fn close(&mut self) {
        self.landing = None;
        self.client = None;
    }
}
