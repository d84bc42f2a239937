//! The streaming search state machine.
//!
//! ```text
//! Starting -> LandingPage -> CollectingLinks -> Iterating -> Done
//!                  |                |               |    \-> Cancelled
//!                  +----------------+---------------+------> Error
//! ```
//!
//! A run is blocking and sequential. It owns one browsing session for its
//! whole life and reports through an [`EventSink`]. Exactly one terminal event
//! is emitted, always last. The session and the cancellation registration are
//! released by guards on every exit path.

use std::collections::HashSet;
use std::sync::Arc;

use crawler::{
    Browser, BrowsingSession, CatalogTarget, CrawlerConfig, LinkLimits, ScopedSession,
};
use matcher::{MatchConfig, MatchOutcome, Matcher};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::events::{EventKind, Phase, SearchEvent};
use crate::registry::CancellationRegistry;
use crate::request::ValidatedSearch;
use crate::settings::SearchSettings;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("event consumer is gone")]
pub struct SinkClosed;

/// Where a run delivers its events, in order.
pub trait EventSink {
    fn emit(&mut self, event: SearchEvent) -> Result<(), SinkClosed>;
}

impl EventSink for Vec<SearchEvent> {
    fn emit(&mut self, event: SearchEvent) -> Result<(), SinkClosed> {
        self.push(event);
        Ok(())
    }
}

/// Sink over a bounded channel. Blocks while the channel is full.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<SearchEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<SearchEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn emit(&mut self, event: SearchEvent) -> Result<(), SinkClosed> {
        self.tx.blocking_send(event).map_err(|_| SinkClosed)
    }
}

/// Sink that hands each event to a closure.
pub struct FnSink<F>(pub F);

impl<F> EventSink for FnSink<F>
where
    F: FnMut(SearchEvent) -> Result<(), SinkClosed>,
{
    fn emit(&mut self, event: SearchEvent) -> Result<(), SinkClosed> {
        (self.0)(event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    Done,
    Cancelled,
    Error,
}

impl Terminal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Terminal::Done => "done",
            Terminal::Cancelled => "cancelled",
            Terminal::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOutcome {
    pub terminal: Terminal,
    pub processed: usize,
    pub matches: usize,
}

/// Why a run stopped before exhausting its links.
enum Halt {
    Cancelled,
    Fatal(String),
    /// The sink refused an event; nothing more can be delivered.
    Disconnected,
    /// `maxItems` reached.
    Satisfied,
}

/// Per-run bookkeeping.
struct Run<'a> {
    sink: &'a mut dyn EventSink,
    registry: &'a CancellationRegistry,
    search_id: Option<&'a str>,
    processed: usize,
    matches: usize,
}

impl Run<'_> {
    fn emit(&mut self, kind: EventKind) -> Result<(), Halt> {
        let event = SearchEvent::new(kind, self.search_id);
        self.sink.emit(event).map_err(|SinkClosed| {
            if let Some(id) = self.search_id {
                self.registry.cancel(id);
            }
            tracing::info!("consumer disconnected");
            Halt::Disconnected
        })
    }

    fn checkpoint(&self) -> Result<(), Halt> {
        match self.search_id {
            Some(id) if self.registry.is_cancelled(id) => Err(Halt::Cancelled),
            _ => Ok(()),
        }
    }

    fn progress(&mut self, phase: Option<Phase>, total: Option<usize>) -> Result<(), Halt> {
        self.emit(EventKind::Progress {
            phase,
            processed: self.processed,
            total,
            matches: self.matches,
        })
    }
}

fn fatal(err: impl std::fmt::Display) -> Halt {
    Halt::Fatal(err.to_string())
}

pub struct SearchCoordinator {
    browser: Arc<dyn Browser>,
    registry: Arc<CancellationRegistry>,
    crawler: CrawlerConfig,
    settings: SearchSettings,
}

impl SearchCoordinator {
    pub fn new(
        browser: Arc<dyn Browser>,
        registry: Arc<CancellationRegistry>,
        crawler: CrawlerConfig,
        settings: SearchSettings,
    ) -> Self {
        Self {
            browser,
            registry,
            crawler,
            settings,
        }
    }

    pub fn registry(&self) -> &Arc<CancellationRegistry> {
        &self.registry
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// Drive one search to its terminal event.
    pub fn run(&self, search: ValidatedSearch, sink: &mut dyn EventSink) -> SearchOutcome {
        let mode = search.mode();
        let span = tracing::info_span!(
            "search",
            search_id = search.search_id.as_deref().unwrap_or(""),
            mode
        );
        let _entered = span.enter();

        let _registration = search
            .search_id
            .as_deref()
            .and_then(|id| self.registry.register_scoped(id));

        let mut run = Run {
            sink,
            registry: &self.registry,
            search_id: search.search_id.as_deref(),
            processed: 0,
            matches: 0,
        };

        let result = run
            .emit(EventKind::Hello {
                ts: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            })
            .and_then(|()| self.drive(&mut run, &search));

        let terminal = match result {
            Ok(()) | Err(Halt::Satisfied) => {
                let _ = run.emit(EventKind::Done);
                Terminal::Done
            }
            Err(Halt::Cancelled) => {
                tracing::info!(processed = run.processed, "search cancelled");
                let _ = run.emit(EventKind::Cancelled);
                Terminal::Cancelled
            }
            Err(Halt::Fatal(message)) => {
                tracing::warn!(error = %message, "search failed");
                let _ = run.emit(EventKind::Error { message });
                Terminal::Error
            }
            Err(Halt::Disconnected) => Terminal::Cancelled,
        };

        metrics::counter!(
            "fitscan_searches_total",
            "mode" => mode,
            "outcome" => terminal.as_str()
        )
        .increment(1);
        tracing::info!(
            state = terminal.as_str(),
            processed = run.processed,
            matches = run.matches,
            "search finished"
        );

        SearchOutcome {
            terminal,
            processed: run.processed,
            matches: run.matches,
        }
    }

    fn drive(&self, run: &mut Run<'_>, search: &ValidatedSearch) -> Result<(), Halt> {
        let mut session = ScopedSession::open(self.browser.as_ref(), &search.session)
            .map_err(fatal)?;
        let url = search.target.url(&self.crawler).map_err(fatal)?;

        run.checkpoint()?;
        tracing::debug!(url = %url, "loading landing page");
        session.navigate(&url).map_err(fatal)?;

        let min_sold_count = match search.target {
            CatalogTarget::Seller { .. } => None,
            CatalogTarget::Browse => Some(self.settings.browse_min_sold_count),
        };
        let matcher = Matcher::new(MatchConfig {
            targets: search.targets,
            tolerance: search.tolerance,
            min_sold_count,
        })
        .map_err(fatal)?;

        match &search.target {
            CatalogTarget::Seller { handle, .. } => {
                self.seller_mode(run, &mut *session, &matcher, search, handle)
            }
            CatalogTarget::Browse => self.browse_mode(run, &mut *session, &matcher, search),
        }
    }

    fn seller_mode(
        &self,
        run: &mut Run<'_>,
        session: &mut dyn BrowsingSession,
        matcher: &Matcher,
        search: &ValidatedSearch,
        seller: &str,
    ) -> Result<(), Halt> {
        run.progress(Some(Phase::Landing), None)?;

        let limits = LinkLimits::new(search.max_scrolls, Some(search.max_links));
        let links = session.collect_links(&limits).map_err(fatal)?;
        let total = links.len();
        tracing::info!(links = total, "links collected");
        run.emit(EventKind::Meta {
            links: Some(total),
            seller: Some(seller.to_string()),
        })?;

        for url in &links {
            run.checkpoint()?;
            self.process(run, session, matcher, url, Some(total), false)?;
            if run.matches >= search.max_items {
                return Err(Halt::Satisfied);
            }
        }
        Ok(())
    }

    fn browse_mode(
        &self,
        run: &mut Run<'_>,
        session: &mut dyn BrowsingSession,
        matcher: &Matcher,
        search: &ValidatedSearch,
    ) -> Result<(), Halt> {
        run.progress(Some(Phase::Browsing), None)?;
        run.emit(EventKind::Meta {
            links: None,
            seller: None,
        })?;

        let mut seen = HashSet::new();
        let mut empty_scans = 0;

        while run.processed < search.max_links {
            run.checkpoint()?;
            let found = session
                .collect_links(&LinkLimits::single_pass())
                .map_err(fatal)?;
            let fresh: Vec<String> = found
                .into_iter()
                .filter(|url| !seen.contains(url))
                .collect();

            if fresh.is_empty() {
                empty_scans += 1;
                tracing::debug!(empty_scans, "scan found no new links");
                if empty_scans >= self.settings.empty_scan_limit {
                    break;
                }
                continue;
            }
            empty_scans = 0;

            for url in fresh {
                run.checkpoint()?;
                if run.processed >= search.max_links {
                    break;
                }
                self.process(run, session, matcher, &url, None, true)?;
                seen.insert(url);
                if run.matches >= search.max_items {
                    return Err(Halt::Satisfied);
                }
            }
        }
        Ok(())
    }

    /// One unit of work: fetch, match, report.
    fn process(
        &self,
        run: &mut Run<'_>,
        session: &mut dyn BrowsingSession,
        matcher: &Matcher,
        url: &str,
        total: Option<usize>,
        echo_seller: bool,
    ) -> Result<(), Halt> {
        let record = session.fetch_listing(url);
        run.processed += 1;
        metrics::counter!("fitscan_listings_processed_total").increment(1);

        match record {
            None => {
                metrics::counter!("fitscan_listing_fetch_failures_total").increment(1);
            }
            Some(record) => match matcher.evaluate(&record) {
                MatchOutcome::Matched(item) => {
                    run.matches += 1;
                    metrics::counter!("fitscan_matches_total").increment(1);
                    tracing::info!(
                        url,
                        processed = run.processed,
                        matches = run.matches,
                        p2p = ?item.p2p,
                        length = ?item.length,
                        "match"
                    );
                    let seller = if echo_seller { item.seller.clone() } else { None };
                    run.emit(EventKind::Match { item, seller })?;
                }
                other => {
                    tracing::trace!(url, outcome = other.label(), "no match");
                }
            },
        }

        run.progress(None, total)
    }
}
