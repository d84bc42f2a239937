//! # Search Stream (`stream`)
//!
//! Turns a blocking, sequential crawl into an ordered, cancellable event
//! stream.
//!
//! ## Pieces
//!
//! - [`SearchRequest`]: lenient wire form, validated into a
//!   [`ValidatedSearch`] against [`SearchSettings`] before any session opens.
//! - [`SearchCoordinator`]: the state machine. One run, one browsing
//!   session, one terminal event.
//! - [`CancellationRegistry`]: the only state shared between runs.
//! - [`spawn_search`]: runs the coordinator on the blocking pool and returns a
//!   [`SearchStream`] of [`SearchEvent`]s.
//!
//! ## Event order
//!
//! ```text
//! hello, progress{phase}, meta, (match? progress)*, done | cancelled | error
//! ```
//!
//! Cancellation is cooperative: the flag is checked before each listing and
//! before each browse scan, so a cancel takes effect within one fetch.
//!
//! ## Metrics
//!
//! Counters are reported through the `metrics` facade and are no-ops until a
//! recorder is installed:
//!
//! - `fitscan_searches_total{mode, outcome}`
//! - `fitscan_listings_processed_total`
//! - `fitscan_listing_fetch_failures_total`
//! - `fitscan_matches_total`

mod bridge;
mod coordinator;
mod events;
mod registry;
mod request;
mod settings;

pub use crate::bridge::{spawn_search, SearchStream};
pub use crate::coordinator::{
    ChannelSink, EventSink, FnSink, SearchCoordinator, SearchOutcome, SinkClosed, Terminal,
};
pub use crate::events::{padding_comment, EventKind, Phase, SearchEvent, PADDING_WIDTH};
pub use crate::registry::{CancellationRegistry, Registration};
pub use crate::request::{
    Measurements, NumberLike, RequestError, SearchRequest, Validated, ValidatedSearch,
};
pub use crate::settings::SearchSettings;
