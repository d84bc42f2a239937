//! # Listing Matcher (`matcher`)
//!
//! ## Purpose
//!
//! `matcher` sits between the crawler and the search stream. Given a fetched
//! [`ListingRecord`] it extracts measurements from the description with
//! [`measure::MeasurementParser`], compares them against the requested
//! targets, and projects hits into the public [`MatchResult`] shape.
//!
//! ## Core Types
//!
//! - [`MatchConfig`]: target [`measure::MeasurementPair`], per-dimension
//!   [`ToleranceSpec`] and an optional seller sold-count threshold.
//! - [`Matcher`]: validated filter; cheap to clone into worker threads.
//! - [`MatchOutcome`]: the decision plus the reason for a rejection.
//! - [`MatchMetrics`]: optional global observer for evaluation latency.
//!
//! ## Example Usage
//!
//! ```rust
//! use matcher::{ListingRecord, MatchConfig, Matcher, ToleranceSpec};
//! use measure::MeasurementPair;
//!
//! let config = MatchConfig::new(
//!     MeasurementPair::new(Some(22.0), Some(29.0)),
//!     ToleranceSpec::new(1.0, 0.5),
//! );
//! let matcher = Matcher::new(config).expect("valid config");
//!
//! let listing = ListingRecord::new(
//!     "https://www.depop.com/products/example/",
//!     "Vintage tee. Pit to pit 22.5\", length 29",
//! );
//! let hit = matcher.match_listing(&listing).expect("within tolerance");
//! assert_eq!(hit.p2p, Some(22.5));
//! ```
//!
//! ## Decision Rules
//!
//! - An absent target is not checked; a present target requires a value
//!   within `|value - target| <= tolerance`.
//! - With `min_sold_count` set, the seller must have sold strictly more items
//!   than the threshold. A missing count is treated as zero.

pub mod engine;
pub mod metrics;
pub mod types;

pub use engine::Matcher;
pub use metrics::{set_match_metrics, MatchMetrics};
pub use types::{ListingRecord, MatchConfig, MatchError, MatchOutcome, MatchResult, ToleranceSpec};
