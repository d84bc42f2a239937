//! Garment measurement extraction.
//!
//! This crate turns noisy, human-written listing descriptions into two
//! canonical numbers: pit-to-pit width and length, both in inches.
//!
//! ## What we do
//!
//! - Case-insensitive label scan (`p2p`, `pit to pit`, `chest`, `width`,
//!   `across chest`; `length`, `top to bottom`, `back length`, `hps to hem`)
//! - `W x L` pairs, where the smaller side is always the width
//! - Per-line fallback for labels that sit far from their number
//! - Integers, decimals and mixed fractions (`19 1/2`)
//! - Unit suffixes; centimeters are converted, everything else is inches
//!
//! ## Pure function guarantee
//!
//! No I/O, no clock, no locale. [`MeasurementParser::extract`] is total: it
//! never panics on any input and every value it returns is finite and
//! non-negative. A candidate that fails numeric parsing is dropped on its own
//! without aborting the rest of the scan.
//!
//! ```rust
//! use measure::{within, MeasurementParser};
//!
//! let parser = MeasurementParser::new();
//! let pair = parser.extract("P2P: 19.5in, Length: 28cm");
//! assert_eq!(pair.p2p, Some(19.5));
//! assert!((pair.length.unwrap() - 28.0 / 2.54).abs() < 1e-9);
//!
//! assert!(within(pair.p2p, Some(20.0), 1.0));
//! assert!(within(None, None, 0.0));
//! ```

mod error;
mod pair;
mod parser;
mod units;

pub use crate::error::MeasureError;
pub use crate::pair::{within, MeasurementPair};
pub use crate::parser::{Extraction, MeasurementParser, Strategy};
pub use crate::units::{from_inches, parse_number, to_inches, Unit, CM_PER_INCH};
