use measure::MeasurementPair;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw listing fields as returned by a listing fetcher.
///
/// Owned by a single pipeline iteration and never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    /// ISO-8601 timestamp of when the item was listed.
    #[serde(default)]
    pub listed_at: Option<String>,
    #[serde(default)]
    pub age_days: Option<f64>,
    #[serde(default)]
    pub seller: Option<String>,
    #[serde(default)]
    pub sold_count: Option<u32>,
}

impl ListingRecord {
    /// Minimal record carrying only a URL and description.
    pub fn new(url: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            description: description.into(),
            ..Default::default()
        }
    }
}

/// Public projection of a matched listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub url: String,
    pub image: Option<String>,
    pub price: Option<String>,
    pub p2p: Option<f64>,
    pub length: Option<f64>,
    pub age_days: Option<f64>,
    pub listed_at: Option<String>,
    pub seller: Option<String>,
    pub sold_count: Option<u32>,
}

impl MatchResult {
    pub fn from_record(record: &ListingRecord, pair: MeasurementPair) -> Self {
        Self {
            url: record.url.clone(),
            image: record.image.clone(),
            price: record.price.clone(),
            p2p: pair.p2p,
            length: pair.length,
            age_days: record.age_days,
            listed_at: record.listed_at.clone(),
            seller: record.seller.clone(),
            sold_count: record.sold_count,
        }
    }
}

/// Independent tolerances, in inches, for each dimension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToleranceSpec {
    #[serde(default = "ToleranceSpec::default_p2p")]
    pub p2p: f64,
    #[serde(default = "ToleranceSpec::default_length")]
    pub length: f64,
}

impl ToleranceSpec {
    pub(crate) fn default_p2p() -> f64 {
        1.0
    }

    pub(crate) fn default_length() -> f64 {
        0.5
    }

    pub fn new(p2p: f64, length: f64) -> Self {
        Self { p2p, length }
    }

    /// One tolerance for both dimensions.
    pub fn shared(tolerance: f64) -> Self {
        Self::new(tolerance, tolerance)
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        for (name, value) in [("p2p", self.p2p), ("length", self.length)] {
            if !value.is_finite() || value < 0.0 {
                return Err(MatchError::InvalidConfig(format!(
                    "{name} tolerance must be a finite number >= 0, got {value}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for ToleranceSpec {
    fn default() -> Self {
        Self::new(Self::default_p2p(), Self::default_length())
    }
}

/// Configuration for one match filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MatchConfig {
    /// Requested dimensions; an absent target is not checked.
    pub targets: MeasurementPair,
    #[serde(default)]
    pub tolerance: ToleranceSpec,
    /// When set, a listing only matches if its seller has sold strictly more
    /// than this many items.
    #[serde(default)]
    pub min_sold_count: Option<u32>,
}

impl MatchConfig {
    pub fn new(targets: MeasurementPair, tolerance: ToleranceSpec) -> Self {
        Self {
            targets,
            tolerance,
            min_sold_count: None,
        }
    }

    pub fn with_min_sold_count(mut self, min_sold_count: u32) -> Self {
        self.min_sold_count = Some(min_sold_count);
        self
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        self.tolerance.validate()?;
        for (name, value) in [("p2p", self.targets.p2p), ("length", self.targets.length)] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(MatchError::InvalidConfig(format!(
                        "{name} target must be a finite number >= 0, got {v}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Why a listing did or did not match.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Matched(MatchResult),
    OutOfTolerance {
        extracted: MeasurementPair,
    },
    BelowSellerThreshold {
        sold_count: u32,
        required: u32,
    },
}

impl MatchOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, MatchOutcome::Matched(_))
    }

    pub fn into_match(self) -> Option<MatchResult> {
        match self {
            MatchOutcome::Matched(result) => Some(result),
            _ => None,
        }
    }

    /// Short label used for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            MatchOutcome::Matched(_) => "matched",
            MatchOutcome::OutOfTolerance { .. } => "out_of_tolerance",
            MatchOutcome::BelowSellerThreshold { .. } => "below_seller_threshold",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MatchError {
    #[error("invalid match config: {0}")]
    InvalidConfig(String),
}
