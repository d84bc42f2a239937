//! Search request parsing and validation.
//!
//! The wire form is lenient about representation (numbers may arrive as JSON
//! numbers or numeric strings, everything is optional) and strict about
//! values: anything unparseable, negative or non-finite is rejected before a
//! browsing session is created.

use crawler::{CatalogTarget, SessionOptions};
use matcher::ToleranceSpec;
use measure::MeasurementPair;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::settings::SearchSettings;

/// A JSON number or a string holding one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberLike {
    Number(f64),
    Text(String),
}

impl From<f64> for NumberLike {
    fn from(value: f64) -> Self {
        NumberLike::Number(value)
    }
}

impl From<&str> for NumberLike {
    fn from(value: &str) -> Self {
        NumberLike::Text(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Measurements {
    /// Pit-to-pit width target.
    #[serde(default)]
    pub first: Option<NumberLike>,
    /// Length target.
    #[serde(default)]
    pub second: Option<NumberLike>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub measurements: Option<Measurements>,
    #[serde(default)]
    pub p2p_tolerance: Option<NumberLike>,
    #[serde(default)]
    pub length_tolerance: Option<NumberLike>,
    #[serde(default)]
    pub seller: Option<String>,
    #[serde(default)]
    pub max_items: Option<NumberLike>,
    #[serde(default)]
    pub max_links: Option<NumberLike>,
    #[serde(default)]
    pub max_scrolls: Option<NumberLike>,
    #[serde(default)]
    pub headless: Option<bool>,
    #[serde(default)]
    pub slowmo: Option<NumberLike>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub groups: Option<String>,
    #[serde(default)]
    pub search_id: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RequestError {
    #[error("{field}: `{value}` is not a number")]
    InvalidNumber { field: &'static str, value: String },
    #[error("{field}: {reason}")]
    OutOfRange { field: &'static str, reason: String },
}

impl RequestError {
    pub fn field(&self) -> &'static str {
        match self {
            RequestError::InvalidNumber { field, .. } | RequestError::OutOfRange { field, .. } => {
                field
            }
        }
    }
}

/// A request that passed validation, with every default resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSearch {
    pub targets: MeasurementPair,
    pub tolerance: ToleranceSpec,
    pub target: CatalogTarget,
    pub max_items: usize,
    pub max_links: usize,
    pub max_scrolls: u32,
    pub session: SessionOptions,
    pub search_id: Option<String>,
}

impl ValidatedSearch {
    pub fn mode(&self) -> &'static str {
        if self.target.is_seller() {
            "seller"
        } else {
            "browse"
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Validated {
    Search(ValidatedSearch),
    /// A category nothing is crawled for. Answered with a lone `done`.
    Unsupported {
        category: String,
        search_id: Option<String>,
    },
}

/// Parse an optional numeric field. Blank strings count as absent.
fn parse_number(field: &'static str, raw: Option<&NumberLike>) -> Result<Option<f64>, RequestError> {
    let value = match raw {
        None => return Ok(None),
        Some(NumberLike::Number(n)) => *n,
        Some(NumberLike::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed.parse::<f64>().map_err(|_| RequestError::InvalidNumber {
                field,
                value: text.clone(),
            })?
        }
    };

    if !value.is_finite() {
        return Err(RequestError::OutOfRange {
            field,
            reason: "must be finite".into(),
        });
    }
    if value < 0.0 {
        return Err(RequestError::OutOfRange {
            field,
            reason: format!("must be >= 0, got {value}"),
        });
    }
    Ok(Some(value))
}

fn parse_count(field: &'static str, raw: Option<&NumberLike>) -> Result<Option<u64>, RequestError> {
    match parse_number(field, raw)? {
        None => Ok(None),
        Some(value) if value.fract() != 0.0 => Err(RequestError::OutOfRange {
            field,
            reason: format!("must be a whole number, got {value}"),
        }),
        Some(value) if value > u32::MAX as f64 => Err(RequestError::OutOfRange {
            field,
            reason: format!("must be at most {}", u32::MAX),
        }),
        Some(value) => Ok(Some(value as u64)),
    }
}

/// Counts where zero or absence falls back to the configured default.
fn count_or_default(
    field: &'static str,
    raw: Option<&NumberLike>,
    default: u64,
) -> Result<u64, RequestError> {
    Ok(parse_count(field, raw)?.filter(|&n| n > 0).unwrap_or(default))
}

fn text_or_default(raw: Option<&str>, default: &str) -> String {
    match raw.map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => default.to_string(),
    }
}

impl SearchRequest {
    pub fn search_id(&self) -> Option<&str> {
        self.search_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    pub fn validate(&self, settings: &SearchSettings) -> Result<Validated, RequestError> {
        let search_id = self.search_id().map(str::to_string);

        let category = text_or_default(self.category.as_deref(), &settings.supported_category);
        if !category.eq_ignore_ascii_case(&settings.supported_category) {
            return Ok(Validated::Unsupported {
                category,
                search_id,
            });
        }

        let measurements = self.measurements.clone().unwrap_or_default();
        let targets = MeasurementPair::new(
            parse_number("measurements.first", measurements.first.as_ref())?,
            parse_number("measurements.second", measurements.second.as_ref())?,
        );

        let tolerance = ToleranceSpec::new(
            parse_number("p2pTolerance", self.p2p_tolerance.as_ref())?
                .unwrap_or(settings.default_p2p_tolerance),
            parse_number("lengthTolerance", self.length_tolerance.as_ref())?
                .unwrap_or(settings.default_length_tolerance),
        );

        let max_items = count_or_default(
            "maxItems",
            self.max_items.as_ref(),
            settings.default_max_items as u64,
        )?;
        let max_links = count_or_default(
            "maxLinks",
            self.max_links.as_ref(),
            settings.default_max_links as u64,
        )?;
        let max_scrolls = count_or_default(
            "maxScrolls",
            self.max_scrolls.as_ref(),
            settings.default_max_scrolls as u64,
        )?;
        let slowmo_ms =
            parse_count("slowmo", self.slowmo.as_ref())?.unwrap_or(settings.default_slowmo_ms);

        let groups = text_or_default(self.groups.as_deref(), &settings.default_groups);
        let gender = text_or_default(self.gender.as_deref(), &settings.default_gender);
        let target = CatalogTarget::from_seller(self.seller.as_deref(), &groups, &gender);

        Ok(Validated::Search(ValidatedSearch {
            targets,
            tolerance,
            target,
            max_items: max_items as usize,
            max_links: max_links as usize,
            max_scrolls: max_scrolls as u32,
            session: SessionOptions {
                headless: self.headless.unwrap_or(settings.default_headless),
                slowmo_ms,
            },
            search_id,
        }))
    }
}
