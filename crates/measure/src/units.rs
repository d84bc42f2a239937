//! Number grammar and unit conversion.
//!
//! Every measurement leaves this module in inches. Centimeters are divided by
//! 2.54; every other recognized unit, and a bare number, is taken as inches
//! already. There is no other conversion.
//!
//! ```rust
//! use measure::{to_inches, Unit};
//!
//! assert_eq!(to_inches("19 1/2", "").unwrap(), 19.5);
//! assert_eq!(to_inches("19", "cm").unwrap(), to_inches("19cm", "").unwrap());
//! assert_eq!(Unit::parse(" Inches"), Unit::Inches);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::MeasureError;

/// Centimeters per inch.
pub const CM_PER_INCH: f64 = 2.54;

/// Unit suffix recognized after a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Centimeters,
    Millimeters,
    Inches,
    /// No suffix, or one we do not recognize.
    #[default]
    Unspecified,
}

impl Unit {
    /// Classify a unit suffix such as `"cm"`, `" inches"` or `"\""`.
    pub fn parse(raw: &str) -> Self {
        let unit = normalize_quotes(raw.trim()).to_lowercase();
        if unit.starts_with("cm") {
            Unit::Centimeters
        } else if unit.starts_with("mm") {
            Unit::Millimeters
        } else if unit.starts_with("in") || unit.starts_with('"') {
            Unit::Inches
        } else {
            Unit::Unspecified
        }
    }

    /// Convert a value expressed in this unit to inches.
    pub fn to_inches(self, value: f64) -> f64 {
        match self {
            Unit::Centimeters => value / CM_PER_INCH,
            // mm is recognized as a suffix but carries no conversion of its own.
            Unit::Millimeters | Unit::Inches | Unit::Unspecified => value,
        }
    }

    /// Inverse of [`Unit::to_inches`].
    pub fn from_inches(self, inches: f64) -> f64 {
        match self {
            Unit::Centimeters => inches * CM_PER_INCH,
            Unit::Millimeters | Unit::Inches | Unit::Unspecified => inches,
        }
    }
}

/// Convert a captured number plus its (possibly empty) unit suffix to inches.
///
/// When `unit` is blank, a suffix glued to `number` (`"28cm"`) is honoured, so
/// the position of the unit does not change the result.
pub fn to_inches(number: &str, unit: &str) -> Result<f64, MeasureError> {
    let number = normalize_quotes(number.trim());
    let (digits, suffix) = split_unit_suffix(&number);
    let unit = if unit.trim().is_empty() {
        Unit::parse(suffix)
    } else {
        Unit::parse(unit)
    };
    let value = parse_number(digits)?;
    let inches = unit.to_inches(value);
    if !inches.is_finite() {
        return Err(MeasureError::OutOfRange(number.clone()));
    }
    Ok(inches)
}

/// Express an inch value in `unit`. `to_inches(&from_inches(x, u).to_string(), u)`
/// returns `x` up to floating rounding.
pub fn from_inches(inches: f64, unit: &str) -> f64 {
    Unit::parse(unit).from_inches(inches)
}

/// Parse the number grammar: `19`, `19.5`, `1/2` or the mixed fraction `19 1/2`.
pub fn parse_number(raw: &str) -> Result<f64, MeasureError> {
    let s = raw.trim();
    let value = match s.split_once(char::is_whitespace) {
        Some((whole, fraction)) if fraction.contains('/') => {
            parse_decimal(whole)? + parse_fraction(fraction.trim())?
        }
        Some(_) => return Err(MeasureError::InvalidNumber(s.to_string())),
        None if s.contains('/') => parse_fraction(s)?,
        None => parse_decimal(s)?,
    };
    if !value.is_finite() || value < 0.0 {
        return Err(MeasureError::OutOfRange(s.to_string()));
    }
    Ok(value)
}

fn parse_decimal(s: &str) -> Result<f64, MeasureError> {
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(MeasureError::InvalidNumber(s.to_string()));
    }
    s.parse::<f64>()
        .map_err(|_| MeasureError::InvalidNumber(s.to_string()))
}

fn parse_fraction(s: &str) -> Result<f64, MeasureError> {
    let (num, den) = s
        .split_once('/')
        .ok_or_else(|| MeasureError::InvalidNumber(s.to_string()))?;
    let num: u64 = num
        .trim()
        .parse()
        .map_err(|_| MeasureError::InvalidNumber(s.to_string()))?;
    let den: u64 = den
        .trim()
        .parse()
        .map_err(|_| MeasureError::InvalidNumber(s.to_string()))?;
    if den == 0 {
        return Err(MeasureError::ZeroDenominator(s.to_string()));
    }
    Ok(num as f64 / den as f64)
}

/// Split `"19 1/2 in"` into `("19 1/2", "in")`.
fn split_unit_suffix(s: &str) -> (&str, &str) {
    match s.find(|c: char| c.is_alphabetic() || c == '"') {
        Some(idx) => (s[..idx].trim_end(), &s[idx..]),
        None => (s, ""),
    }
}

/// Fold the typographic quote and double-prime glyphs into `"`.
pub(crate) fn normalize_quotes(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{2033}' => '"',
            other => other,
        })
        .collect()
}
