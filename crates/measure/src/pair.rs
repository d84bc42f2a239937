use serde::{Deserialize, Serialize};

/// Pit-to-pit width and length of a garment, in inches.
///
/// Either dimension may be absent independently. Absence is an ordinary
/// outcome of extraction, not an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasurementPair {
    pub p2p: Option<f64>,
    pub length: Option<f64>,
}

impl MeasurementPair {
    pub fn new(p2p: Option<f64>, length: Option<f64>) -> Self {
        Self { p2p, length }
    }

    /// Both dimensions resolved.
    pub fn is_complete(&self) -> bool {
        self.p2p.is_some() && self.length.is_some()
    }

    /// Neither dimension resolved.
    pub fn is_empty(&self) -> bool {
        self.p2p.is_none() && self.length.is_none()
    }
}

/// Tolerance predicate used when comparing an extracted value to a target.
///
/// - no target: the dimension was not requested, always `true`
/// - target but no value: `false`
/// - otherwise `|value - target| <= tolerance`
pub fn within(value: Option<f64>, target: Option<f64>, tolerance: f64) -> bool {
    match (value, target) {
        (_, None) => true,
        (None, Some(_)) => false,
        (Some(value), Some(target)) => (value - target).abs() <= tolerance,
    }
}
