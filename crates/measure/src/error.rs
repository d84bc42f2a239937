use thiserror::Error;

/// Errors raised while converting a single numeric candidate.
///
/// The parser never surfaces these: a failing candidate is dropped and the
/// scan continues. They are public so callers of [`to_inches`](crate::to_inches)
/// can tell why a conversion was refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeasureError {
    #[error("invalid number: {0:?}")]
    InvalidNumber(String),
    #[error("fraction has a zero denominator: {0:?}")]
    ZeroDenominator(String),
    #[error("value is not a finite non-negative number: {0:?}")]
    OutOfRange(String),
}
