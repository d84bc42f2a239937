//! Bridges the matcher's evaluation hook to the `metrics` facade.
//!
//! Once installed, every `Matcher::evaluate` call records
//! `fitscan_match_evaluation_seconds{outcome}`, rendered by `/metrics` when
//! the Prometheus recorder is active.

use std::sync::Arc;
use std::time::Duration;

use matcher::{set_match_metrics, MatchMetrics};

pub const MATCH_EVALUATION_SECONDS: &str = "fitscan_match_evaluation_seconds";

/// Forwards evaluation latency to whichever `metrics` recorder is current.
#[derive(Debug, Default, Clone, Copy)]
pub struct FacadeMatchMetrics;

impl MatchMetrics for FacadeMatchMetrics {
    fn record_evaluation(&self, outcome: &'static str, latency: Duration) {
        metrics::histogram!(MATCH_EVALUATION_SECONDS, "outcome" => outcome)
            .record(latency.as_secs_f64());
    }
}

/// Install [`FacadeMatchMetrics`] as the process-wide match observer.
pub fn install_match_metrics() {
    set_match_metrics(Some(Arc::new(FacadeMatchMetrics)));
}
