use std::time::Instant;

use measure::{within, MeasurementParser};

use crate::metrics::metrics_recorder;
use crate::types::{ListingRecord, MatchConfig, MatchError, MatchOutcome, MatchResult};


/// Match filter: decides whether a listing's measurements fit the targets.
///
/// Only the description is parsed. Titles and other marketing copy are left
/// out to avoid false positives.
#[derive(Debug, Clone)]
pub struct Matcher {
    parser: MeasurementParser,
    config: MatchConfig,
}

impl Matcher {
    /// Construct a matcher after validating targets and tolerances.
    pub fn new(config: MatchConfig) -> Result<Self, MatchError> {
        config.validate()?;
        Ok(Self {
            parser: MeasurementParser::new(),
            config,
        })
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Project a matching listing into its public shape, or `None`.
    pub fn match_listing(&self, record: &ListingRecord) -> Option<MatchResult> {
        self.evaluate(record).into_match()
    }

    /// Full decision with the reason a listing was rejected.
    pub fn evaluate(&self, record: &ListingRecord) -> MatchOutcome {
        let start = Instant::now();
        let outcome = self.decide(record);

        if let Some(recorder) = metrics_recorder() {
            recorder.record_evaluation(outcome.label(), start.elapsed());
        }
        tracing::trace!(url = %record.url, outcome = outcome.label(), "listing evaluated");
        outcome
    }

    fn decide(&self, record: &ListingRecord) -> MatchOutcome {
        let extracted = self.parser.extract(&record.description);
        let targets = &self.config.targets;
        let tolerance = &self.config.tolerance;

        let fits = within(extracted.p2p, targets.p2p, tolerance.p2p)
            && within(extracted.length, targets.length, tolerance.length);
        if !fits {
            return MatchOutcome::OutOfTolerance { extracted };
        }

        if let Some(required) = self.config.min_sold_count {
            let sold_count = record.sold_count.unwrap_or(0);
            if sold_count <= required {
                return MatchOutcome::BelowSellerThreshold {
                    sold_count,
                    required,
                };
            }
        }

        MatchOutcome::Matched(MatchResult::from_record(record, extracted))
    }
}
