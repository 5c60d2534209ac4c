//! Sentiment classification: polarity scoring plus label thresholds.

use std::sync::Arc;

use tracing::{error, info};

use crate::error::ScoringError;
use crate::pipeline::types::{SentimentLabel, SentimentResult};
use crate::scoring::PolarityScorer;

/// Scores strictly above this are positive.
pub const POSITIVE_THRESHOLD: f64 = 0.1;

/// Scores strictly below this are negative.
pub const NEGATIVE_THRESHOLD: f64 = -0.1;

/// Map a polarity to a label. Exactly ±0.1 is neutral.
pub fn classify_polarity(score: f64) -> SentimentLabel {
    if score > POSITIVE_THRESHOLD {
        SentimentLabel::Positive
    } else if score < NEGATIVE_THRESHOLD {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Neutral
    }
}

/// Runs a [`PolarityScorer`] and turns its outcome into a [`SentimentResult`].
///
/// Never fails: scorer errors, and values outside `[-1.0, 1.0]`, come back
/// as the `error` label.
#[derive(Clone)]
pub struct SentimentClassifier {
    scorer: Arc<dyn PolarityScorer>,
}

impl SentimentClassifier {
    pub fn new(scorer: Arc<dyn PolarityScorer>) -> Self {
        Self { scorer }
    }

    /// Name of the underlying scorer.
    pub fn scorer_name(&self) -> &str {
        self.scorer.name()
    }

    /// Score `content` and classify it.
    pub fn classify(&self, content: &str) -> SentimentResult {
        match self.scorer.polarity(content).and_then(check_polarity) {
            Ok(score) => {
                let label = classify_polarity(score);
                info!(
                    score,
                    label = %label,
                    "Social sentiment analysis complete: {score:.2} ({label})"
                );
                SentimentResult::scored(score, label)
            }
            Err(e) => self.fail(e),
        }
    }

    /// Record a scoring failure.
    pub fn fail(&self, cause: ScoringError) -> SentimentResult {
        error!(
            scorer = self.scorer.name(),
            error = %cause,
            "Social sentiment analysis failed"
        );
        SentimentResult::error()
    }
}

fn check_polarity(score: f64) -> Result<f64, ScoringError> {
    if !score.is_finite() {
        Err(ScoringError::NonFinite(score))
    } else if !(-1.0..=1.0).contains(&score) {
        Err(ScoringError::OutOfRange(score))
    } else {
        Ok(score)
    }
}
