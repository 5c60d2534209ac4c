//! Sentiment processor: the single entry point the queue consumer calls.
//!
//! Flow per record (terminal after one pass, no retries):
//! 1. Intake validation → no content: `unknown`
//! 2. Classification → scorer failure: `error`
//! 3. Otherwise: `positive` / `neutral` / `negative` with the raw score
//!
//! The result is merged into the record under `sentiment_score` and
//! `sentiment_label`. Nothing else in the record is touched.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::ScoringError;
use crate::pipeline::classifier::SentimentClassifier;
use crate::pipeline::intake;
use crate::pipeline::types::{MessageRecord, SentimentResult};
use crate::scoring::PolarityScorer;

/// Enriches message records with a sentiment verdict.
///
/// Stateless apart from the shared scorer, so one instance can serve any
/// number of workers.
#[derive(Clone)]
pub struct SentimentProcessor {
    classifier: SentimentClassifier,
}

impl SentimentProcessor {
    /// Create a processor around a polarity scorer.
    pub fn new(scorer: Arc<dyn PolarityScorer>) -> Self {
        Self {
            classifier: SentimentClassifier::new(scorer),
        }
    }

    /// Name of the scorer behind this processor.
    pub fn scorer_name(&self) -> &str {
        self.classifier.scorer_name()
    }

    /// Annotate a record and hand it back. Never fails.
    pub fn process(&self, mut record: MessageRecord) -> MessageRecord {
        self.process_in_place(&mut record);
        record
    }

    /// Annotate a record in place and return the verdict that was written.
    pub fn process_in_place(&self, record: &mut MessageRecord) -> SentimentResult {
        let result = self.evaluate(record);
        record.apply(&result);
        result
    }

    /// Process a batch. Each record is handled independently.
    pub fn process_batch(&self, records: Vec<MessageRecord>) -> Vec<MessageRecord> {
        let count = records.len();
        let processed: Vec<MessageRecord> =
            records.into_iter().map(|r| self.process(r)).collect();
        info!(count, "Batch sentiment analysis complete");
        processed
    }

    fn evaluate(&self, record: &MessageRecord) -> SentimentResult {
        let Some(content) = intake::validate(record) else {
            return SentimentResult::unknown();
        };

        match content.as_str() {
            Some(text) => self.classifier.classify(text),
            None => {
                debug!(content = %content, "Content is not text");
                self.classifier.fail(ScoringError::UnsupportedContent {
                    kind: json_kind(content).to_string(),
                })
            }
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    use serde_json::Value;
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
