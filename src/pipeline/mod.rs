//! Sentiment enrichment pipeline.
//!
//! Every record flows through:
//! 1. `intake::validate()`: is there content to score?
//! 2. `SentimentClassifier::classify()`: polarity score + label thresholds
//! 3. `MessageRecord::apply()`: merge `sentiment_score` / `sentiment_label`
//!
//! `SentimentProcessor::process()` runs all three and never fails: missing
//! content becomes `unknown`, scorer failures become `error`.

pub mod classifier;
pub mod intake;
pub mod processor;
pub mod types;

pub use classifier::{SentimentClassifier, classify_polarity};
pub use processor::SentimentProcessor;
pub use types::{MessageRecord, SentimentLabel, SentimentResult};
