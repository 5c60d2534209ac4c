//! Queue-side collaborators: where records come from and where results go.
//!
//! Sources and sinks are pure I/O. Scoring lives in `SentimentProcessor`,
//! and `SentimentConsumer` glues the three together.

pub mod consumer;
pub mod jsonl;

pub use consumer::{ConsumerConfig, ConsumerStats, SentimentConsumer, ShutdownHandle};
pub use jsonl::{JsonLinesSink, JsonLinesSource};

use async_trait::async_trait;

use crate::error::QueueError;
use crate::pipeline::types::MessageRecord;

/// Supplies deserialized message records.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Source name (e.g. "stdin", a file path).
    fn name(&self) -> &str;

    /// Wait for the next delivery.
    ///
    /// A delivery may carry several records; the consumer scores them one by
    /// one. `Ok(None)` means the source is exhausted.
    async fn recv(&self) -> Result<Option<Vec<MessageRecord>>, QueueError>;
}

/// Receives enriched records.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Deliver an enriched record downstream.
    async fn publish(&self, record: MessageRecord) -> Result<(), QueueError>;

    /// Give up on a record that could not be processed.
    async fn reject(&self, record: MessageRecord, reason: &str) -> Result<(), QueueError>;
}
