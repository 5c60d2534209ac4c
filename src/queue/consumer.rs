//! Queue consumer: pulls deliveries, scores records concurrently, publishes.
//!
//! Each record is scored on the blocking pool because scorers are
//! synchronous. At most `max_concurrency` records are in flight. An optional
//! timeout bounds how long the consumer waits for one record; the scorer
//! itself cannot be interrupted and finishes in the background, still
//! holding its concurrency slot.
//!
//! No acknowledgment or retry happens here: a record is published, rejected
//! (timeout) or lost to a sink failure, and the consumer moves on.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::{MessageSource, ResultSink};
use crate::config::ServiceConfig;
use crate::error::QueueError;
use crate::pipeline::processor::SentimentProcessor;
use crate::pipeline::types::{MessageRecord, SentimentLabel, SentimentResult};

/// Consumer tuning.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Maximum records scored at once.
    pub max_concurrency: usize,
    /// How long to wait for one record before rejecting it.
    pub score_timeout: Option<Duration>,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            score_timeout: None,
        }
    }
}

impl From<&ServiceConfig> for ConsumerConfig {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            max_concurrency: config.max_concurrency,
            score_timeout: config.score_timeout,
        }
    }
}

/// Counters for one consumer run.
#[derive(Debug, Clone, Serialize)]
pub struct ConsumerStats {
    /// Records taken off the source (after batch decomposition).
    pub received: u64,
    pub positive: u64,
    pub neutral: u64,
    pub negative: u64,
    pub unknown: u64,
    pub errored: u64,
    /// Records rejected because scoring timed out.
    pub rejected: u64,
    /// Records the sink failed to accept.
    pub publish_failures: u64,
    /// Deliveries that could not be decoded.
    pub malformed: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ConsumerStats {
    fn new() -> Self {
        Self {
            received: 0,
            positive: 0,
            neutral: 0,
            negative: 0,
            unknown: 0,
            errored: 0,
            rejected: 0,
            publish_failures: 0,
            malformed: 0,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Records successfully handed to the sink.
    pub fn published(&self) -> u64 {
        self.positive + self.neutral + self.negative + self.unknown + self.errored
    }

    /// Count for one label.
    pub fn count(&self, label: SentimentLabel) -> u64 {
        match label {
            SentimentLabel::Positive => self.positive,
            SentimentLabel::Neutral => self.neutral,
            SentimentLabel::Negative => self.negative,
            SentimentLabel::Unknown => self.unknown,
            SentimentLabel::Error => self.errored,
        }
    }

    fn absorb(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Published(label) => {
                let counter = match label {
                    SentimentLabel::Positive => &mut self.positive,
                    SentimentLabel::Neutral => &mut self.neutral,
                    SentimentLabel::Negative => &mut self.negative,
                    SentimentLabel::Unknown => &mut self.unknown,
                    SentimentLabel::Error => &mut self.errored,
                };
                *counter += 1;
            }
            Outcome::Rejected => self.rejected += 1,
            Outcome::PublishFailed => self.publish_failures += 1,
        }
    }
}

/// What happened to one record.
#[derive(Debug, Clone, Copy)]
enum Outcome {
    Published(SentimentLabel),
    Rejected,
    PublishFailed,
}

/// Stops a running consumer.
///
/// In-flight records still finish; nothing new is pulled from the source.
#[derive(Debug, Default)]
pub struct ShutdownHandle {
    requested: AtomicBool,
    notify: Notify,
}

impl ShutdownHandle {
    pub fn trigger(&self) {
        self.requested.store(true, Ordering::Relaxed);
        self.notify.notify_one();
    }

    pub fn is_triggered(&self) -> bool {
        self.requested.load(Ordering::Relaxed)
    }
}

/// Drives records from a [`MessageSource`] through a [`SentimentProcessor`]
/// into a [`ResultSink`].
pub struct SentimentConsumer {
    processor: Arc<SentimentProcessor>,
    source: Arc<dyn MessageSource>,
    sink: Arc<dyn ResultSink>,
    config: ConsumerConfig,
    shutdown: Arc<ShutdownHandle>,
}

impl SentimentConsumer {
    pub fn new(
        processor: Arc<SentimentProcessor>,
        source: Arc<dyn MessageSource>,
        sink: Arc<dyn ResultSink>,
        config: ConsumerConfig,
    ) -> Self {
        Self {
            processor,
            source,
            sink,
            config,
            shutdown: Arc::new(ShutdownHandle::default()),
        }
    }

    /// Handle for stopping [`run`](Self::run) from another task.
    pub fn shutdown_handle(&self) -> Arc<ShutdownHandle> {
        Arc::clone(&self.shutdown)
    }

    /// Consume until the source is exhausted or shutdown is triggered.
    ///
    /// Malformed deliveries are logged and skipped. Any other source error
    /// ends the run after in-flight records finish.
    pub async fn run(&self) -> Result<ConsumerStats, QueueError> {
        let max = self.config.max_concurrency.max(1);
        info!(
            source = self.source.name(),
            scorer = self.processor.scorer_name(),
            max_concurrency = max,
            timeout_ms = self.config.score_timeout.map(|t| t.as_millis() as u64),
            "Consumer started"
        );

        let permits = Arc::new(Semaphore::new(max));
        let mut tasks: JoinSet<Outcome> = JoinSet::new();
        let mut stats = ConsumerStats::new();
        let mut failure = None;

        loop {
            if self.shutdown.is_triggered() {
                info!("Shutdown requested, no longer pulling from source");
                break;
            }

            while let Some(joined) = tasks.try_join_next() {
                absorb_joined(&mut stats, joined);
            }

            let delivery = tokio::select! {
                received = self.source.recv() => received,
                _ = self.shutdown.notify.notified() => continue,
            };

            let records = match delivery {
                Ok(Some(records)) => records,
                Ok(None) => {
                    debug!(source = self.source.name(), "Source exhausted");
                    break;
                }
                Err(e) if !e.is_fatal() => {
                    warn!(error = %e, "Skipping malformed delivery");
                    stats.malformed += 1;
                    continue;
                }
                Err(e) => {
                    error!(error = %e, "Source failed");
                    failure = Some(e);
                    break;
                }
            };

            for record in records {
                stats.received += 1;
                let permit = Arc::clone(&permits)
                    .acquire_owned()
                    .await
                    .map_err(|_| QueueError::Closed)?;
                tasks.spawn(score_and_publish(
                    Arc::clone(&self.processor),
                    Arc::clone(&self.sink),
                    record,
                    self.config.score_timeout,
                    permit,
                ));
            }
        }

        while let Some(joined) = tasks.join_next().await {
            absorb_joined(&mut stats, joined);
        }
        stats.finished_at = Some(Utc::now());

        info!(
            received = stats.received,
            published = stats.published(),
            positive = stats.positive,
            neutral = stats.neutral,
            negative = stats.negative,
            unknown = stats.unknown,
            errored = stats.errored,
            rejected = stats.rejected,
            malformed = stats.malformed,
            "Consumer finished"
        );

        match failure {
            Some(e) => Err(e),
            None => Ok(stats),
        }
    }
}

fn absorb_joined(stats: &mut ConsumerStats, joined: Result<Outcome, tokio::task::JoinError>) {
    match joined {
        Ok(outcome) => stats.absorb(outcome),
        Err(e) => {
            error!(error = %e, "Record task aborted");
            stats.publish_failures += 1;
        }
    }
}

/// Score one record off the async runtime and publish it.
async fn score_and_publish(
    processor: Arc<SentimentProcessor>,
    sink: Arc<dyn ResultSink>,
    record: MessageRecord,
    timeout: Option<Duration>,
    permit: OwnedSemaphorePermit,
) -> Outcome {
    let original = record.clone();
    // The permit travels with the blocking call so an abandoned scorer keeps
    // its slot until it actually returns.
    let scoring = tokio::task::spawn_blocking(move || {
        let mut record = record;
        let result = processor.process_in_place(&mut record);
        (record, result.label, permit)
    });

    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, scoring).await {
            Ok(joined) => joined,
            Err(_) => {
                warn!(
                    timeout_ms = limit.as_millis() as u64,
                    "Scoring timed out, rejecting record"
                );
                return match sink.reject(original, "scoring timed out").await {
                    Ok(()) => Outcome::Rejected,
                    Err(e) => {
                        error!(error = %e, "Failed to reject record");
                        Outcome::PublishFailed
                    }
                };
            }
        },
        None => scoring.await,
    };

    // On a panic the permit was released while unwinding.
    let (record, label, _permit) = match joined {
        Ok((record, label, permit)) => (record, label, Some(permit)),
        Err(e) => {
            // The scorer panicked; that is still a scoring failure.
            error!(error = %e, "Social sentiment analysis failed");
            let mut record = original;
            record.apply(&SentimentResult::error());
            (record, SentimentLabel::Error, None)
        }
    };

    match sink.publish(record).await {
        Ok(()) => Outcome::Published(label),
        Err(e) => {
            error!(error = %e, label = %label, "Failed to publish record");
            Outcome::PublishFailed
        }
    }
}
