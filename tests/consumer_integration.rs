//! Integration tests for the queue consumer.
//!
//! Each test wires an in-memory source and sink around a `SentimentProcessor`
//! with a stub scorer, runs the consumer to completion, and checks what
//! reached the sink.

use std::collections::{HashMap, VecDeque};
use std::io::Write;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::time::timeout;

use stock_sent_social::error::{QueueError, ScoringError};
use stock_sent_social::pipeline::{MessageRecord, SentimentLabel, SentimentProcessor};
use stock_sent_social::queue::{
    ConsumerConfig, JsonLinesSource, MessageSource, ResultSink, SentimentConsumer,
};
use stock_sent_social::scoring::{LexiconScorer, PolarityScorer};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

// ── Test doubles ────────────────────────────────────────────────────

/// Source that replays a fixed list of deliveries, then reports exhaustion.
struct ScriptedSource {
    deliveries: Mutex<VecDeque<Result<Vec<MessageRecord>, QueueError>>>,
    /// Block forever instead of returning `None` once drained.
    hang_when_empty: bool,
}

impl ScriptedSource {
    fn new(deliveries: Vec<Result<Vec<MessageRecord>, QueueError>>) -> Self {
        Self {
            deliveries: Mutex::new(deliveries.into()),
            hang_when_empty: false,
        }
    }

    fn hanging(deliveries: Vec<Result<Vec<MessageRecord>, QueueError>>) -> Self {
        Self {
            hang_when_empty: true,
            ..Self::new(deliveries)
        }
    }
}

#[async_trait]
impl MessageSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn recv(&self) -> Result<Option<Vec<MessageRecord>>, QueueError> {
        let next = self.deliveries.lock().unwrap().pop_front();
        match next {
            Some(delivery) => delivery.map(Some),
            None if self.hang_when_empty => std::future::pending().await,
            None => Ok(None),
        }
    }
}

/// Sink that keeps everything it receives.
#[derive(Default)]
struct CollectingSink {
    published: Mutex<Vec<MessageRecord>>,
    rejected: Mutex<Vec<(MessageRecord, String)>>,
}

impl CollectingSink {
    fn published(&self) -> Vec<MessageRecord> {
        self.published.lock().unwrap().clone()
    }

    /// Published records keyed by their `id` field.
    fn by_id(&self) -> HashMap<String, MessageRecord> {
        self.published()
            .into_iter()
            .map(|r| (r.get("id").and_then(Value::as_str).unwrap().to_string(), r))
            .collect()
    }
}

#[async_trait]
impl ResultSink for CollectingSink {
    async fn publish(&self, record: MessageRecord) -> Result<(), QueueError> {
        self.published.lock().unwrap().push(record);
        Ok(())
    }

    async fn reject(&self, record: MessageRecord, reason: &str) -> Result<(), QueueError> {
        self.rejected
            .lock()
            .unwrap()
            .push((record, reason.to_string()));
        Ok(())
    }
}

/// Scorer driven by a lookup table; unknown text fails.
fn table_scorer(table: &[(&str, f64)]) -> Arc<dyn PolarityScorer> {
    let table: HashMap<String, f64> = table.iter().map(|(k, v)| (k.to_string(), *v)).collect();
    Arc::new(move |text: &str| -> Result<f64, ScoringError> {
        table
            .get(text)
            .copied()
            .ok_or_else(|| ScoringError::Backend(format!("cannot score '{text}'")))
    })
}

fn record(value: Value) -> MessageRecord {
    MessageRecord::try_from(value).unwrap()
}

fn consumer(
    scorer: Arc<dyn PolarityScorer>,
    source: Arc<dyn MessageSource>,
    sink: Arc<CollectingSink>,
    config: ConsumerConfig,
) -> SentimentConsumer {
    SentimentConsumer::new(
        Arc::new(SentimentProcessor::new(scorer)),
        source,
        sink,
        config,
    )
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn scores_every_scenario() {
    let scorer = table_scorer(&[
        ("I love this stock!", 0.5),
        ("This is terrible news.", -0.4),
        ("The market opened today.", 0.0),
        ("Right on the line", 0.1),
    ]);
    let source = Arc::new(ScriptedSource::new(vec![
        Ok(vec![record(json!({"id": "pos", "content": "I love this stock!"}))]),
        Ok(vec![record(json!({"id": "neg", "content": "This is terrible news."}))]),
        Ok(vec![record(json!({"id": "neu", "content": "The market opened today."}))]),
        Ok(vec![record(json!({"id": "none"}))]),
        Ok(vec![record(json!({"id": "err", "content": "???"}))]),
        Ok(vec![record(json!({"id": "edge", "content": "Right on the line"}))]),
    ]));
    let sink = Arc::new(CollectingSink::default());

    let stats = timeout(
        TEST_TIMEOUT,
        consumer(scorer, source, Arc::clone(&sink), ConsumerConfig::default()).run(),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(stats.received, 6);
    assert_eq!(stats.published(), 6);
    assert_eq!(stats.positive, 1);
    assert_eq!(stats.negative, 1);
    assert_eq!(stats.neutral, 2);
    assert_eq!(stats.unknown, 1);
    assert_eq!(stats.errored, 1);
    assert!(stats.finished_at.is_some());

    let out = sink.by_id();
    let expect = [
        ("pos", json!(0.5), "positive"),
        ("neg", json!(-0.4), "negative"),
        ("neu", json!(0.0), "neutral"),
        ("none", Value::Null, "unknown"),
        ("err", Value::Null, "error"),
        ("edge", json!(0.1), "neutral"),
    ];
    for (id, score, label) in expect {
        let r = &out[id];
        assert_eq!(r.get("sentiment_score"), Some(&score), "{id}");
        assert_eq!(r.get("sentiment_label"), Some(&json!(label)), "{id}");
    }
}

#[tokio::test]
async fn batches_are_decomposed() {
    let scorer = table_scorer(&[("a", 0.3), ("b", -0.3)]);
    let source = Arc::new(ScriptedSource::new(vec![Ok(vec![
        record(json!({"id": "1", "content": "a"})),
        record(json!({"id": "2", "content": "b"})),
        record(json!({"id": "3", "content": ""})),
    ])]));
    let sink = Arc::new(CollectingSink::default());

    let stats = consumer(scorer, source, Arc::clone(&sink), ConsumerConfig::default())
        .run()
        .await
        .unwrap();

    assert_eq!(stats.received, 3);
    let out = sink.by_id();
    assert_eq!(out["1"].label(), Some(SentimentLabel::Positive));
    assert_eq!(out["2"].label(), Some(SentimentLabel::Negative));
    assert_eq!(out["3"].label(), Some(SentimentLabel::Unknown));
}

#[tokio::test]
async fn malformed_delivery_is_skipped() {
    let scorer = table_scorer(&[("ok", 0.9)]);
    let source = Arc::new(ScriptedSource::new(vec![
        Err(QueueError::Malformed {
            line: 1,
            reason: "invalid JSON".into(),
        }),
        Ok(vec![record(json!({"id": "1", "content": "ok"}))]),
    ]));
    let sink = Arc::new(CollectingSink::default());

    let stats = consumer(scorer, source, Arc::clone(&sink), ConsumerConfig::default())
        .run()
        .await
        .unwrap();

    assert_eq!(stats.malformed, 1);
    assert_eq!(stats.received, 1);
    assert_eq!(sink.published().len(), 1);
}

#[tokio::test]
async fn fatal_source_error_ends_run_after_draining() {
    let scorer = table_scorer(&[("ok", 0.9)]);
    let source = Arc::new(ScriptedSource::new(vec![
        Ok(vec![record(json!({"id": "1", "content": "ok"}))]),
        Err(QueueError::Closed),
        Ok(vec![record(json!({"id": "2", "content": "ok"}))]),
    ]));
    let sink = Arc::new(CollectingSink::default());

    let result = consumer(scorer, source, Arc::clone(&sink), ConsumerConfig::default())
        .run()
        .await;

    assert!(matches!(result, Err(QueueError::Closed)));
    let published = sink.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].get("id"), Some(&json!("1")));
}

#[tokio::test]
async fn slow_scorer_is_rejected_after_timeout() {
    let scorer: Arc<dyn PolarityScorer> = Arc::new(|text: &str| -> Result<f64, ScoringError> {
        if text == "slow" {
            std::thread::sleep(Duration::from_millis(300));
        }
        Ok(0.5)
    });
    let source = Arc::new(ScriptedSource::new(vec![Ok(vec![
        record(json!({"id": "slow", "content": "slow"})),
        record(json!({"id": "fast", "content": "fast"})),
    ])]));
    let sink = Arc::new(CollectingSink::default());
    let config = ConsumerConfig {
        max_concurrency: 2,
        score_timeout: Some(Duration::from_millis(50)),
    };

    let stats = timeout(
        TEST_TIMEOUT,
        consumer(scorer, source, Arc::clone(&sink), config).run(),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(stats.rejected, 1);
    assert_eq!(stats.positive, 1);

    let rejected = sink.rejected.lock().unwrap();
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].0.get("id"), Some(&json!("slow")));
    // Rejected records go back untouched.
    assert!(rejected[0].0.get("sentiment_label").is_none());
    assert!(rejected[0].1.contains("timed out"));
}

#[tokio::test]
async fn timed_out_scorers_keep_their_concurrency_slot() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let scorer: Arc<dyn PolarityScorer> = {
        let in_flight = Arc::clone(&in_flight);
        let peak = Arc::clone(&peak);
        Arc::new(move |_: &str| -> Result<f64, ScoringError> {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(100));
            in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(0.5)
        })
    };
    let records = (0..4)
        .map(|i| record(json!({"id": i.to_string(), "content": "slow"})))
        .collect();
    let source = Arc::new(ScriptedSource::new(vec![Ok(records)]));
    let sink = Arc::new(CollectingSink::default());
    let config = ConsumerConfig {
        max_concurrency: 1,
        score_timeout: Some(Duration::from_millis(20)),
    };

    let stats = timeout(
        TEST_TIMEOUT,
        consumer(scorer, source, Arc::clone(&sink), config).run(),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(stats.received, 4);
    assert_eq!(stats.rejected, 4);
    assert!(sink.published().is_empty());
    assert_eq!(peak.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn invalid_utf8_line_is_skipped() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, r#"{{"id": "a", "content": "great"}}"#).unwrap();
    file.write_all(b"\xff\xfe{\"id\": \"x\"}\n").unwrap();
    writeln!(file, r#"{{"id": "b", "content": "awful"}}"#).unwrap();
    file.flush().unwrap();

    let source = Arc::new(JsonLinesSource::open(file.path()).await.unwrap());
    let sink = Arc::new(CollectingSink::default());
    let scorer = table_scorer(&[("great", 0.8), ("awful", -0.8)]);

    let stats = timeout(
        TEST_TIMEOUT,
        consumer(scorer, source, Arc::clone(&sink), ConsumerConfig::default()).run(),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(stats.malformed, 1);
    assert_eq!(stats.received, 2);
    let out = sink.by_id();
    assert_eq!(out["a"].label(), Some(SentimentLabel::Positive));
    assert_eq!(out["b"].label(), Some(SentimentLabel::Negative));
}

#[tokio::test]
async fn panicking_scorer_yields_error_label() {
    let scorer: Arc<dyn PolarityScorer> = Arc::new(|text: &str| -> Result<f64, ScoringError> {
        if text == "boom" {
            panic!("scorer blew up");
        }
        Ok(-0.8)
    });
    let source = Arc::new(ScriptedSource::new(vec![Ok(vec![
        record(json!({"id": "boom", "content": "boom", "lang": "en"})),
        record(json!({"id": "fine", "content": "fine"})),
    ])]));
    let sink = Arc::new(CollectingSink::default());

    let stats = consumer(scorer, source, Arc::clone(&sink), ConsumerConfig::default())
        .run()
        .await
        .unwrap();

    assert_eq!(stats.errored, 1);
    assert_eq!(stats.negative, 1);
    let out = sink.by_id();
    assert_eq!(out["boom"].label(), Some(SentimentLabel::Error));
    assert_eq!(out["boom"].get("sentiment_score"), Some(&Value::Null));
    assert_eq!(out["boom"].get("lang"), Some(&json!("en")));
}

#[tokio::test]
async fn concurrency_is_bounded() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let scorer: Arc<dyn PolarityScorer> = {
        let in_flight = Arc::clone(&in_flight);
        let peak = Arc::clone(&peak);
        Arc::new(move |_: &str| -> Result<f64, ScoringError> {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(20));
            in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(0.0)
        })
    };
    let records = (0..8)
        .map(|i| record(json!({"id": i.to_string(), "content": "x"})))
        .collect();
    let source = Arc::new(ScriptedSource::new(vec![Ok(records)]));
    let sink = Arc::new(CollectingSink::default());
    let config = ConsumerConfig {
        max_concurrency: 2,
        score_timeout: None,
    };

    let stats = timeout(
        TEST_TIMEOUT,
        consumer(scorer, source, Arc::clone(&sink), config).run(),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(stats.neutral, 8);
    assert!(peak.load(Ordering::SeqCst) <= 2);
    assert_eq!(sink.published().len(), 8);
}

#[tokio::test]
async fn shutdown_stops_a_waiting_consumer() {
    let scorer = table_scorer(&[("ok", 0.2)]);
    let source = Arc::new(ScriptedSource::hanging(vec![Ok(vec![record(
        json!({"id": "1", "content": "ok"}),
    )])]));
    let sink = Arc::new(CollectingSink::default());
    let consumer = consumer(scorer, source, Arc::clone(&sink), ConsumerConfig::default());

    let handle = consumer.shutdown_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.trigger();
    });

    let stats = timeout(TEST_TIMEOUT, consumer.run())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(stats.received, 1);
    assert_eq!(stats.positive, 1);
}

#[tokio::test]
async fn file_source_with_lexicon_scorer() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, r#"{{"id": "a", "content": "Earnings beat, very bullish"}}"#).unwrap();
    writeln!(file, r#"{{"id": "b", "content": "Terrible quarter, stock will crash"}}"#).unwrap();
    writeln!(file).unwrap();
    writeln!(file, "this line is not json").unwrap();
    writeln!(file, r#"[{{"id": "c", "content": null}}, {{"id": "d", "content": "Opened at 10am"}}]"#)
        .unwrap();
    file.flush().unwrap();

    let source = Arc::new(JsonLinesSource::open(file.path()).await.unwrap());
    let sink = Arc::new(CollectingSink::default());
    let scorer: Arc<dyn PolarityScorer> = Arc::new(LexiconScorer::new());

    let stats = consumer(scorer, source, Arc::clone(&sink), ConsumerConfig::default())
        .run()
        .await
        .unwrap();

    assert_eq!(stats.received, 4);
    assert_eq!(stats.malformed, 1);

    let out = sink.by_id();
    assert_eq!(out["a"].label(), Some(SentimentLabel::Positive));
    assert_eq!(out["b"].label(), Some(SentimentLabel::Negative));
    assert_eq!(out["c"].label(), Some(SentimentLabel::Unknown));
    assert_eq!(out["d"].label(), Some(SentimentLabel::Neutral));
    assert_eq!(out["d"].get("sentiment_score"), Some(&json!(0.0)));
}
