//! Shared types for the sentiment pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field holding the text to score.
pub const CONTENT_FIELD: &str = "content";

/// Reserved field for the numeric polarity.
pub const SCORE_FIELD: &str = "sentiment_score";

/// Reserved field for the categorical label.
pub const LABEL_FIELD: &str = "sentiment_label";

// ── Message record ──────────────────────────────────────────────────

/// One social-media message as delivered by the queue.
///
/// An open JSON object. The pipeline reads `content` and writes the two
/// reserved sentiment fields; every other field passes through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageRecord(Map<String, Value>);

impl MessageRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Set a field, replacing any existing value.
    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, field: impl Into<String>, value: Value) -> Self {
        self.insert(field, value);
        self
    }

    /// Raw `content` value, if the key exists.
    pub fn content(&self) -> Option<&Value> {
        self.get(CONTENT_FIELD)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the record has no fields at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Write a sentiment result into the reserved fields.
    pub fn apply(&mut self, result: &SentimentResult) {
        self.insert(SCORE_FIELD, result.score_value());
        self.insert(LABEL_FIELD, Value::String(result.label.as_str().to_string()));
    }

    /// The sentiment label currently stored on the record, if any.
    pub fn label(&self) -> Option<SentimentLabel> {
        self.get(LABEL_FIELD)
            .and_then(Value::as_str)
            .and_then(SentimentLabel::parse)
    }
}

impl From<Map<String, Value>> for MessageRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for MessageRecord {
    type Error = Value;

    /// Succeeds only for JSON objects; anything else is handed back.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(other),
        }
    }
}

// ── Sentiment label ─────────────────────────────────────────────────

/// Categorical sentiment verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
    /// No usable content.
    Unknown,
    /// The scorer failed.
    Error,
}

impl SentimentLabel {
    /// Wire name of the label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
            Self::Unknown => "unknown",
            Self::Error => "error",
        }
    }

    /// Parse a wire name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "positive" => Some(Self::Positive),
            "neutral" => Some(Self::Neutral),
            "negative" => Some(Self::Negative),
            "unknown" => Some(Self::Unknown),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// True for the three labels produced by a successful score.
    pub fn is_scored(&self) -> bool {
        matches!(self, Self::Positive | Self::Neutral | Self::Negative)
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Sentiment result ────────────────────────────────────────────────

/// Score and label for one message.
///
/// Only the constructors here build it, so `score` is `Some` exactly when
/// the label is positive, neutral or negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentimentResult {
    score: Option<f64>,
    pub label: SentimentLabel,
}

impl SentimentResult {
    /// A successful score. Callers must pass a finite value in `[-1.0, 1.0]`.
    pub(crate) fn scored(score: f64, label: SentimentLabel) -> Self {
        debug_assert!(label.is_scored());
        Self {
            score: Some(score),
            label,
        }
    }

    /// No content to score.
    pub fn unknown() -> Self {
        Self {
            score: None,
            label: SentimentLabel::Unknown,
        }
    }

    /// The scorer failed.
    pub fn error() -> Self {
        Self {
            score: None,
            label: SentimentLabel::Error,
        }
    }

    pub fn score(&self) -> Option<f64> {
        self.score
    }

    /// Score as a JSON value (`null` when absent).
    fn score_value(&self) -> Value {
        self.score
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}
