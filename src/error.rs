//! Error types for the sentiment service.

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Failures raised by a polarity scorer.
///
/// These never escape the pipeline: the classifier turns every one of them
/// into the `error` label.
#[derive(Debug, thiserror::Error)]
pub enum ScoringError {
    #[error("Nothing to score")]
    EmptyInput,

    #[error("Input too large: {length} chars > {max}")]
    InputTooLarge { length: usize, max: usize },

    #[error("Scorer returned a non-finite polarity: {0}")]
    NonFinite(f64),

    #[error("Scorer returned polarity {0} outside [-1.0, 1.0]")]
    OutOfRange(f64),

    #[error("Content is not text (got {kind})")]
    UnsupportedContent { kind: String },

    #[error("Scoring backend failed: {0}")]
    Backend(String),
}

/// Errors from the queue-consumption layer.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed delivery at line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("Source closed")]
    Closed,

    #[error("Publish failed: {0}")]
    Publish(String),
}

impl QueueError {
    /// Whether the consumer must stop pulling from the source.
    ///
    /// A malformed delivery only loses that delivery; everything else means
    /// the transport itself is broken.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Malformed { .. })
    }
}
