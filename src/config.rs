//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Default number of records scored at the same time.
const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Default cap on content length handed to the lexicon scorer.
pub const DEFAULT_MAX_CONTENT_CHARS: usize = 10_000;

/// Where records are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Stdin,
    File(PathBuf),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `info` or `stock_sent_social::pipeline=debug`.
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub input: InputSource,
    /// Maximum records scored concurrently.
    pub max_concurrency: usize,
    /// Per-record timeout imposed by the consumer. `None` waits indefinitely.
    pub score_timeout: Option<Duration>,
    /// Inputs longer than this (in chars) fail scoring.
    pub max_content_chars: usize,
    pub log: LogConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            input: InputSource::Stdin,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            score_timeout: None,
            max_content_chars: DEFAULT_MAX_CONTENT_CHARS,
            log: LogConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from `SENTIMENT_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let input = match lookup("SENTIMENT_INPUT").map(|s| s.trim().to_string()) {
            None => InputSource::Stdin,
            Some(s) if s.is_empty() || s == "-" => InputSource::Stdin,
            Some(path) => InputSource::File(PathBuf::from(path)),
        };

        let max_concurrency =
            parse_var(&lookup, "SENTIMENT_MAX_CONCURRENCY")?.unwrap_or(defaults.max_concurrency);
        if max_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                key: "SENTIMENT_MAX_CONCURRENCY".into(),
                message: "must be at least 1".into(),
            });
        }

        let score_timeout =
            parse_var::<u64, _>(&lookup, "SENTIMENT_SCORE_TIMEOUT_MS")?.map(Duration::from_millis);

        let max_content_chars = parse_var(&lookup, "SENTIMENT_MAX_CONTENT_CHARS")?
            .unwrap_or(defaults.max_content_chars);

        let filter = lookup("SENTIMENT_LOG").unwrap_or(defaults.log.filter);
        let format = match lookup("SENTIMENT_LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("") | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "SENTIMENT_LOG_FORMAT".into(),
                    message: format!("expected 'text' or 'json', got '{other}'"),
                });
            }
        };

        Ok(Self {
            input,
            max_concurrency,
            score_timeout,
            max_content_chars,
            log: LogConfig { filter, format },
        })
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("'{raw}': {e}"),
            }),
    }
}
