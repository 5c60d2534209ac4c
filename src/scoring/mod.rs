//! Polarity scoring capability.
//!
//! The pipeline only knows `text -> polarity` through [`PolarityScorer`].
//! The built-in [`LexiconScorer`] is one implementation; anything else
//! (a model server, a different library) plugs in behind the same trait.

pub mod lexicon;

pub use lexicon::LexiconScorer;

use crate::error::ScoringError;

/// Opaque text polarity capability.
///
/// Implementations are expected to return a value in `[-1.0, 1.0]`.
/// Calls are synchronous and may block for as long as the backend needs.
pub trait PolarityScorer: Send + Sync {
    /// Scorer name, for logging.
    fn name(&self) -> &str;

    /// Score the polarity of `text`.
    fn polarity(&self, text: &str) -> Result<f64, ScoringError>;
}

impl<F> PolarityScorer for F
where
    F: Fn(&str) -> Result<f64, ScoringError> + Send + Sync,
{
    fn name(&self) -> &str {
        "fn"
    }

    fn polarity(&self, text: &str) -> Result<f64, ScoringError> {
        self(text)
    }
}
