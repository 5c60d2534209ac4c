//! Lexicon-based polarity scorer.
//!
//! Each token found in the lexicon contributes one assessment. A preceding
//! negator flips and damps it, a preceding intensifier scales it. The
//! polarity is the mean of all assessments, clamped to `[-1.0, 1.0]`.
//! Text with no lexicon hits scores `0.0`.

use std::collections::{HashMap, HashSet};

use regex::Regex;

use super::PolarityScorer;
use crate::config::DEFAULT_MAX_CONTENT_CHARS;
use crate::error::ScoringError;

/// Multiplier applied to a negated assessment ("not good" is mildly negative,
/// not the mirror image of "good").
const NEGATION_FACTOR: f64 = -0.5;

/// How many tokens a negator or intensifier reaches forward.
const MODIFIER_WINDOW: usize = 3;

// ── Default lexicon ─────────────────────────────────────────────────

const POSITIVE_WORDS: &[(&str, f64)] = &[
    // General
    ("love", 0.5),
    ("loved", 0.6),
    ("like", 0.2),
    ("good", 0.7),
    ("great", 0.8),
    ("excellent", 1.0),
    ("amazing", 0.6),
    ("awesome", 1.0),
    ("fantastic", 0.4),
    ("best", 1.0),
    ("better", 0.5),
    ("happy", 0.8),
    ("nice", 0.6),
    ("win", 0.8),
    ("winning", 0.5),
    ("exciting", 0.3),
    ("impressive", 1.0),
    ("solid", 0.3),
    ("perfect", 1.0),
    ("glad", 0.5),
    // Market
    ("bullish", 0.8),
    ("surge", 0.7),
    ("surging", 0.7),
    ("rally", 0.7),
    ("soar", 0.8),
    ("soaring", 0.8),
    ("gain", 0.5),
    ("gains", 0.5),
    ("profit", 0.6),
    ("profitable", 0.6),
    ("growth", 0.6),
    ("outperform", 0.7),
    ("beat", 0.6),
    ("strong", 0.4),
    ("upgrade", 0.6),
    ("rebound", 0.5),
    ("recovery", 0.5),
    ("moon", 0.6),
];

const NEGATIVE_WORDS: &[(&str, f64)] = &[
    // General
    ("hate", -0.8),
    ("bad", -0.7),
    ("terrible", -1.0),
    ("awful", -1.0),
    ("horrible", -1.0),
    ("worst", -1.0),
    ("worse", -0.4),
    ("poor", -0.4),
    ("sad", -0.5),
    ("angry", -0.5),
    ("disappointing", -0.6),
    ("disappointed", -0.75),
    ("ugly", -0.7),
    ("scary", -0.5),
    ("useless", -0.5),
    ("lose", -0.5),
    ("losing", -0.5),
    // Market
    ("bearish", -0.8),
    ("crash", -0.9),
    ("crashing", -0.9),
    ("plunge", -0.8),
    ("drop", -0.5),
    ("decline", -0.6),
    ("loss", -0.6),
    ("losses", -0.6),
    ("weak", -0.4),
    ("downgrade", -0.6),
    ("dump", -0.7),
    ("fraud", -0.9),
    ("scam", -0.9),
    ("bankrupt", -0.9),
    ("bankruptcy", -0.9),
    ("crisis", -0.8),
    ("fear", -0.6),
];

const NEGATORS: &[&str] = &[
    "not", "no", "never", "none", "nothing", "neither", "nor", "cannot", "cant", "can't",
    "don't", "dont", "doesn't", "doesnt", "didn't", "didnt", "isn't", "isnt", "aren't", "arent",
    "wasn't", "wasnt", "won't", "wont", "wouldn't", "wouldnt", "hardly",
];

const INTENSIFIERS: &[(&str, f64)] = &[
    ("very", 1.3),
    ("really", 1.3),
    ("so", 1.2),
    ("super", 1.3),
    ("extremely", 1.5),
    ("incredibly", 1.5),
    ("totally", 1.3),
    ("absolutely", 1.5),
    ("slightly", 0.5),
    ("somewhat", 0.7),
    ("kinda", 0.7),
];

/// Word-list polarity scorer.
pub struct LexiconScorer {
    words: HashMap<String, f64>,
    negators: HashSet<String>,
    intensifiers: HashMap<String, f64>,
    token_re: Regex,
    max_chars: usize,
}

impl Default for LexiconScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl LexiconScorer {
    /// Create a scorer with the built-in general + market lexicon.
    pub fn new() -> Self {
        let words = POSITIVE_WORDS
            .iter()
            .chain(NEGATIVE_WORDS)
            .map(|(w, s)| (w.to_string(), *s))
            .collect();
        let negators = NEGATORS.iter().map(|w| w.to_string()).collect();
        let intensifiers = INTENSIFIERS
            .iter()
            .map(|(w, m)| (w.to_string(), *m))
            .collect();

        Self {
            words,
            negators,
            intensifiers,
            token_re: Regex::new(r"[a-z]+(?:'[a-z]+)?").expect("token pattern is valid"),
            max_chars: DEFAULT_MAX_CONTENT_CHARS,
        }
    }

    /// Cap the input length; longer inputs fail with `InputTooLarge`.
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    /// Add or override a lexicon entry. Scores are clamped to `[-1.0, 1.0]`.
    pub fn with_word(mut self, word: &str, score: f64) -> Self {
        self.words.insert(word.to_lowercase(), score.clamp(-1.0, 1.0));
        self
    }

    fn assess(&self, text: &str) -> Vec<f64> {
        // Fold typographic apostrophes so "don’t" tokenizes like "don't".
        let lowered = text.to_lowercase().replace(['\u{2019}', '\u{2018}'], "'");
        let mut assessments = Vec::new();

        let mut negated = false;
        let mut boost = 1.0;
        // Tokens since the last modifier; modifiers expire past the window.
        let mut distance = 0usize;

        for token in self.token_re.find_iter(&lowered).map(|m| m.as_str()) {
            if self.negators.contains(token) {
                negated = !negated;
                distance = 0;
                continue;
            }
            if let Some(mult) = self.intensifiers.get(token) {
                boost *= mult;
                distance = 0;
                continue;
            }

            distance += 1;
            if distance > MODIFIER_WINDOW {
                negated = false;
                boost = 1.0;
            }

            if let Some(&score) = self.words.get(token) {
                let mut value = score * boost;
                if negated {
                    value *= NEGATION_FACTOR;
                }
                assessments.push(value.clamp(-1.0, 1.0));
                negated = false;
                boost = 1.0;
            }
        }

        assessments
    }
}

impl PolarityScorer for LexiconScorer {
    fn name(&self) -> &str {
        "lexicon"
    }

    fn polarity(&self, text: &str) -> Result<f64, ScoringError> {
        if text.is_empty() {
            return Err(ScoringError::EmptyInput);
        }
        let length = text.chars().count();
        if length > self.max_chars {
            return Err(ScoringError::InputTooLarge {
                length,
                max: self.max_chars,
            });
        }

        let assessments = self.assess(text);
        if assessments.is_empty() {
            return Ok(0.0);
        }
        let mean = assessments.iter().sum::<f64>() / assessments.len() as f64;
        Ok(mean.clamp(-1.0, 1.0))
    }
}
