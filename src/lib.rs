//! Stock-Sent-Social: sentiment enrichment for social-media messages.

pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod queue;
pub mod scoring;
