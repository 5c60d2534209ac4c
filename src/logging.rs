//! Process-wide diagnostic sink.
//!
//! Components never hold a logger handle. They emit `tracing` events under
//! their module path, and whichever subscriber is in scope receives them:
//! the global one installed here in production, a scoped capturing one in tests.

use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

use crate::config::{LogConfig, LogFormat};

static INSTALLED: OnceLock<bool> = OnceLock::new();

/// Install the global subscriber. Only the first call does anything.
///
/// Returns `true` if this call installed the subscriber. Later calls keep
/// the original configuration and return `false`.
pub fn init(config: &LogConfig) -> bool {
    let mut installed_now = false;
    INSTALLED.get_or_init(|| {
        installed_now = install(config);
        installed_now
    });
    installed_now
}

fn install(config: &LogConfig) -> bool {
    let filter =
        EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("info"));

    // Output goes to stderr; stdout carries the enriched records.
    let result = match config.format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .try_init(),
    };

    // Someone else (e.g. a test harness) already owns the global dispatcher.
    result.is_ok()
}
