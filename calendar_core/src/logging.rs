//! Logging infrastructure for kal.
//!
//! Provides centralized tracing setup for the CLI and tests.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize logging with sensible defaults
///
/// Default level is WARN so command output stays clean; override with
/// RUST_LOG (e.g. `RUST_LOG=calendar_core=debug`).
pub fn init() {
    init_with_level("warn")
}

/// Install the stderr subscriber, filtering at `default_level` unless
/// RUST_LOG supplies a directive.
///
/// Panics if a global subscriber is already set, so call it once from `main`.
pub fn init_with_level(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

/// Initialize logging for testing (captures logs for test output)
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}
