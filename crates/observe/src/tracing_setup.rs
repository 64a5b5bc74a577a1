//! Process-wide `tracing` initialization, grounded in the teacher's
//! `observe` crate role of being the one place that calls
//! `tracing_subscriber::fmt().init()` for every binary.

use tracing_subscriber::{fmt, EnvFilter};

/// Initializes the global `tracing` subscriber from `env_filter` (typically
/// the `RUST_LOG` equivalent passed as a CLI flag/env var, following the
/// `%ENV_VAR`-free convention here since log level isn't a secret). `json`
/// selects structured JSON lines (suited to log aggregation) over plain
/// human-readable lines (suited to local development).
///
/// Must be called exactly once per process, before any other `tracing` call.
pub fn initialize(env_filter: &str, json: bool) {
    let filter = EnvFilter::try_new(env_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter).with_target(true);
    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
