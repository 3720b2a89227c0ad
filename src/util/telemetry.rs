//! Telemetry helpers for structured logging.

use tracing_subscriber::EnvFilter;

/// Initialize tracing for a daemon process.
///
/// Embedders can install their own subscriber before calling this; the
/// helper only installs the env-based default when none is set. Without
/// `RUST_LOG` the filter falls back to `info` so slot activity is visible
/// out of the box.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
