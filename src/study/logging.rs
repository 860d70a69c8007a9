use std::io;

use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LEVEL: &str = "warn";

/// Installs the global subscriber, writing to stderr.
///
/// The filter comes from `STUDY_LOG`, then `RUST_LOG`, then [`DEFAULT_LEVEL`].
pub fn init() {
    let filter = EnvFilter::try_from_env("STUDY_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL));

    fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
