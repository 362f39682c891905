// src/infra/logger.rs — Structured logging with tracing

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber. Logs go to stderr, keeping stdout for
/// command output.
///
/// Precedence: RUST_LOG, then SITERELAY_LOG, then `level`.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_from_env("SITERELAY_LOG"))
        .unwrap_or_else(|_| EnvFilter::new(level));

    // A second init (tests, embedding) is not an error worth surfacing.
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}
