//! Logging configuration for querygate.
//!
//! Logs go to stderr with an env-filter (`RUST_LOG`), which keeps stdout
//! clean for anything the process itself wants to print and plays well with
//! container log collection.

use tracing_subscriber::EnvFilter;

/// Initializes stderr logging with `RUST_LOG` filtering, defaulting to
/// `info`.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
