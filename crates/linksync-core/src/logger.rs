//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::error::BoxError;

/// Install the global fmt subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `level` is used as the filter
/// directive, falling back to `info` when it does not parse. Fails if a
/// global subscriber is already installed.
pub fn init_logger(level: &str) -> Result<(), BoxError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init()
}
