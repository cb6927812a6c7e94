//! Typed error definitions for linksync.
//!
//! Errors here are produced at configuration load time only. Runtime sync
//! failures live in `linksync-core` because they may carry a non-serializable
//! source error.

mod config;

pub use config::ConfigError;

/// Standard Result type using ConfigError.
pub type Result<T> = std::result::Result<T, ConfigError>;
