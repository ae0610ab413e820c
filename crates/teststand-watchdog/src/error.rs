//! Watchdog error types.

use thiserror::Error;

/// Errors raised while constructing watchdogs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WatchdogError {
    /// Invalid watchdog parameters.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Two limits were given for one channel.
    #[error("Duplicate limit for channel: {0}")]
    DuplicateLimit(String),
}

impl WatchdogError {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }
}

/// A specialized `Result` type for watchdog operations.
pub type WatchdogResult<T> = std::result::Result<T, WatchdogError>;
