//! Facade error types.

use std::io;

use teststand_config::ConfigError;
use teststand_interlock::InterlockError;
use teststand_watchdog::WatchdogError;
use thiserror::Error;

/// Errors raised while building or running a [`TestStand`](crate::TestStand).
#[derive(Debug, Error)]
pub enum StandError {
    /// The configuration failed validation.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The watchdogs could not be built from the configuration.
    #[error("Watchdog setup failed: {0}")]
    Watchdog(#[from] WatchdogError),

    /// The interlock refused construction or initialization.
    #[error("Interlock error: {0}")]
    Interlock(#[from] InterlockError),

    /// A worker thread could not be started.
    #[error("Failed to spawn {worker} thread: {source}")]
    Spawn {
        /// Worker name.
        worker: &'static str,
        /// Underlying OS error.
        source: io::Error,
    },

    /// A worker thread panicked before it could be joined.
    #[error("{0} thread panicked")]
    WorkerPanicked(&'static str),

    /// `start` was called while the workers are running.
    #[error("Test stand is already running")]
    AlreadyRunning,
}

impl StandError {
    /// Create a spawn error.
    #[must_use]
    pub fn spawn(worker: &'static str, source: io::Error) -> Self {
        Self::Spawn { worker, source }
    }
}

/// A specialized `Result` type for facade operations.
pub type StandResult<T> = std::result::Result<T, StandError>;
