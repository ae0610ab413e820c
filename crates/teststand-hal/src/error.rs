//! Hardware error types.
//!
//! `DeviceError` is transient: callers skip the tick and let the heartbeat
//! watchdog escalate. `HalError::UnknownValve` and `HalError::UnknownChannel`
//! are configuration errors: callers log them and carry on.

use thiserror::Error;

/// Communication failures with an acquisition device.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// Device is not reachable.
    #[error("Device disconnected: {0}")]
    Disconnected(String),

    /// A read or write transaction failed.
    #[error("Communication error with device {device}: {message}")]
    Communication {
        /// Device identifier.
        device: String,
        /// Error message.
        message: String,
    },

    /// The device did not answer in time.
    #[error("Device {device} timeout after {timeout_ms}ms")]
    Timeout {
        /// Device identifier.
        device: String,
        /// Timeout in milliseconds.
        timeout_ms: u64,
    },

    /// The channel was closed.
    #[error("Device {0} is closed")]
    Closed(String),
}

impl DeviceError {
    /// Create a communication error.
    #[must_use]
    pub fn communication(device: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Communication {
            device: device.into(),
            message: message.into(),
        }
    }
}

/// Errors returned by [`HardwareChannel`](crate::HardwareChannel) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HalError {
    /// Device communication failed.
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// The valve name has no physical mapping.
    #[error("Unknown valve: {0}")]
    UnknownValve(String),

    /// The channel name has no physical mapping.
    #[error("Unknown channel: {0}")]
    UnknownChannel(String),
}

impl HalError {
    /// Create an unknown valve error.
    #[must_use]
    pub fn unknown_valve(name: impl Into<String>) -> Self {
        Self::UnknownValve(name.into())
    }

    /// Whether this error stems from configuration rather than the device.
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::UnknownValve(_) | Self::UnknownChannel(_))
    }
}

/// A specialized `Result` type for hardware operations.
pub type HalResult<T> = std::result::Result<T, HalError>;
