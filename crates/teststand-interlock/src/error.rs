//! Interlock error types.

use teststand_hal::HalError;
use thiserror::Error;

use crate::state::SystemState;

/// Reasons a command or transition is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterlockError {
    /// The command is not allowed in the current state.
    #[error("{command} not allowed in state {state}")]
    InvalidTransition {
        /// Command that was refused.
        command: &'static str,
        /// State at the time of the command.
        state: SystemState,
    },

    /// The valve name is not configured.
    #[error("Unknown valve: {0}")]
    UnknownValve(String),

    /// The hardware refused a valve write.
    #[error("Actuation of {valve} failed: {source}")]
    ActuationFailed {
        /// Valve being driven.
        valve: String,
        /// Underlying hardware error.
        source: HalError,
    },

    /// The sequencer thread could not be started.
    #[error("Failed to spawn ignition sequencer: {0}")]
    SpawnFailed(String),
}

impl InterlockError {
    /// Create an invalid transition error.
    #[must_use]
    pub fn invalid_transition(command: &'static str, state: SystemState) -> Self {
        Self::InvalidTransition { command, state }
    }

    /// Create an actuation failure.
    #[must_use]
    pub fn actuation_failed(valve: impl Into<String>, source: HalError) -> Self {
        Self::ActuationFailed {
            valve: valve.into(),
            source,
        }
    }
}

/// A specialized `Result` type for interlock operations.
pub type InterlockResult<T> = std::result::Result<T, InterlockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = InterlockError::invalid_transition("toggle_valve", SystemState::Safe);
        assert_eq!(err.to_string(), "toggle_valve not allowed in state SAFE");

        let err = InterlockError::actuation_failed("MOV", HalError::unknown_valve("MOV"));
        assert_eq!(err.to_string(), "Actuation of MOV failed: Unknown valve: MOV");
    }
}
