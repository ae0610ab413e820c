//! Error types for configuration loading and validation.

use thiserror::Error;

/// Errors raised while loading or validating a [`StandConfig`](crate::StandConfig).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A value is outside its permitted range.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The same logical name was declared twice.
    #[error("Duplicate {kind} name: {name}")]
    DuplicateName {
        /// What was duplicated ("channel", "valve" or "limit").
        kind: &'static str,
        /// The duplicated logical name.
        name: String,
    },

    /// The configuration document could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

impl ConfigError {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_configuration(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration(reason.into())
    }

    /// Create a duplicate name error.
    #[must_use]
    pub fn duplicate(kind: &'static str, name: impl Into<String>) -> Self {
        Self::DuplicateName {
            kind,
            name: name.into(),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// A specialized `Result` type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
