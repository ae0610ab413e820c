//! Operator command results.

use std::fmt;

/// Result of one operator command.
///
/// Commands never fail the host; a refused command is reported here and as
/// a `CommandRejected` event.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct CommandOutcome {
    /// Command name, e.g. `"arm"`.
    pub command: &'static str,
    /// Whether the command took effect.
    pub accepted: bool,
    /// Refusal reason, or a note for accepted no-ops.
    pub reason: Option<String>,
}

impl CommandOutcome {
    /// An accepted command.
    pub fn accepted(command: &'static str) -> Self {
        Self {
            command,
            accepted: true,
            reason: None,
        }
    }

    /// An accepted command that changed nothing.
    pub fn accepted_with_note(command: &'static str, note: impl Into<String>) -> Self {
        Self {
            command,
            accepted: true,
            reason: Some(note.into()),
        }
    }

    /// A refused command.
    pub fn rejected(command: &'static str, reason: impl Into<String>) -> Self {
        Self {
            command,
            accepted: false,
            reason: Some(reason.into()),
        }
    }

    /// Map a fallible operation to an outcome.
    pub fn from_result<E: fmt::Display>(command: &'static str, result: Result<(), E>) -> Self {
        match result {
            Ok(()) => Self::accepted(command),
            Err(err) => Self::rejected(command, err.to_string()),
        }
    }

    /// Whether the command took effect.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        self.accepted
    }
}

impl fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.accepted { "accepted" } else { "rejected" };
        match &self.reason {
            Some(reason) => write!(f, "{} {verdict}: {reason}", self.command),
            None => write!(f, "{} {verdict}", self.command),
        }
    }
}
