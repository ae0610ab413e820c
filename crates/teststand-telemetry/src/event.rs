//! Audit events published by the control core.

use std::time::Duration;

use serde::Serialize;

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// The interlock moved between states.
    StateTransition {
        /// Previous state name.
        from: &'static str,
        /// New state name.
        to: &'static str,
    },
    /// A valve output was driven.
    ValveChanged {
        /// Logical valve name.
        valve: String,
        /// Commanded level.
        state: bool,
    },
    /// A watchdog raised an abort condition.
    WatchdogTrip {
        /// Human-readable reason.
        reason: String,
    },
    /// The ignition sequencer reached a step or marker.
    SequenceStep,
    /// An operator command was refused.
    CommandRejected {
        /// Command name.
        command: String,
        /// Why it was refused.
        reason: String,
    },
}

/// A timestamped audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    /// Short label such as `ARM`, `Vent_OPEN` or `IGNITION_ABORTED`.
    pub label: String,
    /// Monotonic offset from the hub epoch.
    pub offset: Duration,
    /// Structured detail.
    pub kind: EventKind,
}

impl Event {
    /// Create an event.
    #[must_use]
    pub fn new(label: impl Into<String>, offset: Duration, kind: EventKind) -> Self {
        Self {
            label: label.into(),
            offset,
            kind,
        }
    }

    /// Whether this event records a state transition into `state`.
    #[must_use]
    pub fn is_transition_to(&self, state: &str) -> bool {
        matches!(self.kind, EventKind::StateTransition { to, .. } if to == state)
    }
}
