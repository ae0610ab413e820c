//! Abort conditions raised by the watchdogs.

use std::fmt;
use std::time::Duration;

/// A safety violation. Every condition escalates to an interlock abort.
#[derive(Debug, Clone, PartialEq)]
pub enum AbortCondition {
    /// A channel stayed above its bound for the required number of samples.
    ThresholdExceeded {
        /// Offending channel.
        channel: String,
        /// Value of the sample that completed (or extended) the streak.
        value: f64,
        /// Configured upper bound.
        limit: f64,
        /// Current streak length.
        consecutive: u32,
    },
    /// No successful acquisition for longer than the timeout.
    HeartbeatTimeout {
        /// Time since the last beat.
        elapsed: Duration,
        /// Configured timeout.
        timeout: Duration,
    },
}

impl AbortCondition {
    /// Short operator-facing reason.
    #[must_use]
    pub fn reason(&self) -> String {
        match self {
            Self::ThresholdExceeded {
                channel,
                value,
                limit,
                ..
            } => format!("{channel} over limit ({value:.1} > {limit})"),
            Self::HeartbeatTimeout { .. } => "DAQ heartbeat timeout".to_string(),
        }
    }

    /// Channel for threshold conditions.
    #[must_use]
    pub fn channel(&self) -> Option<&str> {
        match self {
            Self::ThresholdExceeded { channel, .. } => Some(channel),
            Self::HeartbeatTimeout { .. } => None,
        }
    }

    /// Whether this is a heartbeat timeout.
    #[must_use]
    pub fn is_heartbeat_timeout(&self) -> bool {
        matches!(self, Self::HeartbeatTimeout { .. })
    }
}

impl fmt::Display for AbortCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason())
    }
}
