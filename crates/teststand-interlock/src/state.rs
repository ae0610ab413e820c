//! Interlock states.

/// Operational state of the stand.
///
/// `Safe` is initial. `Aborted` is reachable from every state and is left
/// only through an explicit reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SystemState {
    /// Outputs held at their safe levels; operator commands disabled.
    #[default]
    Safe,
    /// Operator valve commands enabled; ignition may start.
    Armed,
    /// Ignition sequence running.
    Firing,
    /// Safe levels forced after an abort; waiting for reset.
    Aborted,
}

impl SystemState {
    /// Upper-case name used in events and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Safe => "SAFE",
            Self::Armed => "ARMED",
            Self::Firing => "FIRING",
            Self::Aborted => "ABORTED",
        }
    }

    /// Whether valves may be driven away from their safe levels.
    #[must_use]
    pub fn permits_actuation(self) -> bool {
        matches!(self, Self::Armed | Self::Firing)
    }

    /// Whether only a reset can leave this state.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Aborted)
    }
}

impl core::fmt::Display for SystemState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
