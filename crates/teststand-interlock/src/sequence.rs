//! Ignition sequences as data.

use std::collections::BTreeSet;
use std::time::Duration;

use teststand_hal::ValveCommand;

use crate::error::{InterlockError, InterlockResult};

/// What a step does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    /// Drive one valve.
    Valve(ValveCommand),
    /// Hold for a fixed time.
    Delay(Duration),
}

/// One step of an ignition sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceStep {
    /// Action to perform.
    pub action: StepAction,
    /// Label published when the step executes.
    pub label: String,
}

impl SequenceStep {
    /// A valve step labelled `<VALVE>_ON` or `<VALVE>_OFF`.
    #[must_use]
    pub fn valve(command: ValveCommand) -> Self {
        Self {
            label: command.label(),
            action: StepAction::Valve(command),
        }
    }

    /// A hold step labelled `HOLD_<ms>MS`.
    #[must_use]
    pub fn delay(duration: Duration) -> Self {
        Self {
            label: format!("HOLD_{}MS", duration.as_millis()),
            action: StepAction::Delay(duration),
        }
    }
}

/// Ordered, immutable list of steps for one ignition run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IgnitionSequence {
    steps: Vec<SequenceStep>,
}

impl IgnitionSequence {
    /// Build from explicit steps.
    #[must_use]
    pub fn new(steps: Vec<SequenceStep>) -> Self {
        Self { steps }
    }

    /// Build from `(valve command, optional hold)` pairs.
    #[must_use]
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (ValveCommand, Option<Duration>)>,
    {
        let mut steps = Vec::new();
        for (command, hold) in pairs {
            steps.push(SequenceStep::valve(command));
            if let Some(hold) = hold {
                steps.push(SequenceStep::delay(hold));
            }
        }
        Self { steps }
    }

    /// The standard hot-fire pattern.
    ///
    /// Close `Vent`, wait 5 s, `Ignition` on, wait 3 s, open `MOV`, wait
    /// 0.5 s, `Ignition` off.
    #[must_use]
    pub fn hotfire() -> Self {
        Self::from_pairs([
            (ValveCommand::close("Vent"), Some(Duration::from_secs(5))),
            (ValveCommand::open("Ignition"), Some(Duration::from_secs(3))),
            (ValveCommand::open("MOV"), Some(Duration::from_millis(500))),
            (ValveCommand::close("Ignition"), None),
        ])
    }

    /// Check that every valve named by the sequence is configured.
    ///
    /// # Errors
    ///
    /// Returns [`InterlockError::UnknownValve`] for the first unknown valve.
    pub fn validate<'a>(&self, known_valves: impl IntoIterator<Item = &'a str>) -> InterlockResult<()> {
        let known: BTreeSet<&str> = known_valves.into_iter().collect();
        for valve in self.valves() {
            if !known.contains(valve) {
                return Err(InterlockError::UnknownValve(valve.to_string()));
            }
        }
        Ok(())
    }

    /// Steps in execution order.
    #[must_use]
    pub fn steps(&self) -> &[SequenceStep] {
        &self.steps
    }

    /// Names of the valves driven, in order of first use.
    pub fn valves(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().filter_map(|step| match &step.action {
            StepAction::Valve(command) => Some(command.valve.as_str()),
            StepAction::Delay(_) => None,
        })
    }

    /// Sum of all holds.
    #[must_use]
    pub fn total_hold(&self) -> Duration {
        self.steps
            .iter()
            .filter_map(|step| match step.action {
                StepAction::Delay(hold) => Some(hold),
                StepAction::Valve(_) => None,
            })
            .fold(Duration::ZERO, Duration::saturating_add)
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the sequence has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hotfire_pattern() {
        let sequence = IgnitionSequence::hotfire();
        let labels: Vec<&str> = sequence.steps().iter().map(|s| s.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Vent_OFF",
                "HOLD_5000MS",
                "Ignition_ON",
                "HOLD_3000MS",
                "MOV_ON",
                "HOLD_500MS",
                "Ignition_OFF",
            ]
        );
        assert_eq!(sequence.total_hold(), Duration::from_millis(8500));
    }

    #[test]
    fn test_validate_rejects_unknown_valve() {
        let sequence = IgnitionSequence::hotfire();
        assert_eq!(
            sequence.validate(["Vent", "MOV"]),
            Err(InterlockError::UnknownValve("Ignition".to_string()))
        );
        assert_eq!(sequence.validate(["Vent", "MOV", "Ignition"]), Ok(()));
    }

    #[test]
    fn test_empty_sequence() {
        let sequence = IgnitionSequence::default();
        assert!(sequence.is_empty());
        assert_eq!(sequence.validate([]), Ok(()));
    }
}
