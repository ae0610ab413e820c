//! Timed execution of an [`IgnitionSequence`].
//!
//! The sequencer checks its cancellation token before every actuation and
//! at least once per poll interval while holding. A cancel during a hold
//! wakes it immediately through the token's condition variable.

use std::fmt;
use std::time::{Duration, Instant};

use teststand_hal::ValveCommand;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cancel::{CancellationToken, deadline_after};
use crate::error::InterlockError;
use crate::sequence::{IgnitionSequence, StepAction};

/// Label of the marker emitted before the first step.
pub const SEQUENCE_START_LABEL: &str = "IGNITION_SEQUENCE_START";

/// Label of the marker emitted after the last step.
pub const SEQUENCE_COMPLETE_LABEL: &str = "IGNITION_SEQUENCE_COMPLETE";

/// Upper bound on the abort-poll interval.
pub const MAX_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Seam between the sequencer and whatever drives the valves.
pub trait SequenceActuator {
    /// Drive one valve on behalf of the sequence.
    ///
    /// # Errors
    ///
    /// A refusal aborts the run.
    fn actuate(&self, command: &ValveCommand) -> Result<(), InterlockError>;
}

/// A step or marker reached by a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceEvent {
    /// Step label or marker.
    pub label: String,
    /// Monotonic offset from sequence start.
    pub offset: Duration,
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceReport {
    /// Events in emission order, markers included.
    pub events: Vec<SequenceEvent>,
    /// Wall time of the run.
    pub elapsed: Duration,
}

/// Why a run stopped early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortCause {
    /// The cancellation token fired.
    Cancelled,
    /// The actuator refused a step.
    Refused(InterlockError),
}

impl fmt::Display for AbortCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => f.write_str("cancelled"),
            Self::Refused(err) => write!(f, "actuator refused: {err}"),
        }
    }
}

/// Terminal outcome of a run that did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("ignition sequence aborted before step {step} after {elapsed:?} ({cause})")]
pub struct SequenceAborted {
    /// Index of the first step not executed.
    pub step: usize,
    /// Time from start to abort.
    pub elapsed: Duration,
    /// What stopped the run.
    pub cause: AbortCause,
    /// Events emitted before the abort.
    pub events: Vec<SequenceEvent>,
}

/// Result of a run as seen by whoever waits on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceOutcome {
    /// Every step executed.
    Completed(SequenceReport),
    /// The run stopped early.
    Aborted(SequenceAborted),
}

impl SequenceOutcome {
    /// Whether the run stopped early.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted(_))
    }

    /// Events emitted by the run.
    #[must_use]
    pub fn events(&self) -> &[SequenceEvent] {
        match self {
            Self::Completed(report) => &report.events,
            Self::Aborted(aborted) => &aborted.events,
        }
    }
}

impl From<Result<SequenceReport, SequenceAborted>> for SequenceOutcome {
    fn from(result: Result<SequenceReport, SequenceAborted>) -> Self {
        match result {
            Ok(report) => Self::Completed(report),
            Err(aborted) => Self::Aborted(aborted),
        }
    }
}

/// Runs a sequence step by step.
#[derive(Debug, Clone)]
pub struct IgnitionSequencer {
    sequence: IgnitionSequence,
    poll_interval: Duration,
}

struct RunState<'a> {
    start: Instant,
    events: Vec<SequenceEvent>,
    on_event: &'a mut dyn FnMut(&SequenceEvent),
}

impl RunState<'_> {
    fn emit(&mut self, label: &str) {
        let event = SequenceEvent {
            label: label.to_string(),
            offset: self.start.elapsed(),
        };
        (self.on_event)(&event);
        self.events.push(event);
    }

    fn aborted(self, step: usize, cause: AbortCause) -> SequenceAborted {
        SequenceAborted {
            step,
            elapsed: self.start.elapsed(),
            cause,
            events: self.events,
        }
    }
}

impl IgnitionSequencer {
    /// Create a sequencer. The poll interval is clamped to
    /// `1 ms..=`[`MAX_POLL_INTERVAL`].
    #[must_use]
    pub fn new(sequence: IgnitionSequence, poll_interval: Duration) -> Self {
        Self {
            sequence,
            poll_interval: poll_interval.clamp(Duration::from_millis(1), MAX_POLL_INTERVAL),
        }
    }

    /// Sequence being run.
    #[must_use]
    pub fn sequence(&self) -> &IgnitionSequence {
        &self.sequence
    }

    /// Effective poll interval.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Execute the sequence on the calling thread.
    ///
    /// `on_event` is called for the start marker, every executed step and
    /// the completion marker.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceAborted`] when the token is cancelled or the
    /// actuator refuses a step. Remaining steps are not executed.
    pub fn run(
        &self,
        actuator: &dyn SequenceActuator,
        cancel: &CancellationToken,
        on_event: &mut dyn FnMut(&SequenceEvent),
    ) -> Result<SequenceReport, SequenceAborted> {
        let mut run = RunState {
            start: Instant::now(),
            events: Vec::with_capacity(self.sequence.len().saturating_add(2)),
            on_event,
        };
        info!(steps = self.sequence.len(), "Ignition sequence started");
        run.emit(SEQUENCE_START_LABEL);

        for (index, step) in self.sequence.steps().iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(Self::log_abort(run.aborted(index, AbortCause::Cancelled)));
            }

            match &step.action {
                StepAction::Valve(command) => {
                    if let Err(err) = actuator.actuate(command) {
                        return Err(Self::log_abort(run.aborted(index, AbortCause::Refused(err))));
                    }
                    debug!(step = %step.label, "Sequence step executed");
                    run.emit(&step.label);
                }
                StepAction::Delay(hold) => {
                    run.emit(&step.label);
                    if self.hold(*hold, cancel) {
                        return Err(Self::log_abort(run.aborted(
                            index.saturating_add(1),
                            AbortCause::Cancelled,
                        )));
                    }
                }
            }
        }

        run.emit(SEQUENCE_COMPLETE_LABEL);
        let elapsed = run.start.elapsed();
        info!(elapsed_ms = elapsed.as_millis(), "Ignition sequence complete");
        Ok(SequenceReport {
            events: run.events,
            elapsed,
        })
    }

    /// Wait out a hold in slices of at most one poll interval.
    ///
    /// Holds are capped at [`MAX_WAIT`](crate::cancel::MAX_WAIT). Returns
    /// `true` if cancelled.
    fn hold(&self, duration: Duration, cancel: &CancellationToken) -> bool {
        let deadline = deadline_after(duration);
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return cancel.is_cancelled();
            }
            if cancel.wait_for(remaining.min(self.poll_interval)) {
                return true;
            }
        }
    }

    fn log_abort(aborted: SequenceAborted) -> SequenceAborted {
        warn!(
            step = aborted.step,
            elapsed_ms = aborted.elapsed.as_millis(),
            cause = %aborted.cause,
            "Ignition sequence aborted"
        );
        aborted
    }
}
