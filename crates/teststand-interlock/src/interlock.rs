//! The arm/fire/abort interlock.
//!
//! One mutex serializes every state change and every valve write, so the
//! interlock is the single writer of actuation commands. The ignition
//! sequencer runs on its own thread but actuates through the interlock and
//! is refused unless the state is `Firing` and its run is still current.
//! An abort therefore can never be overtaken by a late sequence step.
//!
//! Lock order is interlock, then hardware. Nothing joins a thread while
//! holding the interlock lock.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use teststand_config::{StandConfig, ValveConfig};
use teststand_hal::{SharedChannel, ValveCommand};
use teststand_telemetry::{EventKind, TelemetryHub};
use tracing::{debug, error, info, warn};

use crate::cancel::CancellationToken;
use crate::error::{InterlockError, InterlockResult};
use crate::sequence::IgnitionSequence;
use crate::sequencer::{IgnitionSequencer, SequenceActuator, SequenceEvent, SequenceOutcome};
use crate::state::SystemState;

/// Event label for `Safe -> Armed`.
pub const ARM_LABEL: &str = "ARM";
/// Event label for any transition into `Aborted`.
pub const ABORT_LABEL: &str = "ABORT";
/// Event label for `Armed -> Firing`.
pub const IGNITION_START_LABEL: &str = "IGNITION_START";
/// Event label for `Firing -> Armed` after a completed sequence.
pub const IGNITION_DONE_LABEL: &str = "IGNITION_DONE";
/// Event label for a sequence that stopped early.
pub const IGNITION_ABORTED_LABEL: &str = "IGNITION_ABORTED";
/// Event label for `Aborted -> Safe`.
pub const RESET_LABEL: &str = "RESET";

const SEQUENCER_THREAD_NAME: &str = "ignition-sequencer";

#[derive(Debug)]
struct SequenceRun {
    id: u64,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    outcome: Receiver<SequenceOutcome>,
}

#[derive(Debug, Default)]
struct InterlockInner {
    state: SystemState,
    commanded: BTreeMap<String, bool>,
    run: Option<SequenceRun>,
    next_run_id: u64,
    last_abort_reason: Option<String>,
}

/// Arm/fire/abort state machine and single writer of valve commands.
#[derive(Debug)]
pub struct Interlock {
    hardware: SharedChannel,
    valves: Vec<ValveConfig>,
    telemetry: Arc<TelemetryHub>,
    sequencer: IgnitionSequencer,
    inner: Mutex<InterlockInner>,
}

impl Interlock {
    /// Create an interlock in `Safe`.
    ///
    /// No hardware is touched; call [`Interlock::initialize`] to drive the
    /// safe levels at startup.
    ///
    /// # Errors
    ///
    /// Returns [`InterlockError::UnknownValve`] if the sequence names a
    /// valve missing from `config`.
    pub fn new(
        hardware: SharedChannel,
        config: &StandConfig,
        sequence: IgnitionSequence,
        telemetry: Arc<TelemetryHub>,
    ) -> InterlockResult<Self> {
        sequence.validate(config.valve_names())?;
        Ok(Self {
            hardware,
            valves: config.valves.clone(),
            telemetry,
            sequencer: IgnitionSequencer::new(sequence, config.sequence_poll_interval()),
            inner: Mutex::new(InterlockInner::default()),
        })
    }

    /// Drive every valve to its safe level. Only valid in `Safe`.
    ///
    /// # Errors
    ///
    /// Returns the first write failure after attempting every valve.
    pub fn initialize(&self) -> InterlockResult<()> {
        let mut inner = self.inner.lock();
        if inner.state != SystemState::Safe {
            return Err(self.reject("initialize", inner.state));
        }
        match self.drive_safe_levels(&mut inner).into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// `Safe -> Armed`.
    ///
    /// # Errors
    ///
    /// Returns [`InterlockError::InvalidTransition`] from any other state.
    pub fn arm(&self) -> InterlockResult<()> {
        let mut inner = self.inner.lock();
        if inner.state != SystemState::Safe {
            return Err(self.reject("arm", inner.state));
        }
        self.transition(&mut inner, SystemState::Armed, ARM_LABEL);
        Ok(())
    }

    /// `Armed -> Firing`, starting the ignition sequence on its own thread.
    ///
    /// # Errors
    ///
    /// Returns [`InterlockError::InvalidTransition`] outside `Armed`, or
    /// [`InterlockError::SpawnFailed`] if the thread cannot be started (the
    /// state then returns to `Armed`).
    pub fn begin_fire(self: &Arc<Self>) -> InterlockResult<()> {
        let previous = {
            let mut inner = self.inner.lock();
            if inner.state != SystemState::Armed {
                return Err(self.reject("begin_fire", inner.state));
            }

            let id = inner.next_run_id;
            inner.next_run_id = id.wrapping_add(1);
            let cancel = CancellationToken::new();
            let (outcome_tx, outcome_rx) = channel::bounded(1);

            self.transition(&mut inner, SystemState::Firing, IGNITION_START_LABEL);
            let interlock = Arc::clone(self);
            let token = cancel.clone();
            let spawned = thread::Builder::new()
                .name(SEQUENCER_THREAD_NAME.to_string())
                .spawn(move || interlock.run_sequence(id, &token, &outcome_tx));
            let handle = match spawned {
                Ok(handle) => handle,
                Err(e) => {
                    error!(error = %e, "Failed to spawn ignition sequencer");
                    self.transition(&mut inner, SystemState::Armed, IGNITION_ABORTED_LABEL);
                    return Err(InterlockError::SpawnFailed(e.to_string()));
                }
            };

            inner.run.replace(SequenceRun {
                id,
                cancel,
                handle,
                outcome: outcome_rx,
            })
        };

        if let Some(run) = previous {
            join_run(run);
        }
        Ok(())
    }

    /// `Firing -> Armed`. Called when the sequence completes.
    ///
    /// Any sequence still running is cancelled without aborting.
    ///
    /// # Errors
    ///
    /// Returns [`InterlockError::InvalidTransition`] outside `Firing`.
    pub fn sequence_finished(&self) -> InterlockResult<()> {
        let mut inner = self.inner.lock();
        if inner.state != SystemState::Firing {
            return Err(self.reject("sequence_finished", inner.state));
        }
        if let Some(run) = &inner.run {
            run.cancel.cancel();
        }
        self.transition(&mut inner, SystemState::Armed, IGNITION_DONE_LABEL);
        Ok(())
    }

    /// Force every valve to its safe level and enter `Aborted`.
    ///
    /// Valid from every state. Cancels any running sequence without waiting
    /// for it. When already `Aborted` this is a no-op that touches no
    /// hardware. Returns `true` if this call performed the abort.
    pub fn abort(&self, reason: &str) -> bool {
        let mut inner = self.inner.lock();
        self.abort_locked(&mut inner, reason)
    }

    /// Drive one valve. Only valid in `Armed` or `Firing`.
    ///
    /// # Errors
    ///
    /// Returns [`InterlockError::InvalidTransition`] in `Safe` or
    /// `Aborted` (no hardware call is made),
    /// [`InterlockError::UnknownValve`] for unconfigured names, or
    /// [`InterlockError::ActuationFailed`] if the write fails.
    pub fn toggle_valve(&self, valve: &str, state: bool) -> InterlockResult<()> {
        let mut inner = self.inner.lock();
        if !inner.state.permits_actuation() {
            return Err(self.reject("toggle_valve", inner.state));
        }
        self.drive(&mut inner, &ValveCommand::new(valve, state))
    }

    /// `Aborted -> Safe` after driving every valve to its safe level.
    ///
    /// # Errors
    ///
    /// Returns [`InterlockError::InvalidTransition`] outside `Aborted`, or
    /// the first write failure; the interlock then stays `Aborted`.
    pub fn reset(&self) -> InterlockResult<()> {
        let finished = {
            let mut inner = self.inner.lock();
            if inner.state != SystemState::Aborted {
                return Err(self.reject("reset", inner.state));
            }
            if let Some(err) = self.drive_safe_levels(&mut inner).into_iter().next() {
                error!(error = %err, "Reset refused: safe levels not confirmed");
                return Err(err);
            }
            inner.last_abort_reason = None;
            self.transition(&mut inner, SystemState::Safe, RESET_LABEL);
            inner.run.take()
        };

        if let Some(run) = finished {
            run.cancel.cancel();
            join_run(run);
        }
        Ok(())
    }

    /// Wait up to `timeout` for the current sequence run to finish.
    ///
    /// Returns `None` if no run is pending or the timeout elapses.
    pub fn wait_for_sequence(&self, timeout: Duration) -> Option<SequenceOutcome> {
        let outcome_rx = self.inner.lock().run.as_ref()?.outcome.clone();
        let outcome = outcome_rx.recv_timeout(timeout).ok()?;

        let finished = {
            let mut inner = self.inner.lock();
            let same_run = inner
                .run
                .as_ref()
                .is_some_and(|run| run.outcome.same_channel(&outcome_rx));
            if same_run { inner.run.take() } else { None }
        };
        if let Some(run) = finished {
            join_run(run);
        }
        Some(outcome)
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SystemState {
        self.inner.lock().state
    }

    /// Last level commanded to `valve` through this interlock.
    #[must_use]
    pub fn commanded_state(&self, valve: &str) -> Option<bool> {
        self.inner.lock().commanded.get(valve).copied()
    }

    /// Last level commanded to every valve written so far.
    #[must_use]
    pub fn commanded_states(&self) -> BTreeMap<String, bool> {
        self.inner.lock().commanded.clone()
    }

    /// Reason given for the current abort, if `Aborted`.
    #[must_use]
    pub fn last_abort_reason(&self) -> Option<String> {
        self.inner.lock().last_abort_reason.clone()
    }

    /// Whether a sequence thread is still running.
    #[must_use]
    pub fn is_sequence_running(&self) -> bool {
        self.inner
            .lock()
            .run
            .as_ref()
            .is_some_and(|run| !run.handle.is_finished())
    }

    /// Configured valve names.
    pub fn valve_names(&self) -> impl Iterator<Item = &str> {
        self.valves.iter().map(|v| v.name.as_str())
    }

    /// Telemetry hub events are published to.
    #[must_use]
    pub fn telemetry(&self) -> &Arc<TelemetryHub> {
        &self.telemetry
    }

    fn run_sequence(&self, run_id: u64, cancel: &CancellationToken, outcome_tx: &Sender<SequenceOutcome>) {
        let actuator = RunActuator {
            interlock: self,
            run_id,
        };
        let telemetry = Arc::clone(&self.telemetry);
        let result = self.sequencer.run(&actuator, cancel, &mut |event: &SequenceEvent| {
            telemetry.emit(event.label.clone(), EventKind::SequenceStep);
        });

        match &result {
            Ok(_) => self.finish_run(run_id),
            Err(aborted) => {
                self.telemetry
                    .emit(IGNITION_ABORTED_LABEL, EventKind::SequenceStep);
                self.fail_run(run_id, &format!("ignition sequence aborted: {}", aborted.cause));
            }
        }

        if outcome_tx.send(result.into()).is_err() {
            debug!("Sequence outcome dropped: no waiter");
        }
    }

    fn finish_run(&self, run_id: u64) {
        let mut inner = self.inner.lock();
        let current = inner.run.as_ref().is_some_and(|run| run.id == run_id);
        if current && inner.state == SystemState::Firing {
            self.transition(&mut inner, SystemState::Armed, IGNITION_DONE_LABEL);
        } else {
            debug!(run_id, state = %inner.state, "Stale sequence completion ignored");
        }
    }

    fn fail_run(&self, run_id: u64, reason: &str) {
        let mut inner = self.inner.lock();
        let current = inner.run.as_ref().is_some_and(|run| run.id == run_id);
        if current && inner.state == SystemState::Firing {
            self.abort_locked(&mut inner, reason);
        }
    }

    fn actuate_for_run(&self, run_id: u64, command: &ValveCommand) -> InterlockResult<()> {
        let mut inner = self.inner.lock();
        let live = inner.state == SystemState::Firing
            && inner
                .run
                .as_ref()
                .is_some_and(|run| run.id == run_id && !run.cancel.is_cancelled());
        if !live {
            debug!(step = %command.label(), state = %inner.state, "Sequence step refused");
            return Err(InterlockError::invalid_transition("sequence_step", inner.state));
        }
        self.drive(&mut inner, command)
    }

    fn abort_locked(&self, inner: &mut InterlockInner, reason: &str) -> bool {
        if inner.state == SystemState::Aborted {
            debug!(reason, "Abort ignored: already aborted");
            return false;
        }

        let from = inner.state;
        inner.state = SystemState::Aborted;
        inner.last_abort_reason = Some(reason.to_string());
        if let Some(run) = &inner.run {
            run.cancel.cancel();
        }

        let failures = self.drive_safe_levels(inner);
        warn!(
            reason,
            from = %from,
            failed_writes = failures.len(),
            "Interlock aborted"
        );
        self.telemetry.emit(
            ABORT_LABEL,
            EventKind::StateTransition {
                from: from.as_str(),
                to: SystemState::Aborted.as_str(),
            },
        );
        true
    }

    /// Write every configured safe level, continuing past failures.
    fn drive_safe_levels(&self, inner: &mut InterlockInner) -> Vec<InterlockError> {
        let mut failures = Vec::new();
        for valve in &self.valves {
            let command = ValveCommand::new(valve.name.clone(), valve.safe_state);
            if let Err(err) = self.drive(inner, &command) {
                failures.push(err);
            }
        }
        failures
    }

    fn drive(&self, inner: &mut InterlockInner, command: &ValveCommand) -> InterlockResult<()> {
        if !self.valves.iter().any(|v| v.name == command.valve) {
            warn!(valve = %command.valve, "Unknown valve");
            self.telemetry.emit(
                format!("{}_UNKNOWN", command.valve),
                EventKind::CommandRejected {
                    command: "toggle_valve".to_string(),
                    reason: format!("unknown valve {}", command.valve),
                },
            );
            return Err(InterlockError::UnknownValve(command.valve.clone()));
        }

        if let Err(source) = self.hardware.apply(command) {
            error!(valve = %command.valve, state = command.state, error = %source, "Valve write failed");
            return Err(InterlockError::actuation_failed(command.valve.clone(), source));
        }

        inner.commanded.insert(command.valve.clone(), command.state);
        let action = if command.state { "OPEN" } else { "CLOSE" };
        info!(valve = %command.valve, state = command.state, "Valve commanded");
        self.telemetry.emit(
            format!("{}_{action}", command.valve),
            EventKind::ValveChanged {
                valve: command.valve.clone(),
                state: command.state,
            },
        );
        Ok(())
    }

    fn transition(&self, inner: &mut InterlockInner, to: SystemState, label: &str) {
        let from = inner.state;
        inner.state = to;
        info!(from = %from, to = %to, "Interlock state change");
        self.telemetry.emit(
            label,
            EventKind::StateTransition {
                from: from.as_str(),
                to: to.as_str(),
            },
        );
    }

    fn reject(&self, command: &'static str, state: SystemState) -> InterlockError {
        let err = InterlockError::invalid_transition(command, state);
        warn!(command, state = %state, "Command rejected");
        self.telemetry.emit(
            format!("{}_REJECTED", command.to_uppercase()),
            EventKind::CommandRejected {
                command: command.to_string(),
                reason: err.to_string(),
            },
        );
        err
    }
}

struct RunActuator<'a> {
    interlock: &'a Interlock,
    run_id: u64,
}

impl SequenceActuator for RunActuator<'_> {
    fn actuate(&self, command: &ValveCommand) -> InterlockResult<()> {
        self.interlock.actuate_for_run(self.run_id, command)
    }
}

fn join_run(run: SequenceRun) {
    if run.handle.join().is_err() {
        error!(run_id = run.id, "Ignition sequencer thread panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam::channel::Receiver;
    use teststand_telemetry::Event;
    use teststand_test_helpers::prelude::*;
    use tracing_test::traced_test;

    struct Fixture {
        interlock: Arc<Interlock>,
        mock: MockHandle,
        events: Receiver<Event>,
    }

    fn fixture(sequence: IgnitionSequence) -> Fixture {
        let config = small_stand_config();
        let channel = MockChannel::for_config(&config);
        let mock = channel.handle();
        let hub = Arc::new(TelemetryHub::new());
        let events = hub.subscribe_events();
        let interlock = must(Interlock::new(
            SharedChannel::new(Box::new(channel)),
            &config,
            sequence,
            hub,
        ));
        Fixture {
            interlock: Arc::new(interlock),
            mock,
            events,
        }
    }

    fn vent_only() -> IgnitionSequence {
        IgnitionSequence::from_pairs([(ValveCommand::open("Vent"), None)])
    }

    fn labels(events: &Receiver<Event>) -> Vec<String> {
        events.try_iter().map(|e| e.label).collect()
    }

    #[test]
    fn test_arm_only_from_safe() {
        let f = fixture(vent_only());
        assert_eq!(f.interlock.arm(), Ok(()));
        assert_eq!(f.interlock.state(), SystemState::Armed);
        assert_eq!(
            f.interlock.arm(),
            Err(InterlockError::invalid_transition("arm", SystemState::Armed))
        );
    }

    #[test]
    #[traced_test]
    fn test_toggle_rejected_in_safe_without_hardware_call() {
        let f = fixture(vent_only());
        let result = f.interlock.toggle_valve("Vent", true);

        assert_eq!(
            result,
            Err(InterlockError::invalid_transition("toggle_valve", SystemState::Safe))
        );
        assert!(f.mock.commands().is_empty());
        assert_eq!(labels(&f.events), vec!["TOGGLE_VALVE_REJECTED"]);
        assert!(logs_contain("Command rejected"));
    }

    #[test]
    fn test_toggle_in_armed_drives_hardware() -> TestResult {
        let f = fixture(vent_only());
        f.interlock.arm()?;
        f.interlock.toggle_valve("MOV", true)?;

        assert_eq!(f.mock.commands(), vec![ValveCommand::open("MOV")]);
        assert_eq!(f.interlock.commanded_state("MOV"), Some(true));
        assert_eq!(labels(&f.events), vec!["ARM", "MOV_OPEN"]);
        Ok(())
    }

    #[test]
    fn test_unknown_valve_rejected() -> TestResult {
        let f = fixture(vent_only());
        f.interlock.arm()?;
        assert_eq!(
            f.interlock.toggle_valve("Purge", true),
            Err(InterlockError::UnknownValve("Purge".to_string()))
        );
        assert!(f.mock.commands().is_empty());
        Ok(())
    }

    #[test]
    fn test_abort_is_idempotent() -> TestResult {
        let f = fixture(vent_only());
        f.interlock.arm()?;
        f.interlock.toggle_valve("Vent", true)?;

        assert!(f.interlock.abort("operator"));
        let after_first = f.mock.commands();
        let states_first = f.interlock.commanded_states();

        assert!(!f.interlock.abort("operator again"));
        assert_eq!(f.mock.commands(), after_first);
        assert_eq!(f.interlock.commanded_states(), states_first);
        assert_eq!(f.interlock.state(), SystemState::Aborted);
        assert_eq!(f.interlock.last_abort_reason().as_deref(), Some("operator"));
        assert_eq!(
            after_first,
            vec![
                ValveCommand::open("Vent"),
                ValveCommand::close("Vent"),
                ValveCommand::close("MOV"),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_abort_from_safe() {
        let f = fixture(vent_only());
        assert!(f.interlock.abort("pre-arm fault"));
        assert_eq!(f.interlock.state(), SystemState::Aborted);
        assert_eq!(f.mock.last_state("Vent"), Some(false));
    }

    #[test]
    fn test_no_actuation_in_aborted() -> TestResult {
        let f = fixture(vent_only());
        f.interlock.abort("test");
        f.mock.clear_writes();

        assert!(matches!(
            f.interlock.toggle_valve("Vent", true),
            Err(InterlockError::InvalidTransition { .. })
        ));
        assert!(matches!(
            f.interlock.begin_fire(),
            Err(InterlockError::InvalidTransition { .. })
        ));
        assert!(f.mock.commands().is_empty());
        Ok(())
    }

    #[test]
    fn test_reset_requires_confirmed_safe_levels() -> TestResult {
        let f = fixture(vent_only());
        assert!(matches!(
            f.interlock.reset(),
            Err(InterlockError::InvalidTransition { .. })
        ));

        f.interlock.abort("test");
        f.mock.fail_writes_to("MOV");
        assert!(matches!(
            f.interlock.reset(),
            Err(InterlockError::ActuationFailed { .. })
        ));
        assert_eq!(f.interlock.state(), SystemState::Aborted);

        f.mock.heal_writes();
        f.interlock.reset()?;
        assert_eq!(f.interlock.state(), SystemState::Safe);
        assert_eq!(f.interlock.last_abort_reason(), None);
        Ok(())
    }

    #[test]
    fn test_initialize_drives_safe_levels() -> TestResult {
        let f = fixture(vent_only());
        f.interlock.initialize()?;
        assert_eq!(
            f.mock.commands(),
            vec![ValveCommand::close("Vent"), ValveCommand::close("MOV")]
        );
        Ok(())
    }

    #[test]
    fn test_sequence_completion_returns_to_armed() -> TestResult {
        let f = fixture(vent_only());
        f.interlock.arm()?;
        f.interlock.begin_fire()?;

        let outcome = f
            .interlock
            .wait_for_sequence(Duration::from_secs(5))
            .ok_or("sequence did not finish")?;

        assert!(!outcome.is_aborted());
        assert_eq!(f.interlock.state(), SystemState::Armed);
        assert_eq!(f.mock.commands(), vec![ValveCommand::open("Vent")]);
        assert_eq!(
            labels(&f.events),
            vec![
                "ARM",
                "IGNITION_START",
                "IGNITION_SEQUENCE_START",
                "Vent_OPEN",
                "Vent_ON",
                "IGNITION_SEQUENCE_COMPLETE",
                "IGNITION_DONE",
            ]
        );
        Ok(())
    }

    #[test]
    fn test_sequence_rejects_unknown_valve_at_construction() {
        let config = small_stand_config();
        let channel = MockChannel::for_config(&config);
        let result = Interlock::new(
            SharedChannel::new(Box::new(channel)),
            &config,
            IgnitionSequence::hotfire(),
            Arc::new(TelemetryHub::new()),
        );
        assert!(matches!(result, Err(InterlockError::UnknownValve(_))));
    }
}
