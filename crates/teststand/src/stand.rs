//! The [`TestStand`] facade.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam::channel::Receiver;
use parking_lot::Mutex;
use teststand_acquisition::{AcquisitionLoop, AcquisitionStats, HistoryPoint};
use teststand_config::StandConfig;
use teststand_hal::{HardwareChannel, SampleBatch, SharedChannel};
use teststand_interlock::{
    CancellationToken, IgnitionSequence, Interlock, SequenceOutcome, SystemState,
};
use teststand_telemetry::{Event, EventKind, TelemetryHub};
use teststand_watchdog::{AbortCondition, SafetyManager};
use tracing::{debug, info, warn};

use crate::command::CommandOutcome;
use crate::error::{StandError, StandResult};
use crate::monitor::{HEARTBEAT_MONITOR_THREAD_NAME, spawn_heartbeat_monitor};

/// Event label for a watchdog-initiated abort, emitted after the `ABORT`
/// transition it caused.
pub const WATCHDOG_TRIP_LABEL: &str = "WATCHDOG_TRIP";

/// Abort reason used when the workers are stopped mid-fire.
pub const STOP_ABORT_REASON: &str = "Test stand stopped while firing";

const ACQUISITION_WORKER: &str = "acquisition";

/// How long `stop` waits for a cancelled ignition sequence to wind down.
const SEQUENCE_STOP_TIMEOUT: Duration = Duration::from_secs(1);

struct Workers {
    cancel: CancellationToken,
    acquisition: JoinHandle<()>,
    monitor: JoinHandle<()>,
}

/// One test stand: hardware, watchdogs, interlock and acquisition wired
/// together behind an operator command surface.
pub struct TestStand {
    config: StandConfig,
    hardware: SharedChannel,
    telemetry: Arc<TelemetryHub>,
    safety: Arc<SafetyManager>,
    interlock: Arc<Interlock>,
    acquisition: Arc<AcquisitionLoop>,
    workers: Mutex<Option<Workers>>,
}

impl TestStand {
    /// Build a stand running the standard hot-fire sequence.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, names a valve the
    /// sequence needs but does not configure, or the safe levels cannot be
    /// written.
    pub fn new(config: StandConfig, hardware: Box<dyn HardwareChannel>) -> StandResult<Self> {
        Self::with_sequence(config, hardware, IgnitionSequence::hotfire())
    }

    /// Build a stand running a custom ignition sequence.
    ///
    /// All valves are driven to their safe levels before this returns.
    ///
    /// # Errors
    ///
    /// See [`TestStand::new`].
    pub fn with_sequence(
        config: StandConfig,
        hardware: Box<dyn HardwareChannel>,
        sequence: IgnitionSequence,
    ) -> StandResult<Self> {
        config.validate()?;
        for channel in config.unmapped_limits() {
            warn!(channel, "Limit configured for a channel with no address; it will never trip");
        }

        let hardware = SharedChannel::new(hardware);
        let telemetry = Arc::new(TelemetryHub::new());
        let safety = Arc::new(SafetyManager::from_config(&config)?);
        let interlock = Arc::new(Interlock::new(
            hardware.clone(),
            &config,
            sequence,
            Arc::clone(&telemetry),
        )?);
        interlock.initialize()?;

        let target = Arc::clone(&interlock);
        let hub = Arc::clone(&telemetry);
        // Only the call that performs the abort reports the trip.
        safety.add_abort_callback(move |condition: &AbortCondition| {
            let reason = condition.reason();
            if target.abort(&reason) {
                hub.emit(WATCHDOG_TRIP_LABEL, EventKind::WatchdogTrip { reason });
            }
        });

        let acquisition = Arc::new(AcquisitionLoop::new(
            hardware.clone(),
            Arc::clone(&safety),
            Arc::clone(&telemetry),
            &config,
        ));

        info!(
            device = hardware.name(),
            channels = config.channels.len(),
            valves = config.valves.len(),
            "Test stand ready"
        );

        Ok(Self {
            config,
            hardware,
            telemetry,
            safety,
            interlock,
            acquisition,
            workers: Mutex::new(None),
        })
    }

    /// `SAFE -> ARMED`.
    pub fn arm(&self) -> CommandOutcome {
        CommandOutcome::from_result("arm", self.interlock.arm())
    }

    /// Drive every valve to its safe level and enter `ABORTED`.
    ///
    /// Always accepted; a repeated abort changes nothing.
    pub fn abort(&self, reason: &str) -> CommandOutcome {
        if self.interlock.abort(reason) {
            CommandOutcome::accepted("abort")
        } else {
            CommandOutcome::accepted_with_note("abort", "already aborted")
        }
    }

    /// Command one valve. Only accepted while `ARMED` or `FIRING`.
    pub fn toggle_valve(&self, valve: &str, state: bool) -> CommandOutcome {
        CommandOutcome::from_result("toggle_valve", self.interlock.toggle_valve(valve, state))
    }

    /// `ARMED -> FIRING` and start the ignition sequence.
    pub fn start_ignition(&self) -> CommandOutcome {
        CommandOutcome::from_result("start_ignition", self.interlock.begin_fire())
    }

    /// `ABORTED -> SAFE`, clearing watchdog streaks.
    pub fn reset(&self) -> CommandOutcome {
        let result = self.interlock.reset();
        if result.is_ok() {
            self.safety.reset();
        }
        CommandOutcome::from_result("reset", result)
    }

    /// Spawn the acquisition and heartbeat-monitor threads.
    ///
    /// # Errors
    ///
    /// Returns [`StandError::AlreadyRunning`] if the workers are up, or a
    /// spawn error. A failed monitor spawn stops the acquisition thread
    /// again before returning.
    pub fn start(&self) -> StandResult<()> {
        let mut workers = self.workers.lock();
        if workers.is_some() {
            return Err(StandError::AlreadyRunning);
        }

        self.safety.beat();
        let cancel = CancellationToken::new();
        let acquisition = Arc::clone(&self.acquisition)
            .spawn(cancel.clone())
            .map_err(|e| StandError::spawn(ACQUISITION_WORKER, e))?;
        let monitor = match spawn_heartbeat_monitor(
            Arc::clone(&self.safety),
            self.config.acquisition_period(),
            cancel.clone(),
        ) {
            Ok(handle) => handle,
            Err(e) => {
                cancel.cancel();
                if acquisition.join().is_err() {
                    warn!("Acquisition thread panicked during failed start");
                }
                return Err(StandError::spawn(HEARTBEAT_MONITOR_THREAD_NAME, e));
            }
        };

        *workers = Some(Workers {
            cancel,
            acquisition,
            monitor,
        });
        info!(period_ms = self.config.acquisition_period().as_millis(), "Test stand started");
        Ok(())
    }

    /// Stop and join the worker threads.
    ///
    /// A stand that is `FIRING` is aborted first so no valve is left in a
    /// commanded state without supervision. Stopping an idle stand is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns [`StandError::WorkerPanicked`] if a worker panicked.
    pub fn stop(&self) -> StandResult<()> {
        if self.interlock.state() == SystemState::Firing {
            self.interlock.abort(STOP_ABORT_REASON);
        }
        if self.interlock.is_sequence_running() {
            let outcome = self.interlock.wait_for_sequence(SEQUENCE_STOP_TIMEOUT);
            debug!(finished = outcome.is_some(), "Ignition sequence wound down");
        }

        let Some(workers) = self.workers.lock().take() else {
            return Ok(());
        };
        workers.cancel.cancel();
        let acquisition = workers.acquisition.join();
        let monitor = workers.monitor.join();
        info!("Test stand stopped");

        if acquisition.is_err() {
            return Err(StandError::WorkerPanicked(ACQUISITION_WORKER));
        }
        if monitor.is_err() {
            return Err(StandError::WorkerPanicked(HEARTBEAT_MONITOR_THREAD_NAME));
        }
        Ok(())
    }

    /// Stop the workers and release the hardware.
    ///
    /// # Errors
    ///
    /// See [`TestStand::stop`]. The hardware is closed either way.
    pub fn shutdown(self) -> StandResult<()> {
        let stopped = self.stop();
        self.hardware.close();
        info!(device = self.hardware.name(), "Hardware released");
        stopped
    }

    /// Block until the current ignition sequence ends or `timeout` passes.
    #[must_use]
    pub fn wait_for_sequence(&self, timeout: Duration) -> Option<SequenceOutcome> {
        self.interlock.wait_for_sequence(timeout)
    }

    /// Receive every future sample batch.
    #[must_use]
    pub fn subscribe_samples(&self) -> Receiver<SampleBatch> {
        self.telemetry.subscribe_samples()
    }

    /// Receive every future audit event.
    #[must_use]
    pub fn subscribe_events(&self) -> Receiver<Event> {
        self.telemetry.subscribe_events()
    }

    /// Receive every future abort condition raised by the watchdogs.
    #[must_use]
    pub fn subscribe_abort_conditions(&self) -> Receiver<AbortCondition> {
        self.safety.subscribe()
    }

    /// Current interlock state.
    #[must_use]
    pub fn state(&self) -> SystemState {
        self.interlock.state()
    }

    /// Reason for the most recent abort.
    #[must_use]
    pub fn last_abort_reason(&self) -> Option<String> {
        self.interlock.last_abort_reason()
    }

    /// Last level commanded on `valve`.
    #[must_use]
    pub fn commanded_state(&self, valve: &str) -> Option<bool> {
        self.interlock.commanded_state(valve)
    }

    /// Whether the worker threads are running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.workers.lock().is_some()
    }

    /// Run one acquisition tick on the caller's thread.
    ///
    /// For hosts that drive their own loop instead of calling `start`.
    pub fn poll_once(&self) -> teststand_acquisition::TickOutcome {
        self.acquisition.tick()
    }

    /// Check the heartbeat on the caller's thread.
    pub fn check_heartbeat(&self) -> Option<AbortCondition> {
        self.safety.check_heartbeat()
    }

    /// Acquisition counters.
    #[must_use]
    pub fn stats(&self) -> AcquisitionStats {
        self.acquisition.stats()
    }

    /// Rolling history of `channel`, oldest first.
    #[must_use]
    pub fn history(&self, channel: &str) -> Option<Vec<HistoryPoint>> {
        self.acquisition.history(channel)
    }

    /// Configuration the stand was built from.
    #[must_use]
    pub fn config(&self) -> &StandConfig {
        &self.config
    }

    /// Telemetry hub shared by every component.
    #[must_use]
    pub fn telemetry(&self) -> &Arc<TelemetryHub> {
        &self.telemetry
    }
}

impl Drop for TestStand {
    fn drop(&mut self) {
        if let Some(workers) = self.workers.get_mut().take() {
            workers.cancel.cancel();
            let acquisition = workers.acquisition.join();
            let monitor = workers.monitor.join();
            if acquisition.is_err() || monitor.is_err() {
                warn!("Worker thread panicked during drop");
            }
        }
    }
}

impl std::fmt::Debug for TestStand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestStand")
            .field("device", &self.hardware.name())
            .field("state", &self.interlock.state())
            .field("running", &self.is_running())
            .field("stats", &self.acquisition.stats())
            .finish_non_exhaustive()
    }
}
