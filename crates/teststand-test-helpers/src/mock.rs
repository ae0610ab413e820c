//! Scripted hardware for deterministic tests.
//!
//! A [`MockChannel`] replays queued readings and failures in order, falls
//! back to a default reading when the script runs dry, and records every
//! valve write with the instant it happened. Keep a [`MockHandle`] to steer
//! and inspect the channel after it has been boxed.

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use teststand_config::StandConfig;
use teststand_hal::{AnalogReading, DeviceError, HalError, HalResult, HardwareChannel, ValveCommand};

/// Device name reported by mock channels.
pub const MOCK_DEVICE_NAME: &str = "mock";

/// A timestamped valve write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedWrite {
    /// When the write reached the device.
    pub at: Instant,
    /// What was written.
    pub command: ValveCommand,
}

#[derive(Debug)]
enum Scripted {
    Reading(AnalogReading),
    Failure,
}

#[derive(Debug, Default)]
struct MockState {
    known_valves: BTreeSet<String>,
    script: VecDeque<Scripted>,
    default_reading: AnalogReading,
    read_delay: Duration,
    failing_valves: BTreeSet<String>,
    writes: Vec<RecordedWrite>,
    reads: u64,
    closed: bool,
}

/// Scripted [`HardwareChannel`].
#[derive(Debug)]
pub struct MockChannel {
    handle: MockHandle,
}

impl MockChannel {
    /// Create a mock that accepts writes to `valves`.
    pub fn new<I, S>(valves: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let state = MockState {
            known_valves: valves.into_iter().map(Into::into).collect(),
            ..MockState::default()
        };
        Self {
            handle: MockHandle {
                state: Arc::new(Mutex::new(state)),
            },
        }
    }

    /// Create a mock with the valves of `config`.
    pub fn for_config(config: &StandConfig) -> Self {
        Self::new(config.valves.iter().map(|v| v.name.clone()))
    }

    /// Steering handle.
    pub fn handle(&self) -> MockHandle {
        self.handle.clone()
    }
}

impl HardwareChannel for MockChannel {
    fn name(&self) -> &str {
        MOCK_DEVICE_NAME
    }

    fn read_analog(&mut self) -> Result<AnalogReading, DeviceError> {
        let delay = {
            let state = self.handle.state.lock();
            if state.closed {
                return Err(DeviceError::Closed(MOCK_DEVICE_NAME.to_string()));
            }
            state.read_delay
        };
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        let mut state = self.handle.state.lock();
        state.reads += 1;
        match state.script.pop_front() {
            Some(Scripted::Reading(reading)) => Ok(reading),
            Some(Scripted::Failure) => Err(DeviceError::communication(
                MOCK_DEVICE_NAME,
                "scripted read failure",
            )),
            None => Ok(state.default_reading.clone()),
        }
    }

    fn set_digital(&mut self, valve: &str, level: bool) -> HalResult<()> {
        let mut state = self.handle.state.lock();
        if state.closed {
            return Err(DeviceError::Closed(MOCK_DEVICE_NAME.to_string()).into());
        }
        if !state.known_valves.contains(valve) {
            return Err(HalError::unknown_valve(valve));
        }
        if state.failing_valves.contains(valve) {
            return Err(DeviceError::communication(MOCK_DEVICE_NAME, "scripted write failure").into());
        }
        state.writes.push(RecordedWrite {
            at: Instant::now(),
            command: ValveCommand::new(valve, level),
        });
        Ok(())
    }

    fn close(&mut self) {
        self.handle.state.lock().closed = true;
    }
}

/// Cloneable handle to a [`MockChannel`].
#[derive(Debug, Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockHandle {
    /// Queue one reading built from `(channel, value)` pairs.
    pub fn push_values(&self, values: &[(&str, f64)]) {
        self.state
            .lock()
            .script
            .push_back(Scripted::Reading(reading(values)));
    }

    /// Queue one value per reading for a single channel.
    pub fn push_series(&self, channel: &str, values: &[f64]) {
        let mut state = self.state.lock();
        for value in values {
            state
                .script
                .push_back(Scripted::Reading(reading(&[(channel, *value)])));
        }
    }

    /// Queue one failed read.
    pub fn push_failure(&self) {
        self.state.lock().script.push_back(Scripted::Failure);
    }

    /// Reading returned once the script is exhausted.
    pub fn set_default_values(&self, values: &[(&str, f64)]) {
        self.state.lock().default_reading = reading(values);
    }

    /// Sleep this long inside every read.
    pub fn set_read_delay(&self, delay: Duration) {
        self.state.lock().read_delay = delay;
    }

    /// Make writes to `valve` fail with a device error.
    pub fn fail_writes_to(&self, valve: &str) {
        self.state.lock().failing_valves.insert(valve.to_string());
    }

    /// Let writes to every valve succeed again.
    pub fn heal_writes(&self) {
        self.state.lock().failing_valves.clear();
    }

    /// Every successful write, in order.
    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.state.lock().writes.clone()
    }

    /// Commands of every successful write, in order.
    pub fn commands(&self) -> Vec<ValveCommand> {
        self.state
            .lock()
            .writes
            .iter()
            .map(|w| w.command.clone())
            .collect()
    }

    /// Last level written to `valve`.
    pub fn last_state(&self, valve: &str) -> Option<bool> {
        self.state
            .lock()
            .writes
            .iter()
            .rev()
            .find(|w| w.command.valve == valve)
            .map(|w| w.command.state)
    }

    /// Forget recorded writes.
    pub fn clear_writes(&self) {
        self.state.lock().writes.clear();
    }

    /// Number of read attempts, including failures.
    pub fn read_count(&self) -> u64 {
        self.state.lock().reads
    }

    /// Readings still queued.
    pub fn pending_script(&self) -> usize {
        self.state.lock().script.len()
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

fn reading(values: &[(&str, f64)]) -> AnalogReading {
    values
        .iter()
        .map(|(channel, value)| ((*channel).to_string(), *value))
        .collect()
}
