//! Simulated acquisition device for bench runs and tests.
//!
//! Each configured channel reads `base + spread * U[0,1)` where the base and
//! spread depend on the [`SensorKind`]. A [`SimulatorControl`] handle, cloned
//! before the channel is boxed, lets a host pin channel values, inject read
//! failures and inspect valve outputs.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use teststand_config::{SensorKind, StandConfig};
use tracing::{debug, warn};

use crate::channel::HardwareChannel;
use crate::error::{DeviceError, HalError, HalResult};
use crate::sample::{AnalogReading, ValveCommand};

/// Device name reported by simulated channels.
pub const SIMULATED_DEVICE_NAME: &str = "simulated";

/// Number of recent valve writes a simulator remembers.
pub const SIMULATED_WRITE_LOG_CAPACITY: usize = 1024;

/// Baseline and noise spread for a sensor kind.
#[must_use]
pub fn nominal_profile(kind: SensorKind) -> (f64, f64) {
    match kind {
        SensorKind::Pressure => (300.0, 10.0),
        SensorKind::Temperature => (20.0, 5.0),
        SensorKind::LoadCell => (15.0, 5.0),
    }
}

#[derive(Debug, Clone)]
struct SimulatedInput {
    name: String,
    base: f64,
    spread: f64,
}

#[derive(Debug, Default)]
struct SimState {
    overrides: HashMap<String, f64>,
    valves: BTreeMap<String, bool>,
    writes: VecDeque<ValveCommand>,
    pending_failures: u32,
    reads: u64,
    closed: bool,
}

/// A [`HardwareChannel`] backed by a noise generator.
#[derive(Debug)]
pub struct SimulatedChannel {
    inputs: Vec<SimulatedInput>,
    state: Arc<Mutex<SimState>>,
    rng: StdRng,
}

impl SimulatedChannel {
    /// Build a simulator for every channel and valve in `config`.
    ///
    /// Valves start at their configured safe state.
    #[must_use]
    pub fn from_config(config: &StandConfig) -> Self {
        Self::with_seed(config, rand::random())
    }

    /// Build a simulator with a fixed noise seed.
    #[must_use]
    pub fn with_seed(config: &StandConfig, seed: u64) -> Self {
        let inputs = config
            .channels
            .iter()
            .map(|channel| {
                let (base, spread) = nominal_profile(channel.kind);
                SimulatedInput {
                    name: channel.name.clone(),
                    base,
                    spread,
                }
            })
            .collect();

        let valves = config
            .valves
            .iter()
            .map(|valve| (valve.name.clone(), valve.safe_state))
            .collect();

        Self {
            inputs,
            state: Arc::new(Mutex::new(SimState {
                valves,
                ..SimState::default()
            })),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Handle for steering this simulator after it has been boxed.
    #[must_use]
    pub fn control(&self) -> SimulatorControl {
        SimulatorControl {
            state: Arc::clone(&self.state),
        }
    }
}

impl HardwareChannel for SimulatedChannel {
    fn name(&self) -> &str {
        SIMULATED_DEVICE_NAME
    }

    fn read_analog(&mut self) -> Result<AnalogReading, DeviceError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(DeviceError::Closed(SIMULATED_DEVICE_NAME.to_string()));
        }
        if state.pending_failures > 0 {
            state.pending_failures = state.pending_failures.saturating_sub(1);
            return Err(DeviceError::communication(
                SIMULATED_DEVICE_NAME,
                "injected read failure",
            ));
        }
        state.reads = state.reads.saturating_add(1);

        let mut reading = AnalogReading::new();
        for input in &self.inputs {
            let value = match state.overrides.get(&input.name) {
                Some(pinned) => *pinned,
                None => input.base + input.spread * self.rng.random::<f64>(),
            };
            reading.insert(input.name.clone(), value);
        }
        Ok(reading)
    }

    fn set_digital(&mut self, valve: &str, level: bool) -> HalResult<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(DeviceError::Closed(SIMULATED_DEVICE_NAME.to_string()).into());
        }
        let Some(output) = state.valves.get_mut(valve) else {
            warn!(valve, "Unknown valve on simulated device");
            return Err(HalError::unknown_valve(valve));
        };
        *output = level;
        if state.writes.len() >= SIMULATED_WRITE_LOG_CAPACITY {
            state.writes.pop_front();
        }
        state.writes.push_back(ValveCommand::new(valve, level));
        debug!(valve, state = level, "Simulated valve write");
        Ok(())
    }

    fn close(&mut self) {
        let mut state = self.state.lock();
        if !state.closed {
            state.closed = true;
            debug!("Simulated device closed");
        }
    }
}

/// Cloneable steering handle for a [`SimulatedChannel`].
#[derive(Debug, Clone)]
pub struct SimulatorControl {
    state: Arc<Mutex<SimState>>,
}

impl SimulatorControl {
    /// Pin a channel to a fixed value until cleared.
    pub fn set_value(&self, channel: &str, value: f64) {
        self.state.lock().overrides.insert(channel.to_string(), value);
    }

    /// Return a channel to generated noise.
    pub fn clear_value(&self, channel: &str) {
        self.state.lock().overrides.remove(channel);
    }

    /// Fail the next `count` reads with a communication error.
    pub fn fail_next_reads(&self, count: u32) {
        self.state.lock().pending_failures = count;
    }

    /// Current output level of a valve.
    #[must_use]
    pub fn valve_state(&self, valve: &str) -> Option<bool> {
        self.state.lock().valves.get(valve).copied()
    }

    /// The most recent successful valve writes, oldest first.
    ///
    /// At most [`SIMULATED_WRITE_LOG_CAPACITY`] are kept.
    #[must_use]
    pub fn writes(&self) -> Vec<ValveCommand> {
        self.state.lock().writes.iter().cloned().collect()
    }

    /// Number of successful analog reads.
    #[must_use]
    pub fn read_count(&self) -> u64 {
        self.state.lock().reads
    }

    /// Whether the channel has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}
