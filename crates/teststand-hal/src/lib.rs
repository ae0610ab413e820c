//! # teststand-hal
//!
//! Hardware abstraction for the test-stand control core.
//!
//! Every acquisition device is reached through the [`HardwareChannel`]
//! contract: read all analog inputs at once, drive one digital output,
//! close. Drivers live outside this crate; [`SimulatedChannel`] stands in
//! for real hardware on the bench and in tests.
//!
//! ## Error model
//!
//! - [`DeviceError`] is transient. The acquisition loop skips the tick and
//!   the heartbeat watchdog decides when a stall becomes an abort.
//! - [`HalError::UnknownValve`] is a configuration error. It is logged and
//!   the caller keeps going.
//!
//! ## Example
//!
//! ```rust
//! use teststand_config::StandConfig;
//! use teststand_hal::prelude::*;
//!
//! let sim = SimulatedChannel::with_seed(&StandConfig::hotfire(), 1);
//! let control = sim.control();
//! let channel = SharedChannel::new(Box::new(sim));
//!
//! control.set_value("Ox_tank_pressure", 512.0);
//! let reading = channel.read_analog().expect("simulator is open");
//! assert_eq!(reading.get("Ox_tank_pressure"), Some(&512.0));
//!
//! channel.apply(&ValveCommand::open("Vent")).expect("Vent is mapped");
//! assert_eq!(control.valve_state("Vent"), Some(true));
//! ```

#![deny(
    unsafe_op_in_unsafe_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    missing_debug_implementations
)]
#![warn(clippy::pedantic)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod channel;
pub mod error;
pub mod sample;
pub mod simulated;

pub mod prelude;

pub use channel::{HardwareChannel, SharedChannel};
pub use error::{DeviceError, HalError, HalResult};
pub use sample::{AnalogReading, Sample, SampleBatch, ValveCommand};
pub use simulated::{
    SIMULATED_DEVICE_NAME, SIMULATED_WRITE_LOG_CAPACITY, SimulatedChannel, SimulatorControl,
    nominal_profile,
};
