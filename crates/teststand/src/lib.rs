//! # teststand
//!
//! Control core for a liquid/hybrid rocket test stand.
//!
//! [`TestStand`] wires a [`HardwareChannel`](teststand_hal::HardwareChannel)
//! to the acquisition loop, the threshold and heartbeat watchdogs, and the
//! arm/fire/abort interlock with its timed ignition sequencer. Hosts drive it
//! through five commands and observe it through two streams.
//!
//! ## State machine
//!
//! ```text
//!   SAFE --arm--> ARMED --start_ignition--> FIRING --sequence done--> ARMED
//!     ^                                        |
//!     |                 abort (any state)      v
//!     +--------------reset--------------- ABORTED
//! ```
//!
//! Any watchdog condition, from either the threshold watchdog on the
//! acquisition thread or the heartbeat monitor, aborts the interlock. Abort
//! cancels a running sequence and drives every valve to its safe level.
//!
//! ## Example
//!
//! ```rust
//! use teststand::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StandConfig::hotfire();
//! let hardware = SimulatedChannel::with_seed(&config, 7);
//! let stand = TestStand::new(config, Box::new(hardware))?;
//!
//! assert!(stand.arm().is_accepted());
//! assert!(stand.toggle_valve("Vent", true).is_accepted());
//! assert!(stand.abort("operator").is_accepted());
//! assert_eq!(stand.state(), SystemState::Aborted);
//! assert!(!stand.start_ignition().is_accepted());
//! # Ok(())
//! # }
//! ```
//!
//! ## Threads
//!
//! [`TestStand::start`] spawns the acquisition loop and the heartbeat
//! monitor; [`TestStand::start_ignition`] spawns the sequencer. Every wait is
//! bounded and interruptible, so [`TestStand::stop`] returns within one
//! acquisition period.

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

pub mod command;
pub mod error;
pub mod monitor;
pub mod stand;

pub mod prelude;

pub use command::CommandOutcome;
pub use error::{StandError, StandResult};
pub use monitor::{HEARTBEAT_MONITOR_THREAD_NAME, run_heartbeat_monitor, spawn_heartbeat_monitor};
pub use stand::{STOP_ABORT_REASON, TestStand, WATCHDOG_TRIP_LABEL};
