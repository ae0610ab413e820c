//! # teststand-interlock
//!
//! Arm/fire/abort interlock and timed ignition sequencer.
//!
//! ## State machine
//!
//! ```text
//!   SAFE --arm--> ARMED --begin_fire--> FIRING --sequence_finished--> ARMED
//!     \             |                     |
//!      \            v                     v
//!       '-------> ABORTED <--------------'      (abort, from any state)
//!                   |
//!                 reset --> SAFE
//! ```
//!
//! ## Guarantees
//!
//! - Valves leave their safe levels only in `Armed` or `Firing`.
//! - `abort` drives every configured valve to its safe level, cancels any
//!   running sequence and is a cheap no-op when already `Aborted`.
//! - The ignition sequencer actuates through the interlock, so a step that
//!   races an abort is refused.
//! - `reset` leaves `Aborted` only after every safe-level write succeeded.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use teststand_config::StandConfig;
//! use teststand_hal::{SharedChannel, SimulatedChannel};
//! use teststand_interlock::prelude::*;
//! use teststand_telemetry::TelemetryHub;
//!
//! # fn main() -> Result<(), InterlockError> {
//! let config = StandConfig::hotfire();
//! let hardware = SharedChannel::new(Box::new(SimulatedChannel::from_config(&config)));
//! let interlock = Arc::new(Interlock::new(
//!     hardware,
//!     &config,
//!     IgnitionSequence::hotfire(),
//!     Arc::new(TelemetryHub::new()),
//! )?);
//!
//! interlock.arm()?;
//! interlock.toggle_valve("Vent", true)?;
//! assert!(interlock.abort("operator abort"));
//! assert_eq!(interlock.state(), SystemState::Aborted);
//! assert_eq!(interlock.commanded_state("Vent"), Some(false));
//! # Ok(())
//! # }
//! ```

#![deny(
    unsafe_op_in_unsafe_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::panic,
    missing_docs,
    missing_debug_implementations
)]
#![warn(clippy::pedantic)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod cancel;
pub mod error;
pub mod interlock;
pub mod sequence;
pub mod sequencer;
pub mod state;

pub mod prelude;

pub use cancel::{CancellationToken, MAX_WAIT};
pub use error::{InterlockError, InterlockResult};
pub use interlock::{
    ABORT_LABEL, ARM_LABEL, IGNITION_ABORTED_LABEL, IGNITION_DONE_LABEL, IGNITION_START_LABEL,
    Interlock, RESET_LABEL,
};
pub use sequence::{IgnitionSequence, SequenceStep, StepAction};
pub use sequencer::{
    AbortCause, IgnitionSequencer, MAX_POLL_INTERVAL, SEQUENCE_COMPLETE_LABEL,
    SEQUENCE_START_LABEL, SequenceAborted, SequenceActuator, SequenceEvent, SequenceOutcome,
    SequenceReport,
};
pub use state::SystemState;
