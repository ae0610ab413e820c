//! # teststand-acquisition
//!
//! Fixed-period data acquisition for the test-stand control core.
//!
//! [`AcquisitionLoop`] reads every analog channel once per period and hands
//! each batch, in order, to the [`SafetyManager`](teststand_watchdog::SafetyManager),
//! the per-channel rolling history and the telemetry hub, then records a
//! heartbeat. A failed read skips the tick without a heartbeat, so a stalled
//! device surfaces as a heartbeat timeout rather than an error here.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use teststand_acquisition::prelude::*;
//! use teststand_config::StandConfig;
//! use teststand_hal::{SharedChannel, SimulatedChannel};
//! use teststand_telemetry::TelemetryHub;
//! use teststand_watchdog::SafetyManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StandConfig::hotfire();
//! let acquisition = AcquisitionLoop::new(
//!     SharedChannel::new(Box::new(SimulatedChannel::from_config(&config))),
//!     Arc::new(SafetyManager::from_config(&config)?),
//!     Arc::new(TelemetryHub::new()),
//!     &config,
//! );
//!
//! assert!(matches!(acquisition.tick(), TickOutcome::Published { samples: 5, .. }));
//! assert_eq!(acquisition.history("CC_pressure").map(|h| h.len()), Some(1));
//! # Ok(())
//! # }
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

pub mod acquisition;
pub mod stats;

pub mod prelude;

pub use acquisition::{AcquisitionLoop, HistoryPoint, TickOutcome};
pub use stats::AcquisitionStats;
