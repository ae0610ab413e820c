//! # teststand-config
//!
//! Configuration contract for the test-stand control core.
//!
//! The core consumes, but never owns or persists, its configuration:
//! logical channel and valve names mapped to physical device registers,
//! per-channel limits with debounce counts, the acquisition period, the
//! heartbeat timeout and the ignition sequencer's abort-poll interval.
//! Everything is read once at construction.
//!
//! ## Example
//!
//! ```rust
//! use teststand_config::prelude::*;
//!
//! let config = StandConfig::builder()
//!     .acquisition_period_ms(100)
//!     .channel("Ox_tank_pressure", SensorKind::Pressure, PhysicalAddress::new("T7", "AIN0"))
//!     .valve("Vent", PhysicalAddress::new("T7", "DIO1"), false)
//!     .limit(ChannelLimit::new("Ox_tank_pressure", 800.0))
//!     .build()
//!     .expect("valid config");
//!
//! assert_eq!(config.heartbeat_timeout().as_millis(), 300);
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

pub mod config;
pub mod error;
pub mod prelude;
pub mod types;

pub use config::{StandConfig, StandConfigBuilder};
pub use error::{ConfigError, ConfigResult};
pub use types::{
    ChannelConfig, ChannelLimit, DEFAULT_REQUIRED_VIOLATIONS, PhysicalAddress, SensorKind,
    ValveConfig,
};
