//! Prelude for teststand-config.
//!
//! This module re-exports the most commonly used types for convenient importing.

pub use crate::config::{StandConfig, StandConfigBuilder};
pub use crate::error::{ConfigError, ConfigResult};
pub use crate::types::{ChannelConfig, ChannelLimit, PhysicalAddress, SensorKind, ValveConfig};
