//! Prelude for common imports.
//!
//! ```rust
//! use teststand_hal::prelude::*;
//! ```

pub use crate::channel::{HardwareChannel, SharedChannel};
pub use crate::error::{DeviceError, HalError, HalResult};
pub use crate::sample::{AnalogReading, Sample, SampleBatch, ValveCommand};
pub use crate::simulated::{SimulatedChannel, SimulatorControl};
