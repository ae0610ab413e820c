//! Prelude for common imports.
//!
//! ```rust
//! use teststand_watchdog::prelude::*;
//! ```

pub use crate::condition::AbortCondition;
pub use crate::error::{WatchdogError, WatchdogResult};
pub use crate::heartbeat::HeartbeatWatchdog;
pub use crate::manager::{AbortCallback, SafetyManager};
pub use crate::threshold::{ThresholdWatchdog, ViolationState};
