//! # teststand-watchdog
//!
//! Safety watchdogs for the test-stand control core.
//!
//! ## Watchdogs
//!
//! - [`ThresholdWatchdog`] raises an abort once a channel has stayed above
//!   its upper bound for N consecutive samples. A single in-bounds sample
//!   resets the streak.
//! - [`HeartbeatWatchdog`] raises an abort when no successful acquisition
//!   has been recorded for longer than its timeout (3x the acquisition
//!   period by default).
//! - [`SafetyManager`] forwards to both and re-emits every
//!   [`AbortCondition`] through one channel: registered callbacks and
//!   crossbeam subscribers.
//!
//! Both watchdogs are level-triggered and keep emitting while the condition
//! holds. Turning repeated conditions into a single abort is the
//! interlock's job.
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use teststand_config::ChannelLimit;
//! use teststand_watchdog::prelude::*;
//!
//! # fn main() -> Result<(), WatchdogError> {
//! let safety = SafetyManager::new(
//!     ThresholdWatchdog::new([ChannelLimit::new("CC_pressure", 600.0)])?,
//!     HeartbeatWatchdog::new(Duration::from_millis(300))?,
//! );
//! safety.add_abort_callback(|condition| eprintln!("abort: {condition}"));
//! safety.beat();
//! assert!(safety.check_heartbeat().is_none());
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

pub mod condition;
pub mod error;
pub mod heartbeat;
pub mod manager;
pub mod threshold;

pub mod prelude;

pub use condition::AbortCondition;
pub use error::{WatchdogError, WatchdogResult};
pub use heartbeat::HeartbeatWatchdog;
pub use manager::{AbortCallback, SafetyManager};
pub use threshold::{ThresholdWatchdog, ViolationState};
