//! # teststand-telemetry
//!
//! Telemetry surface of the test-stand control core.
//!
//! - [`TelemetryHub`] fans audit [`Event`]s and sample batches out to any
//!   number of subscribers over crossbeam channels.
//! - [`RingBuffer`] keeps a rolling per-channel history for hosts that plot
//!   or export recent data.
//!
//! Rendering, plotting and CSV export belong to the host.
//!
//! ## Example
//!
//! ```rust
//! use teststand_telemetry::prelude::*;
//!
//! let hub = TelemetryHub::new();
//! let events = hub.subscribe_events();
//! hub.emit("ARM", EventKind::StateTransition { from: "SAFE", to: "ARMED" });
//! assert_eq!(events.try_recv().map(|e| e.label).ok(), Some("ARM".to_string()));
//!
//! let history = RingBuffer::new(2);
//! history.extend([1.0, 2.0, 3.0]);
//! assert_eq!(history.snapshot(), vec![2.0, 3.0]);
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

pub mod event;
pub mod hub;
pub mod ring;

pub mod prelude;

pub use event::{Event, EventKind};
pub use hub::{DEFAULT_SAMPLE_BACKLOG, TelemetryHub};
pub use ring::RingBuffer;
