//! Prelude for common imports.

pub use crate::event::{Event, EventKind};
pub use crate::hub::TelemetryHub;
pub use crate::ring::RingBuffer;
