//! Prelude for common imports.

pub use crate::acquisition::{AcquisitionLoop, HistoryPoint, TickOutcome};
pub use crate::stats::AcquisitionStats;
