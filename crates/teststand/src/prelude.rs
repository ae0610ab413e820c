//! Prelude for hosts driving a test stand.

pub use crate::command::CommandOutcome;
pub use crate::error::{StandError, StandResult};
pub use crate::stand::TestStand;

pub use teststand_acquisition::{AcquisitionStats, HistoryPoint, TickOutcome};
pub use teststand_config::{ChannelLimit, PhysicalAddress, SensorKind, StandConfig};
pub use teststand_hal::{HardwareChannel, SampleBatch, SimulatedChannel, ValveCommand};
pub use teststand_interlock::{IgnitionSequence, SequenceOutcome, SystemState};
pub use teststand_telemetry::{Event, EventKind};
pub use teststand_watchdog::AbortCondition;
