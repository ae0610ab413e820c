//! Prelude for common imports.
//!
//! ```rust
//! use teststand_interlock::prelude::*;
//! ```

pub use crate::cancel::{CancellationToken, MAX_WAIT};
pub use crate::error::{InterlockError, InterlockResult};
pub use crate::interlock::Interlock;
pub use crate::sequence::{IgnitionSequence, SequenceStep, StepAction};
pub use crate::sequencer::{
    AbortCause, IgnitionSequencer, SequenceAborted, SequenceActuator, SequenceEvent,
    SequenceOutcome, SequenceReport,
};
pub use crate::state::SystemState;
