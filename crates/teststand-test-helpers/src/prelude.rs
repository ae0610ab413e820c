//! Convenience re-exports for common test utilities.
//!
//! ```rust,ignore
//! use teststand_test_helpers::prelude::*;
//! ```

pub use crate::fixtures::{batch, sample, small_stand_config};
pub use crate::mock::{MOCK_DEVICE_NAME, MockChannel, MockHandle, RecordedWrite};
pub use crate::must::{must, must_some, must_with};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;
