//! Shared test utilities for the test-stand control core.
//!
//! # Modules
//!
//! - [`mod@must`] - Unwrap helpers with `#[track_caller]`
//! - [`mock`] - Scripted [`HardwareChannel`](teststand_hal::HardwareChannel)
//! - [`fixtures`] - Sample and configuration builders
//! - [`prelude`] - Convenience re-exports
//!
//! ```rust,ignore
//! use teststand_test_helpers::prelude::*;
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![allow(clippy::unwrap_used, clippy::panic)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod fixtures;
pub mod mock;
pub mod must;
pub mod prelude;

pub use must::*;
