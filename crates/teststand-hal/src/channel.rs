//! The hardware capability and its shared handle.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{DeviceError, HalResult};
use crate::sample::{AnalogReading, ValveCommand};

/// Uniform read/write contract over an acquisition device.
///
/// Implementations are driven from several threads through a
/// [`SharedChannel`], which serializes every call.
pub trait HardwareChannel: Send {
    /// Device name for logging.
    fn name(&self) -> &str;

    /// Read every configured analog channel.
    ///
    /// # Errors
    ///
    /// Returns a [`DeviceError`] when the device cannot be read. Callers
    /// treat this as a missed heartbeat, never as fatal.
    fn read_analog(&mut self) -> Result<AnalogReading, DeviceError>;

    /// Drive one digital output.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::UnknownValve`](crate::HalError::UnknownValve) when
    /// the valve has no mapping, or a device error when the write fails.
    fn set_digital(&mut self, valve: &str, state: bool) -> HalResult<()>;

    /// Release the device. Calling this more than once is a no-op.
    fn close(&mut self);
}

/// Cloneable, mutex-guarded handle to a boxed [`HardwareChannel`].
///
/// The acquisition reader and the interlock writer both go through this
/// handle, so they never overlap on the device.
#[derive(Clone)]
pub struct SharedChannel {
    name: Arc<str>,
    inner: Arc<Mutex<Box<dyn HardwareChannel>>>,
}

impl SharedChannel {
    /// Wrap a channel.
    #[must_use]
    pub fn new(channel: Box<dyn HardwareChannel>) -> Self {
        Self {
            name: Arc::from(channel.name()),
            inner: Arc::new(Mutex::new(channel)),
        }
    }

    /// Device name captured at construction.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read all analog channels, holding the lock only for the read.
    ///
    /// # Errors
    ///
    /// Propagates the device error.
    pub fn read_analog(&self) -> Result<AnalogReading, DeviceError> {
        self.inner.lock().read_analog()
    }

    /// Apply a valve command.
    ///
    /// # Errors
    ///
    /// Propagates the channel error.
    pub fn apply(&self, command: &ValveCommand) -> HalResult<()> {
        self.inner.lock().set_digital(&command.valve, command.state)
    }

    /// Close the underlying channel.
    pub fn close(&self) {
        self.inner.lock().close();
    }
}

impl fmt::Debug for SharedChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedChannel")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
