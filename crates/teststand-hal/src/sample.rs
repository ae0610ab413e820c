//! Acquisition data types.

use std::collections::BTreeMap;
use std::time::Instant;

/// One analog read across all channels, keyed by logical channel name.
pub type AnalogReading = BTreeMap<String, f64>;

/// A single timestamped channel value.
///
/// Samples are immutable; every consumer receives its own copy.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Monotonic acquisition instant.
    pub timestamp: Instant,
    /// Logical channel name.
    pub channel: String,
    /// Measured value in engineering units.
    pub value: f64,
}

impl Sample {
    /// Create a new sample.
    #[must_use]
    pub fn new(timestamp: Instant, channel: impl Into<String>, value: f64) -> Self {
        Self {
            timestamp,
            channel: channel.into(),
            value,
        }
    }
}

/// All samples produced by one acquisition tick.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBatch {
    /// Tick sequence number, starting at 1.
    pub tick: u64,
    /// Instant shared by every sample of the batch.
    pub timestamp: Instant,
    /// One sample per channel in the reading.
    pub samples: Vec<Sample>,
}

impl SampleBatch {
    /// Stamp a reading into a batch.
    #[must_use]
    pub fn from_reading(tick: u64, timestamp: Instant, reading: &AnalogReading) -> Self {
        let samples = reading
            .iter()
            .map(|(channel, value)| Sample::new(timestamp, channel.clone(), *value))
            .collect();
        Self {
            tick,
            timestamp,
            samples,
        }
    }

    /// Value of `channel` in this batch.
    #[must_use]
    pub fn value(&self, channel: &str) -> Option<f64> {
        self.samples
            .iter()
            .find(|s| s.channel == channel)
            .map(|s| s.value)
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// A requested output level for one valve.
///
/// Produced by the interlock or the ignition sequencer and consumed
/// immediately by the hardware channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValveCommand {
    /// Logical valve name.
    pub valve: String,
    /// `true` energizes the output.
    pub state: bool,
}

impl ValveCommand {
    /// Create a command.
    #[must_use]
    pub fn new(valve: impl Into<String>, state: bool) -> Self {
        Self {
            valve: valve.into(),
            state,
        }
    }

    /// Energize (open) a valve.
    #[must_use]
    pub fn open(valve: impl Into<String>) -> Self {
        Self::new(valve, true)
    }

    /// De-energize (close) a valve.
    #[must_use]
    pub fn close(valve: impl Into<String>) -> Self {
        Self::new(valve, false)
    }

    /// Audit label, e.g. `Ignition_ON`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}_{}", self.valve, if self.state { "ON" } else { "OFF" })
    }
}
