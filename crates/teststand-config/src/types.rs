//! Building blocks of the stand configuration: addresses, sensors, valves and limits.

use serde::{Deserialize, Serialize};

/// Default number of consecutive violating samples before a limit trips.
pub const DEFAULT_REQUIRED_VIOLATIONS: u32 = 3;

/// Physical location of a logical channel or valve on an acquisition device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhysicalAddress {
    /// Device identifier, e.g. `"T7"` or `"T7_PRO"`.
    pub device: String,
    /// Register on that device, e.g. `"AIN0"` or `"DIO1"`.
    pub register: String,
}

impl PhysicalAddress {
    /// Create a new address.
    #[must_use]
    pub fn new(device: impl Into<String>, register: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            register: register.into(),
        }
    }
}

impl core::fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.device, self.register)
    }
}

/// What an analog channel measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    /// Pressure transducer.
    Pressure,
    /// Thermocouple or RTD.
    Temperature,
    /// Load cell (thrust).
    LoadCell,
}

impl SensorKind {
    /// Get the kind as a string slice.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pressure => "pressure",
            Self::Temperature => "temperature",
            Self::LoadCell => "load_cell",
        }
    }
}

/// A logical analog input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Logical channel name used throughout the core.
    pub name: String,
    /// What the channel measures.
    pub kind: SensorKind,
    /// Where the channel is wired.
    pub address: PhysicalAddress,
}

/// A logical digital output driving a solenoid valve or the igniter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValveConfig {
    /// Logical valve name used by commands and sequences.
    pub name: String,
    /// Where the valve driver is wired.
    pub address: PhysicalAddress,
    /// Output level that puts this valve in its safe configuration.
    ///
    /// `false` (de-energized) for normally-closed valves; `true` only for
    /// outputs that must be energized to vent.
    #[serde(default)]
    pub safe_state: bool,
}

/// Upper limit and debounce for one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelLimit {
    /// Channel the limit applies to.
    pub channel: String,
    /// Samples strictly above this bound count as violations.
    pub upper_bound: f64,
    /// Consecutive violations required before an abort condition is raised.
    #[serde(default = "default_required_violations")]
    pub required_consecutive_violations: u32,
}

fn default_required_violations() -> u32 {
    DEFAULT_REQUIRED_VIOLATIONS
}

impl ChannelLimit {
    /// Create a limit with the default debounce of three samples.
    #[must_use]
    pub fn new(channel: impl Into<String>, upper_bound: f64) -> Self {
        Self {
            channel: channel.into(),
            upper_bound,
            required_consecutive_violations: DEFAULT_REQUIRED_VIOLATIONS,
        }
    }

    /// Override the debounce count.
    #[must_use]
    pub fn with_required_violations(mut self, count: u32) -> Self {
        self.required_consecutive_violations = count;
        self
    }

    /// Check whether `value` violates this limit.
    ///
    /// Non-finite readings are treated as violations.
    #[must_use]
    pub fn is_violated_by(&self, value: f64) -> bool {
        !value.is_finite() || value > self.upper_bound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_violation() {
        let limit = ChannelLimit::new("Ox_tank_pressure", 800.0);
        assert!(limit.is_violated_by(810.0));
        assert!(!limit.is_violated_by(800.0));
        assert!(!limit.is_violated_by(790.0));
        assert!(limit.is_violated_by(f64::NAN));
        assert!(limit.is_violated_by(f64::INFINITY));
    }

    #[test]
    fn test_limit_default_debounce() -> Result<(), Box<dyn std::error::Error>> {
        let limit: ChannelLimit =
            serde_json::from_str(r#"{"channel": "CC_temp", "upper_bound": 200.0}"#)?;
        assert_eq!(limit.required_consecutive_violations, 3);
        Ok(())
    }

    #[test]
    fn test_address_display() {
        let address = PhysicalAddress::new("T7", "DIO1");
        assert_eq!(address.to_string(), "T7/DIO1");
    }
}
