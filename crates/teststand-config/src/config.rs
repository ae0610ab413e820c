//! The stand configuration and its builder.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};
use crate::types::{ChannelConfig, ChannelLimit, PhysicalAddress, SensorKind, ValveConfig};

/// Default acquisition period (milliseconds).
pub const DEFAULT_ACQUISITION_PERIOD_MS: u64 = 100;

/// Default heartbeat timeout as a multiple of the acquisition period.
pub const HEARTBEAT_PERIOD_MULTIPLIER: u32 = 3;

/// Default ignition sequencer abort-poll interval (milliseconds).
pub const DEFAULT_SEQUENCE_POLL_INTERVAL_MS: u64 = 50;

/// Upper bound on the sequencer poll interval (milliseconds).
pub const MAX_SEQUENCE_POLL_INTERVAL_MS: u64 = 100;

/// Default number of points kept per channel in rolling history.
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// Static configuration consumed by the control core.
///
/// The core reads this once at construction and never writes it back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandConfig {
    /// Acquisition loop period in milliseconds.
    #[serde(default = "default_period_ms")]
    pub acquisition_period_ms: u64,
    /// Heartbeat timeout in milliseconds; `None` derives it from the period.
    #[serde(default)]
    pub heartbeat_timeout_ms: Option<u64>,
    /// How often the ignition sequencer checks for an abort while waiting.
    #[serde(default = "default_poll_interval_ms")]
    pub sequence_poll_interval_ms: u64,
    /// Points retained per channel in rolling history.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// Analog inputs.
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
    /// Digital outputs.
    #[serde(default)]
    pub valves: Vec<ValveConfig>,
    /// Per-channel upper limits.
    #[serde(default)]
    pub limits: Vec<ChannelLimit>,
}

fn default_period_ms() -> u64 {
    DEFAULT_ACQUISITION_PERIOD_MS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_SEQUENCE_POLL_INTERVAL_MS
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

impl Default for StandConfig {
    fn default() -> Self {
        Self {
            acquisition_period_ms: DEFAULT_ACQUISITION_PERIOD_MS,
            heartbeat_timeout_ms: None,
            sequence_poll_interval_ms: DEFAULT_SEQUENCE_POLL_INTERVAL_MS,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            channels: Vec::new(),
            valves: Vec::new(),
            limits: Vec::new(),
        }
    }
}

impl StandConfig {
    /// Create a configuration builder.
    #[must_use]
    pub fn builder() -> StandConfigBuilder {
        StandConfigBuilder::default()
    }

    /// Parse and validate a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or fails validation.
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// The hot-fire stand layout: two LabJack devices, tank and chamber
    /// sensors, main/vent/igniter outputs.
    #[must_use]
    pub fn hotfire() -> Self {
        Self {
            heartbeat_timeout_ms: Some(1000),
            channels: vec![
                channel("Ox_tank_pressure", SensorKind::Pressure, "T7", "AIN0"),
                channel("CC_pressure", SensorKind::Pressure, "T7", "AIN1"),
                channel("thrust", SensorKind::LoadCell, "T7", "AIN2"),
                channel("Ox_tank_temp", SensorKind::Temperature, "T7_PRO", "AIN0"),
                channel("CC_temp", SensorKind::Temperature, "T7_PRO", "AIN1"),
            ],
            valves: vec![
                valve("MOV", "T7", "DIO0"),
                valve("Vent", "T7", "DIO1"),
                valve("Ignition", "T7", "DIO2"),
            ],
            limits: vec![
                ChannelLimit::new("Ox_tank_pressure", 800.0),
                ChannelLimit::new("CC_pressure", 600.0),
                ChannelLimit::new("Ox_tank_temp", 50.0),
                ChannelLimit::new("CC_temp", 200.0),
            ],
            ..Self::default()
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.acquisition_period_ms == 0 {
            return Err(ConfigError::invalid_configuration(
                "acquisition_period_ms must be greater than 0",
            ));
        }
        if self.heartbeat_timeout() <= self.acquisition_period() {
            return Err(ConfigError::invalid_configuration(
                "heartbeat_timeout_ms must exceed acquisition_period_ms",
            ));
        }
        if !(1..=MAX_SEQUENCE_POLL_INTERVAL_MS).contains(&self.sequence_poll_interval_ms) {
            return Err(ConfigError::invalid_configuration(
                "sequence_poll_interval_ms must be between 1 and 100",
            ));
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::invalid_configuration(
                "history_capacity must be greater than 0",
            ));
        }

        let mut seen = HashSet::new();
        for channel in &self.channels {
            if !seen.insert(channel.name.as_str()) {
                return Err(ConfigError::duplicate("channel", &channel.name));
            }
        }

        let mut seen = HashSet::new();
        for valve in &self.valves {
            if !seen.insert(valve.name.as_str()) {
                return Err(ConfigError::duplicate("valve", &valve.name));
            }
        }

        let mut seen = HashSet::new();
        for limit in &self.limits {
            if !seen.insert(limit.channel.as_str()) {
                return Err(ConfigError::duplicate("limit", &limit.channel));
            }
            if !limit.upper_bound.is_finite() {
                return Err(ConfigError::invalid_configuration(format!(
                    "upper_bound for {} must be finite",
                    limit.channel
                )));
            }
            if limit.required_consecutive_violations == 0 {
                return Err(ConfigError::invalid_configuration(format!(
                    "required_consecutive_violations for {} must be at least 1",
                    limit.channel
                )));
            }
        }

        Ok(())
    }

    /// Acquisition period.
    #[must_use]
    pub fn acquisition_period(&self) -> Duration {
        Duration::from_millis(self.acquisition_period_ms)
    }

    /// Heartbeat timeout, defaulting to three acquisition periods.
    #[must_use]
    pub fn heartbeat_timeout(&self) -> Duration {
        match self.heartbeat_timeout_ms {
            Some(ms) => Duration::from_millis(ms),
            None => self
                .acquisition_period()
                .saturating_mul(HEARTBEAT_PERIOD_MULTIPLIER),
        }
    }

    /// Ignition sequencer abort-poll interval.
    #[must_use]
    pub fn sequence_poll_interval(&self) -> Duration {
        Duration::from_millis(self.sequence_poll_interval_ms)
    }

    /// Look up a channel by logical name.
    #[must_use]
    pub fn channel(&self, name: &str) -> Option<&ChannelConfig> {
        self.channels.iter().find(|c| c.name == name)
    }

    /// Look up a valve by logical name.
    #[must_use]
    pub fn valve(&self, name: &str) -> Option<&ValveConfig> {
        self.valves.iter().find(|v| v.name == name)
    }

    /// Names of all configured valves, in declaration order.
    pub fn valve_names(&self) -> impl Iterator<Item = &str> {
        self.valves.iter().map(|v| v.name.as_str())
    }

    /// Limits whose channel has no configured address.
    ///
    /// These limits can never trip; hosts should surface them as warnings.
    #[must_use]
    pub fn unmapped_limits(&self) -> Vec<&str> {
        self.limits
            .iter()
            .filter(|l| self.channel(&l.channel).is_none())
            .map(|l| l.channel.as_str())
            .collect()
    }
}

fn channel(name: &str, kind: SensorKind, device: &str, register: &str) -> ChannelConfig {
    ChannelConfig {
        name: name.to_string(),
        kind,
        address: PhysicalAddress::new(device, register),
    }
}

fn valve(name: &str, device: &str, register: &str) -> ValveConfig {
    ValveConfig {
        name: name.to_string(),
        address: PhysicalAddress::new(device, register),
        safe_state: false,
    }
}

/// Builder for `StandConfig`.
#[derive(Debug, Default)]
pub struct StandConfigBuilder {
    config: StandConfig,
}

impl StandConfigBuilder {
    /// Set the acquisition period in milliseconds.
    #[must_use]
    pub fn acquisition_period_ms(mut self, ms: u64) -> Self {
        self.config.acquisition_period_ms = ms;
        self
    }

    /// Set an explicit heartbeat timeout in milliseconds.
    #[must_use]
    pub fn heartbeat_timeout_ms(mut self, ms: u64) -> Self {
        self.config.heartbeat_timeout_ms = Some(ms);
        self
    }

    /// Set the sequencer abort-poll interval in milliseconds.
    #[must_use]
    pub fn sequence_poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.sequence_poll_interval_ms = ms;
        self
    }

    /// Set the rolling history capacity per channel.
    #[must_use]
    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.config.history_capacity = capacity;
        self
    }

    /// Add an analog channel.
    #[must_use]
    pub fn channel(mut self, name: &str, kind: SensorKind, address: PhysicalAddress) -> Self {
        self.config.channels.push(ChannelConfig {
            name: name.to_string(),
            kind,
            address,
        });
        self
    }

    /// Add a valve output.
    #[must_use]
    pub fn valve(mut self, name: &str, address: PhysicalAddress, safe_state: bool) -> Self {
        self.config.valves.push(ValveConfig {
            name: name.to_string(),
            address,
            safe_state,
        });
        self
    }

    /// Add a channel limit.
    #[must_use]
    pub fn limit(mut self, limit: ChannelLimit) -> Self {
        self.config.limits.push(limit);
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> ConfigResult<StandConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StandConfig::default();
        assert_eq!(config.acquisition_period(), Duration::from_millis(100));
        assert_eq!(config.heartbeat_timeout(), Duration::from_millis(300));
        assert_eq!(config.sequence_poll_interval(), Duration::from_millis(50));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_hotfire_preset_is_valid() {
        let config = StandConfig::hotfire();
        assert!(config.validate().is_ok());
        assert_eq!(config.heartbeat_timeout(), Duration::from_secs(1));
        assert!(config.unmapped_limits().is_empty());
        assert_eq!(
            config.valve_names().collect::<Vec<_>>(),
            vec!["MOV", "Vent", "Ignition"]
        );
    }

    #[test]
    fn test_heartbeat_must_exceed_period() {
        let result = StandConfig::builder()
            .acquisition_period_ms(100)
            .heartbeat_timeout_ms(100)
            .build();
        assert!(matches!(result, Err(ConfigError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_poll_interval_bounds() {
        let result = StandConfig::builder().sequence_poll_interval_ms(0).build();
        assert!(result.is_err());

        let result = StandConfig::builder().sequence_poll_interval_ms(101).build();
        assert!(result.is_err());

        let result = StandConfig::builder().sequence_poll_interval_ms(100).build();
        assert!(result.is_ok());
    }

    #[test]
    fn test_duplicate_valve_rejected() {
        let result = StandConfig::builder()
            .valve("MOV", PhysicalAddress::new("T7", "DIO0"), false)
            .valve("MOV", PhysicalAddress::new("T7", "DIO3"), false)
            .build();
        assert_eq!(result, Err(ConfigError::duplicate("valve", "MOV")));
    }

    #[test]
    fn test_zero_debounce_rejected() {
        let result = StandConfig::builder()
            .limit(ChannelLimit::new("CC_pressure", 600.0).with_required_violations(0))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_unmapped_limits() -> Result<(), Box<dyn std::error::Error>> {
        let config = StandConfig::builder()
            .channel(
                "CC_pressure",
                SensorKind::Pressure,
                PhysicalAddress::new("T7", "AIN1"),
            )
            .limit(ChannelLimit::new("CC_pressure", 600.0))
            .limit(ChannelLimit::new("Injector_pressure", 650.0))
            .build()?;
        assert_eq!(config.unmapped_limits(), vec!["Injector_pressure"]);
        Ok(())
    }
}
