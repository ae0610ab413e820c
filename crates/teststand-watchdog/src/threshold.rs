//! Debounced per-channel upper-limit watchdog.
//!
//! Every channel with a configured limit keeps a violation streak. A sample
//! above the bound (or a non-finite sample) extends the streak, any
//! in-bounds sample resets it to zero. Once the streak reaches the
//! configured count the watchdog emits an abort condition on every further
//! violating sample; deduplication happens in the interlock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use teststand_config::{ChannelLimit, StandConfig};
use teststand_hal::{Sample, SampleBatch};
use tracing::{debug, warn};

use crate::condition::AbortCondition;
use crate::error::{WatchdogError, WatchdogResult};

/// Streak state for one channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViolationState {
    /// Consecutive violating samples seen.
    pub consecutive_count: u32,
}

/// Threshold watchdog over a fixed set of channel limits.
#[derive(Debug)]
pub struct ThresholdWatchdog {
    limits: HashMap<String, ChannelLimit>,
    states: Mutex<HashMap<String, ViolationState>>,
    trips: AtomicU64,
}

impl ThresholdWatchdog {
    /// Create a watchdog.
    ///
    /// # Errors
    ///
    /// Returns an error for duplicate channels, non-finite bounds or a
    /// debounce count of zero.
    pub fn new(limits: impl IntoIterator<Item = ChannelLimit>) -> WatchdogResult<Self> {
        let mut by_channel = HashMap::new();
        for limit in limits {
            if !limit.upper_bound.is_finite() {
                return Err(WatchdogError::invalid_configuration(format!(
                    "upper bound for {} must be finite",
                    limit.channel
                )));
            }
            if limit.required_consecutive_violations == 0 {
                return Err(WatchdogError::invalid_configuration(format!(
                    "required_consecutive_violations for {} must be at least 1",
                    limit.channel
                )));
            }
            if by_channel.contains_key(&limit.channel) {
                return Err(WatchdogError::DuplicateLimit(limit.channel));
            }
            by_channel.insert(limit.channel.clone(), limit);
        }

        let states = by_channel
            .keys()
            .map(|channel| (channel.clone(), ViolationState::default()))
            .collect();

        Ok(Self {
            limits: by_channel,
            states: Mutex::new(states),
            trips: AtomicU64::new(0),
        })
    }

    /// Create a watchdog from the limits of a stand configuration.
    ///
    /// # Errors
    ///
    /// See [`ThresholdWatchdog::new`].
    pub fn from_config(config: &StandConfig) -> WatchdogResult<Self> {
        Self::new(config.limits.iter().cloned())
    }

    /// Feed one sample. Samples for channels without a limit are ignored.
    pub fn evaluate(&self, sample: &Sample) -> Option<AbortCondition> {
        let limit = self.limits.get(&sample.channel)?;

        let consecutive = {
            let mut states = self.states.lock();
            let state = states.get_mut(&sample.channel)?;
            if limit.is_violated_by(sample.value) {
                state.consecutive_count = state.consecutive_count.saturating_add(1);
            } else {
                state.consecutive_count = 0;
            }
            state.consecutive_count
        };

        if consecutive < limit.required_consecutive_violations {
            return None;
        }

        self.trips.fetch_add(1, Ordering::Relaxed);
        if consecutive == limit.required_consecutive_violations {
            warn!(
                channel = %sample.channel,
                value = sample.value,
                limit = limit.upper_bound,
                consecutive,
                "Threshold exceeded"
            );
        } else {
            debug!(
                channel = %sample.channel,
                value = sample.value,
                consecutive,
                "Threshold still exceeded"
            );
        }

        Some(AbortCondition::ThresholdExceeded {
            channel: sample.channel.clone(),
            value: sample.value,
            limit: limit.upper_bound,
            consecutive,
        })
    }

    /// Feed every sample of a batch, collecting the conditions raised.
    pub fn evaluate_batch(&self, batch: &SampleBatch) -> Vec<AbortCondition> {
        batch
            .samples
            .iter()
            .filter_map(|sample| self.evaluate(sample))
            .collect()
    }

    /// Current streak for a channel; zero for unknown channels.
    #[must_use]
    pub fn consecutive_count(&self, channel: &str) -> u32 {
        self.states
            .lock()
            .get(channel)
            .map_or(0, |state| state.consecutive_count)
    }

    /// Clear every streak.
    pub fn reset(&self) {
        for state in self.states.lock().values_mut() {
            *state = ViolationState::default();
        }
    }

    /// Number of conditions emitted since creation.
    #[must_use]
    pub fn trip_count(&self) -> u64 {
        self.trips.load(Ordering::Relaxed)
    }

    /// Limit configured for a channel.
    #[must_use]
    pub fn limit(&self, channel: &str) -> Option<&ChannelLimit> {
        self.limits.get(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teststand_test_helpers::prelude::*;

    fn watchdog(required: u32) -> ThresholdWatchdog {
        must(ThresholdWatchdog::new([ChannelLimit::new(
            "Ox_tank_pressure",
            800.0,
        )
        .with_required_violations(required)]))
    }

    #[test]
    fn test_streak_reset_by_in_bounds_sample() {
        let wd = watchdog(3);
        assert!(wd.evaluate(&sample("Ox_tank_pressure", 810.0)).is_none());
        assert!(wd.evaluate(&sample("Ox_tank_pressure", 810.0)).is_none());
        assert_eq!(wd.consecutive_count("Ox_tank_pressure"), 2);

        assert!(wd.evaluate(&sample("Ox_tank_pressure", 790.0)).is_none());
        assert_eq!(wd.consecutive_count("Ox_tank_pressure"), 0);
    }

    #[test]
    fn test_level_triggered_emission() {
        let wd = watchdog(2);
        assert!(wd.evaluate(&sample("Ox_tank_pressure", 900.0)).is_none());
        assert!(wd.evaluate(&sample("Ox_tank_pressure", 900.0)).is_some());
        assert!(wd.evaluate(&sample("Ox_tank_pressure", 900.0)).is_some());
        assert_eq!(wd.trip_count(), 2);
        assert_eq!(wd.consecutive_count("Ox_tank_pressure"), 3);
    }

    #[test]
    fn test_bound_is_exclusive() {
        let wd = watchdog(1);
        assert!(wd.evaluate(&sample("Ox_tank_pressure", 800.0)).is_none());
        assert!(wd.evaluate(&sample("Ox_tank_pressure", 800.1)).is_some());
    }

    #[test]
    fn test_nan_counts_as_violation() {
        let wd = watchdog(1);
        let condition = wd.evaluate(&sample("Ox_tank_pressure", f64::NAN));
        assert!(matches!(
            condition,
            Some(AbortCondition::ThresholdExceeded { consecutive: 1, .. })
        ));
    }

    #[test]
    fn test_unknown_channel_is_ignored() {
        let wd = watchdog(1);
        assert!(wd.evaluate(&sample("thrust", 1.0e9)).is_none());
        assert_eq!(wd.consecutive_count("thrust"), 0);
        assert_eq!(wd.trip_count(), 0);
    }

    #[test]
    fn test_reset_clears_streaks() {
        let wd = watchdog(3);
        wd.evaluate(&sample("Ox_tank_pressure", 810.0));
        wd.evaluate(&sample("Ox_tank_pressure", 810.0));
        wd.reset();
        assert_eq!(wd.consecutive_count("Ox_tank_pressure"), 0);
        assert!(wd.evaluate(&sample("Ox_tank_pressure", 810.0)).is_none());
    }

    #[test]
    fn test_rejects_bad_limits() {
        let zero = ThresholdWatchdog::new([ChannelLimit::new("a", 1.0).with_required_violations(0)]);
        assert!(matches!(zero, Err(WatchdogError::InvalidConfiguration(_))));

        let infinite = ThresholdWatchdog::new([ChannelLimit::new("a", f64::INFINITY)]);
        assert!(matches!(infinite, Err(WatchdogError::InvalidConfiguration(_))));

        let dup = ThresholdWatchdog::new([ChannelLimit::new("a", 1.0), ChannelLimit::new("a", 2.0)]);
        assert_eq!(dup.err(), Some(WatchdogError::DuplicateLimit("a".to_string())));
    }
}
