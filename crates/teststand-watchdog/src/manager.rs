//! Unified abort channel over both watchdogs.
//!
//! `SafetyManager` owns no policy of its own. It forwards samples and beats
//! to the watchdogs and re-emits every abort condition they raise to the
//! registered callbacks and subscribers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use teststand_config::StandConfig;
use teststand_hal::{Sample, SampleBatch};

use crate::condition::AbortCondition;
use crate::error::WatchdogResult;
use crate::heartbeat::HeartbeatWatchdog;
use crate::threshold::ThresholdWatchdog;

/// Callback invoked for every abort condition.
pub type AbortCallback = Arc<dyn Fn(&AbortCondition) + Send + Sync>;

/// Safety façade used by the acquisition loop and the heartbeat monitor.
pub struct SafetyManager {
    threshold: ThresholdWatchdog,
    heartbeat: HeartbeatWatchdog,
    abort_callbacks: RwLock<Vec<AbortCallback>>,
    subscribers: Mutex<Vec<Sender<AbortCondition>>>,
    conditions_raised: AtomicU64,
}

impl std::fmt::Debug for SafetyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SafetyManager")
            .field("threshold", &self.threshold)
            .field("heartbeat", &self.heartbeat)
            .field("abort_callbacks", &self.abort_callbacks.read().len())
            .field("conditions_raised", &self.conditions_raised())
            .finish_non_exhaustive()
    }
}

impl SafetyManager {
    /// Combine two watchdogs.
    #[must_use]
    pub fn new(threshold: ThresholdWatchdog, heartbeat: HeartbeatWatchdog) -> Self {
        Self {
            threshold,
            heartbeat,
            abort_callbacks: RwLock::new(Vec::new()),
            subscribers: Mutex::new(Vec::new()),
            conditions_raised: AtomicU64::new(0),
        }
    }

    /// Build both watchdogs from a stand configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the limits or the heartbeat timeout are invalid.
    pub fn from_config(config: &StandConfig) -> WatchdogResult<Self> {
        Ok(Self::new(
            ThresholdWatchdog::from_config(config)?,
            HeartbeatWatchdog::new(config.heartbeat_timeout())?,
        ))
    }

    /// Evaluate one sample.
    pub fn evaluate(&self, sample: &Sample) -> Option<AbortCondition> {
        let condition = self.threshold.evaluate(sample)?;
        self.dispatch(&condition);
        Some(condition)
    }

    /// Evaluate every sample of a batch.
    pub fn evaluate_batch(&self, batch: &SampleBatch) -> Vec<AbortCondition> {
        let conditions = self.threshold.evaluate_batch(batch);
        for condition in &conditions {
            self.dispatch(condition);
        }
        conditions
    }

    /// Record a successful acquisition.
    pub fn beat(&self) {
        self.heartbeat.beat();
    }

    /// Check the heartbeat now.
    pub fn check_heartbeat(&self) -> Option<AbortCondition> {
        self.check_heartbeat_at(Instant::now())
    }

    /// Check the heartbeat as of `now`.
    pub fn check_heartbeat_at(&self, now: Instant) -> Option<AbortCondition> {
        let condition = self.heartbeat.check_at(now)?;
        self.dispatch(&condition);
        Some(condition)
    }

    /// Clear violation streaks and restart the heartbeat window.
    pub fn reset(&self) {
        self.threshold.reset();
        self.heartbeat.beat();
    }

    /// Register a callback for every future abort condition.
    pub fn add_abort_callback<F>(&self, callback: F)
    where
        F: Fn(&AbortCondition) + Send + Sync + 'static,
    {
        self.abort_callbacks.write().push(Arc::new(callback));
    }

    /// Receive every future abort condition on a channel.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<AbortCondition> {
        let (tx, rx) = channel::unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Threshold watchdog.
    #[must_use]
    pub fn threshold(&self) -> &ThresholdWatchdog {
        &self.threshold
    }

    /// Heartbeat watchdog.
    #[must_use]
    pub fn heartbeat(&self) -> &HeartbeatWatchdog {
        &self.heartbeat
    }

    /// Conditions dispatched since creation.
    #[must_use]
    pub fn conditions_raised(&self) -> u64 {
        self.conditions_raised.load(Ordering::Relaxed)
    }

    fn dispatch(&self, condition: &AbortCondition) {
        self.conditions_raised.fetch_add(1, Ordering::Relaxed);

        // Callbacks may re-enter the manager, so none run under the lock.
        let callbacks: Vec<AbortCallback> = self.abort_callbacks.read().clone();
        for callback in &callbacks {
            callback(condition);
        }

        self.subscribers
            .lock()
            .retain(|tx| tx.send(condition.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use teststand_config::ChannelLimit;
    use teststand_test_helpers::prelude::*;

    fn manager() -> SafetyManager {
        SafetyManager::new(
            must(ThresholdWatchdog::new([ChannelLimit::new("Ox_tank_pressure", 800.0)])),
            must(HeartbeatWatchdog::new(Duration::from_millis(300))),
        )
    }

    #[test]
    fn test_callbacks_see_every_condition() {
        let safety = manager();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_cb = Arc::clone(&seen);
        safety.add_abort_callback(move |_| {
            seen_cb.fetch_add(1, Ordering::SeqCst);
        });

        for tick in 1..=4 {
            safety.evaluate_batch(&batch(tick, &[("Ox_tank_pressure", 850.0)]));
        }

        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert_eq!(safety.conditions_raised(), 2);
    }

    #[test]
    fn test_subscriber_receives_heartbeat_timeout() -> TestResult {
        let safety = manager();
        let rx = safety.subscribe();
        let start = Instant::now();
        safety.heartbeat().beat_at(start);

        assert!(safety.check_heartbeat_at(start + Duration::from_millis(100)).is_none());
        let raised = safety
            .check_heartbeat_at(start + Duration::from_millis(400))
            .ok_or("expected timeout")?;

        assert_eq!(rx.try_recv()?, raised);
        assert!(raised.is_heartbeat_timeout());
        Ok(())
    }

    #[test]
    fn test_reset_clears_streak_and_beats() {
        let safety = manager();
        safety.evaluate(&sample("Ox_tank_pressure", 900.0));
        safety.evaluate(&sample("Ox_tank_pressure", 900.0));
        safety.reset();

        assert_eq!(safety.threshold().consecutive_count("Ox_tank_pressure"), 0);
        assert!(safety.heartbeat().since_last_beat() < Duration::from_millis(300));
    }

    #[test]
    fn test_callback_may_reenter_manager() {
        let safety = Arc::new(manager());
        let weak = Arc::downgrade(&safety);
        safety.add_abort_callback(move |_| {
            if let Some(safety) = weak.upgrade() {
                safety.reset();
            }
        });

        for _ in 0..3 {
            safety.evaluate(&sample("Ox_tank_pressure", 900.0));
        }
        assert_eq!(safety.threshold().consecutive_count("Ox_tank_pressure"), 0);
    }
}
