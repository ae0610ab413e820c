//! Liveness watchdog for the acquisition loop.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::condition::AbortCondition;
use crate::error::{WatchdogError, WatchdogResult};

/// Records the instant of the last successful acquisition and reports a
/// timeout once the gap exceeds the configured limit.
///
/// The watchdog never re-arms itself: after a timeout every check reports
/// again until a new beat arrives.
#[derive(Debug)]
pub struct HeartbeatWatchdog {
    timeout: Duration,
    last_beat: Mutex<Instant>,
    timeouts: AtomicU64,
    /// Set by the first timeout after a beat, cleared by the next beat.
    stalled: AtomicBool,
}

impl HeartbeatWatchdog {
    /// Create a watchdog whose first beat is now.
    ///
    /// # Errors
    ///
    /// Returns an error if `timeout` is zero.
    pub fn new(timeout: Duration) -> WatchdogResult<Self> {
        if timeout.is_zero() {
            return Err(WatchdogError::invalid_configuration(
                "heartbeat timeout must be greater than 0",
            ));
        }
        Ok(Self {
            timeout,
            last_beat: Mutex::new(Instant::now()),
            timeouts: AtomicU64::new(0),
            stalled: AtomicBool::new(false),
        })
    }

    /// Record a beat now.
    pub fn beat(&self) {
        self.beat_at(Instant::now());
    }

    /// Record a beat at `at`.
    pub fn beat_at(&self, at: Instant) {
        *self.last_beat.lock() = at;
        self.stalled.store(false, Ordering::Relaxed);
    }

    /// Check for a timeout now.
    pub fn check(&self) -> Option<AbortCondition> {
        self.check_at(Instant::now())
    }

    /// Check for a timeout as of `now`.
    pub fn check_at(&self, now: Instant) -> Option<AbortCondition> {
        let elapsed = now.saturating_duration_since(*self.last_beat.lock());
        if elapsed <= self.timeout {
            return None;
        }

        self.timeouts.fetch_add(1, Ordering::Relaxed);
        if self.stalled.swap(true, Ordering::Relaxed) {
            debug!(elapsed_ms = elapsed.as_millis(), "DAQ heartbeat still stale");
        } else {
            warn!(
                elapsed_ms = elapsed.as_millis(),
                timeout_ms = self.timeout.as_millis(),
                "DAQ heartbeat timeout"
            );
        }
        Some(AbortCondition::HeartbeatTimeout {
            elapsed,
            timeout: self.timeout,
        })
    }

    /// Time since the last beat.
    #[must_use]
    pub fn since_last_beat(&self) -> Duration {
        self.last_beat.lock().elapsed()
    }

    /// Configured timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Number of timeouts reported since creation.
    #[must_use]
    pub fn timeout_count(&self) -> u64 {
        self.timeouts.load(Ordering::Relaxed)
    }
}
