//! The fixed-period acquisition loop.
//!
//! Each tick reads every analog channel once, then fans the batch out in a
//! fixed order: safety evaluation, rolling history, telemetry, heartbeat.
//! The hardware lock is released before fan-out so an abort raised during
//! evaluation can drive the valves immediately.
//!
//! Scheduling uses absolute deadlines. A tick that overruns its period is
//! counted and the next tick starts at once; the schedule then restarts
//! from that instant instead of trying to catch up.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use teststand_config::StandConfig;
use teststand_hal::{DeviceError, SampleBatch, SharedChannel};
use teststand_interlock::CancellationToken;
use teststand_telemetry::{RingBuffer, TelemetryHub};
use teststand_watchdog::SafetyManager;
use tracing::{debug, info, trace, warn};

use crate::stats::{AcquisitionCounters, AcquisitionStats};

const ACQUISITION_THREAD_NAME: &str = "acquisition";

/// One point of rolling channel history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryPoint {
    /// Acquisition instant.
    pub timestamp: Instant,
    /// Measured value.
    pub value: f64,
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// A batch was read and fanned out.
    Published {
        /// Tick sequence number.
        tick: u64,
        /// Samples in the batch.
        samples: usize,
        /// Abort conditions raised by the batch.
        abort_conditions: usize,
    },
    /// The device read failed; nothing was published and no heartbeat was
    /// recorded.
    Skipped {
        /// Tick sequence number.
        tick: u64,
        /// Read error.
        error: DeviceError,
    },
}

/// Periodic reader feeding the watchdogs, history and telemetry.
#[derive(Debug)]
pub struct AcquisitionLoop {
    hardware: SharedChannel,
    safety: Arc<SafetyManager>,
    telemetry: Arc<TelemetryHub>,
    period: Duration,
    history: HashMap<String, RingBuffer<HistoryPoint>>,
    counters: AcquisitionCounters,
}

impl AcquisitionLoop {
    /// Create a loop for the channels and period of `config`.
    #[must_use]
    pub fn new(
        hardware: SharedChannel,
        safety: Arc<SafetyManager>,
        telemetry: Arc<TelemetryHub>,
        config: &StandConfig,
    ) -> Self {
        let history = config
            .channels
            .iter()
            .map(|channel| {
                (
                    channel.name.clone(),
                    RingBuffer::new(config.history_capacity),
                )
            })
            .collect();

        Self {
            hardware,
            safety,
            telemetry,
            period: config.acquisition_period(),
            history,
            counters: AcquisitionCounters::default(),
        }
    }

    /// Perform one acquisition iteration.
    pub fn tick(&self) -> TickOutcome {
        let tick = self.counters.next_tick();

        let reading = match self.hardware.read_analog() {
            Ok(reading) => reading,
            Err(error) => {
                self.counters.inc_skipped();
                warn!(
                    device = self.hardware.name(),
                    tick,
                    error = %error,
                    "Acquisition tick skipped"
                );
                return TickOutcome::Skipped { tick, error };
            }
        };

        let batch = SampleBatch::from_reading(tick, Instant::now(), &reading);
        let conditions = self.safety.evaluate_batch(&batch);
        self.record_history(&batch);
        self.telemetry.publish_samples(&batch);
        self.safety.beat();

        self.counters
            .add_samples(u64::try_from(batch.len()).unwrap_or(u64::MAX));
        self.counters
            .add_conditions(u64::try_from(conditions.len()).unwrap_or(u64::MAX));
        trace!(tick, samples = batch.len(), "Acquisition tick");

        TickOutcome::Published {
            tick,
            samples: batch.len(),
            abort_conditions: conditions.len(),
        }
    }

    /// Tick at the configured period until `cancel` fires.
    ///
    /// Cancellation is checked at every tick boundary and interrupts the
    /// wait between ticks immediately.
    pub fn run(&self, cancel: &CancellationToken) {
        info!(
            period_ms = self.period.as_millis(),
            channels = self.history.len(),
            "Acquisition loop started"
        );

        let mut deadline = Instant::now();
        while !cancel.is_cancelled() {
            self.tick();

            deadline = deadline.checked_add(self.period).unwrap_or(deadline);
            let now = Instant::now();
            if now >= deadline {
                self.counters.inc_overrun();
                debug!(
                    late_us = now.saturating_duration_since(deadline).as_micros(),
                    "Acquisition tick overran its period"
                );
                deadline = now;
                continue;
            }
            if cancel.wait_until(deadline) {
                break;
            }
        }

        info!(stats = ?self.stats(), "Acquisition loop stopped");
    }

    /// Run the loop on a named thread.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread cannot be spawned.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name(ACQUISITION_THREAD_NAME.to_string())
            .spawn(move || self.run(&cancel))
    }

    /// Counter snapshot.
    #[must_use]
    pub fn stats(&self) -> AcquisitionStats {
        self.counters.snapshot()
    }

    /// Rolling history of `channel`, oldest first.
    #[must_use]
    pub fn history(&self, channel: &str) -> Option<Vec<HistoryPoint>> {
        self.history.get(channel).map(RingBuffer::snapshot)
    }

    /// Most recent value of `channel`.
    #[must_use]
    pub fn latest(&self, channel: &str) -> Option<HistoryPoint> {
        self.history.get(channel).and_then(RingBuffer::latest)
    }

    /// Configured period.
    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    fn record_history(&self, batch: &SampleBatch) {
        for sample in &batch.samples {
            match self.history.get(&sample.channel) {
                Some(ring) => ring.push(HistoryPoint {
                    timestamp: sample.timestamp,
                    value: sample.value,
                }),
                None => trace!(channel = %sample.channel, "No history for unmapped channel"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teststand_test_helpers::prelude::*;

    fn acquisition(mock: MockChannel) -> (AcquisitionLoop, Arc<SafetyManager>, Arc<TelemetryHub>) {
        let config = small_stand_config();
        let safety = Arc::new(must(SafetyManager::from_config(&config)));
        let telemetry = Arc::new(TelemetryHub::new());
        let acq = AcquisitionLoop::new(
            SharedChannel::new(Box::new(mock)),
            Arc::clone(&safety),
            Arc::clone(&telemetry),
            &config,
        );
        (acq, safety, telemetry)
    }

    #[test]
    fn test_tick_publishes_and_beats() -> TestResult {
        let mock = MockChannel::for_config(&small_stand_config());
        mock.handle().push_values(&[("Ox_tank_pressure", 305.0)]);
        let (acq, safety, telemetry) = acquisition(mock);
        let samples = telemetry.subscribe_samples();
        let stale = Instant::now()
            .checked_sub(Duration::from_secs(1))
            .ok_or("clock too close to origin")?;
        safety.heartbeat().beat_at(stale);

        let outcome = acq.tick();

        assert_eq!(
            outcome,
            TickOutcome::Published {
                tick: 1,
                samples: 1,
                abort_conditions: 0
            }
        );
        assert_eq!(samples.try_recv()?.value("Ox_tank_pressure"), Some(305.0));
        assert!(safety.check_heartbeat().is_none());
        let latest = acq.latest("Ox_tank_pressure").ok_or("no history")?;
        assert!((latest.value - 305.0).abs() < f64::EPSILON);
        Ok(())
    }

    #[test]
    fn test_failed_read_skips_without_beat() -> TestResult {
        let mock = MockChannel::for_config(&small_stand_config());
        mock.handle().push_failure();
        let (acq, safety, telemetry) = acquisition(mock);
        let samples = telemetry.subscribe_samples();
        let stale = Instant::now()
            .checked_sub(Duration::from_secs(1))
            .ok_or("clock too close to origin")?;
        safety.heartbeat().beat_at(stale);

        let outcome = acq.tick();

        assert!(matches!(outcome, TickOutcome::Skipped { tick: 1, .. }));
        assert!(samples.is_empty());
        assert!(safety.check_heartbeat().is_some());
        assert_eq!(acq.stats().skipped_ticks, 1);
        assert_eq!(acq.history("Ox_tank_pressure").map(|h| h.len()), Some(0));
        Ok(())
    }

    #[test]
    fn test_history_is_bounded() {
        let config = StandConfig::builder()
            .acquisition_period_ms(10)
            .history_capacity(3)
            .channel(
                "thrust",
                teststand_config::SensorKind::LoadCell,
                teststand_config::PhysicalAddress::new("T7", "AIN2"),
            )
            .build();
        let config = must(config);
        let mock = MockChannel::for_config(&config);
        mock.handle().push_series("thrust", &[1.0, 2.0, 3.0, 4.0, 5.0]);
        let acq = AcquisitionLoop::new(
            SharedChannel::new(Box::new(mock)),
            Arc::new(must(SafetyManager::from_config(&config))),
            Arc::new(TelemetryHub::new()),
            &config,
        );

        for _ in 0..5 {
            acq.tick();
        }

        let values: Vec<f64> = must_some(acq.history("thrust"), "history")
            .iter()
            .map(|p| p.value)
            .collect();
        assert_eq!(values, vec![3.0, 4.0, 5.0]);
        assert_eq!(acq.stats().samples_published, 5);
    }
}
