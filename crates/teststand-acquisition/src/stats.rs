//! Acquisition counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counter snapshot returned by [`AcquisitionLoop::stats`](crate::AcquisitionLoop::stats).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AcquisitionStats {
    /// Ticks attempted.
    pub ticks: u64,
    /// Ticks skipped because the device read failed.
    pub skipped_ticks: u64,
    /// Ticks that started late because the previous one overran the period.
    pub overruns: u64,
    /// Samples published to telemetry.
    pub samples_published: u64,
    /// Abort conditions raised while evaluating batches.
    pub abort_conditions: u64,
}

impl AcquisitionStats {
    /// Ticks that produced a batch.
    #[must_use]
    pub fn successful_ticks(&self) -> u64 {
        self.ticks.saturating_sub(self.skipped_ticks)
    }
}

#[derive(Debug, Default)]
pub(crate) struct AcquisitionCounters {
    ticks: AtomicU64,
    skipped_ticks: AtomicU64,
    overruns: AtomicU64,
    samples_published: AtomicU64,
    abort_conditions: AtomicU64,
}

impl AcquisitionCounters {
    /// Count a tick and return its sequence number, starting at 1.
    pub(crate) fn next_tick(&self) -> u64 {
        self.ticks.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    pub(crate) fn inc_skipped(&self) {
        self.skipped_ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_overrun(&self) {
        self.overruns.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add_samples(&self, count: u64) {
        self.samples_published.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn add_conditions(&self, count: u64) {
        self.abort_conditions.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> AcquisitionStats {
        AcquisitionStats {
            ticks: self.ticks.load(Ordering::Relaxed),
            skipped_ticks: self.skipped_ticks.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
            samples_published: self.samples_published.load(Ordering::Relaxed),
            abort_conditions: self.abort_conditions.load(Ordering::Relaxed),
        }
    }
}
