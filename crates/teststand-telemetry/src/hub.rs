//! Fan-out of audit events and sample batches to subscribers.
//!
//! Events are never dropped: each subscriber gets an unbounded channel.
//! Sample batches go through bounded channels with `try_send`; a slow
//! subscriber loses batches instead of stalling acquisition, and the loss is
//! counted. Subscribers whose receiver has been dropped are pruned on the
//! next publish.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use teststand_hal::SampleBatch;
use tracing::trace;

use crate::event::{Event, EventKind};

/// Default per-subscriber sample backlog.
pub const DEFAULT_SAMPLE_BACKLOG: usize = 256;

/// Publisher side of the telemetry surface.
#[derive(Debug)]
pub struct TelemetryHub {
    epoch: Instant,
    sample_backlog: usize,
    event_subscribers: Mutex<Vec<Sender<Event>>>,
    sample_subscribers: Mutex<Vec<Sender<SampleBatch>>>,
    events_published: AtomicU64,
    batches_dropped: AtomicU64,
}

impl Default for TelemetryHub {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryHub {
    /// Create a hub whose epoch is now.
    #[must_use]
    pub fn new() -> Self {
        Self::with_sample_backlog(DEFAULT_SAMPLE_BACKLOG)
    }

    /// Create a hub with a specific per-subscriber sample backlog.
    #[must_use]
    pub fn with_sample_backlog(backlog: usize) -> Self {
        Self {
            epoch: Instant::now(),
            sample_backlog: backlog.max(1),
            event_subscribers: Mutex::new(Vec::new()),
            sample_subscribers: Mutex::new(Vec::new()),
            events_published: AtomicU64::new(0),
            batches_dropped: AtomicU64::new(0),
        }
    }

    /// Instant that event offsets are measured from.
    #[must_use]
    pub fn epoch(&self) -> Instant {
        self.epoch
    }

    /// Monotonic offset of `at` from the epoch.
    #[must_use]
    pub fn offset_of(&self, at: Instant) -> Duration {
        at.saturating_duration_since(self.epoch)
    }

    /// Subscribe to every future event.
    #[must_use]
    pub fn subscribe_events(&self) -> Receiver<Event> {
        let (tx, rx) = channel::unbounded();
        self.event_subscribers.lock().push(tx);
        rx
    }

    /// Subscribe to future sample batches.
    #[must_use]
    pub fn subscribe_samples(&self) -> Receiver<SampleBatch> {
        let (tx, rx) = channel::bounded(self.sample_backlog);
        self.sample_subscribers.lock().push(tx);
        rx
    }

    /// Stamp and publish an event, returning it.
    pub fn emit(&self, label: impl Into<String>, kind: EventKind) -> Event {
        let event = Event::new(label, self.epoch.elapsed(), kind);
        trace!(label = %event.label, offset_ms = event.offset.as_millis(), "Telemetry event");
        self.publish_event(&event);
        event
    }

    /// Publish an already stamped event.
    pub fn publish_event(&self, event: &Event) {
        self.events_published.fetch_add(1, Ordering::Relaxed);
        self.event_subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Publish a sample batch without blocking.
    pub fn publish_samples(&self, batch: &SampleBatch) {
        self.sample_subscribers
            .lock()
            .retain(|tx| match tx.try_send(batch.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    self.batches_dropped.fetch_add(1, Ordering::Relaxed);
                    true
                }
                Err(TrySendError::Disconnected(_)) => false,
            });
    }

    /// Total events published.
    #[must_use]
    pub fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }

    /// Sample batches dropped because a subscriber was full.
    #[must_use]
    pub fn batches_dropped(&self) -> u64 {
        self.batches_dropped.load(Ordering::Relaxed)
    }

    /// Live subscriber counts as `(events, samples)`.
    #[must_use]
    pub fn subscriber_counts(&self) -> (usize, usize) {
        (
            self.event_subscribers.lock().len(),
            self.sample_subscribers.lock().len(),
        )
    }
}
