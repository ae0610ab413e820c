//! Cooperative cancellation shared between the interlock and its workers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Longest single wait; longer timeouts are capped to this.
pub const MAX_WAIT: Duration = Duration::from_secs(24 * 60 * 60);

/// Deadline `timeout` from now, capped at [`MAX_WAIT`].
pub(crate) fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout.min(MAX_WAIT)).unwrap_or(now)
}

#[derive(Debug, Default)]
struct TokenInner {
    cancelled: Mutex<bool>,
    wake: Condvar,
}

/// A cloneable cancellation flag with an interruptible wait.
///
/// Cancelling wakes every thread blocked in [`CancellationToken::wait_for`]
/// immediately.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

impl CancellationToken {
    /// Create an uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the token. Repeated calls are no-ops.
    pub fn cancel(&self) {
        let mut cancelled = self.inner.cancelled.lock();
        if !*cancelled {
            *cancelled = true;
            self.inner.wake.notify_all();
        }
    }

    /// Whether the token has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.inner.cancelled.lock()
    }

    /// Block for up to `timeout` (at most [`MAX_WAIT`]), returning early on
    /// cancellation.
    ///
    /// Returns `true` if the token is cancelled.
    pub fn wait_for(&self, timeout: Duration) -> bool {
        self.wait_until(deadline_after(timeout))
    }

    /// Block until `deadline`, returning early on cancellation.
    ///
    /// Returns `true` if the token is cancelled.
    pub fn wait_until(&self, deadline: Instant) -> bool {
        let mut cancelled = self.inner.cancelled.lock();
        while !*cancelled {
            if self
                .inner
                .wake
                .wait_until(&mut cancelled, deadline)
                .timed_out()
            {
                break;
            }
        }
        *cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_wait_times_out() {
        let token = CancellationToken::new();
        let start = Instant::now();
        assert!(!token.wait_for(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_cancel_wakes_waiter() -> Result<(), Box<dyn std::error::Error>> {
        let token = CancellationToken::new();
        let waiter = {
            let token = token.clone();
            thread::spawn(move || {
                let start = Instant::now();
                let cancelled = token.wait_for(Duration::from_secs(10));
                (cancelled, start.elapsed())
            })
        };

        thread::sleep(Duration::from_millis(20));
        token.cancel();
        let (cancelled, waited) = waiter.join().map_err(|_| "waiter panicked")?;

        assert!(cancelled);
        assert!(waited < Duration::from_secs(2));
        Ok(())
    }

    #[test]
    fn test_unbounded_timeout_is_capped() {
        let before = Instant::now();
        let deadline = deadline_after(Duration::MAX);
        let latest = Instant::now() + MAX_WAIT;
        assert!(deadline > before);
        assert!(deadline <= latest);
    }

    #[test]
    fn test_cancel_wakes_maximal_wait() -> Result<(), Box<dyn std::error::Error>> {
        let token = CancellationToken::new();
        let waiter = {
            let token = token.clone();
            thread::spawn(move || token.wait_for(Duration::MAX))
        };

        thread::sleep(Duration::from_millis(20));
        token.cancel();
        assert!(waiter.join().map_err(|_| "waiter panicked")?);
        Ok(())
    }

    #[test]
    fn test_already_cancelled_returns_immediately() {
        let token = CancellationToken::new();
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
        assert!(token.wait_for(Duration::from_secs(10)));
    }
}
