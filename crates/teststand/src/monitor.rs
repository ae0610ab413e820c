//! Heartbeat monitor worker.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use teststand_interlock::CancellationToken;
use teststand_watchdog::SafetyManager;
use tracing::{debug, info};

/// Thread name of the heartbeat monitor.
pub const HEARTBEAT_MONITOR_THREAD_NAME: &str = "heartbeat-monitor";

/// Check the heartbeat every `interval` until cancelled.
///
/// Abort conditions reach the interlock through the manager's callbacks.
pub fn run_heartbeat_monitor(safety: &SafetyManager, interval: Duration, cancel: &CancellationToken) {
    info!(interval_ms = interval.as_millis(), "Heartbeat monitor started");
    let mut checks: u64 = 0;
    while !cancel.wait_for(interval) {
        checks = checks.saturating_add(1);
        if let Some(condition) = safety.check_heartbeat() {
            debug!(check = checks, reason = %condition, "Heartbeat check raised condition");
        }
    }
    info!(checks, "Heartbeat monitor stopped");
}

/// Spawn the heartbeat monitor on its own thread.
///
/// # Errors
///
/// Returns the OS error if the thread cannot be created.
pub fn spawn_heartbeat_monitor(
    safety: Arc<SafetyManager>,
    interval: Duration,
    cancel: CancellationToken,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(HEARTBEAT_MONITOR_THREAD_NAME.to_string())
        .spawn(move || run_heartbeat_monitor(&safety, interval, &cancel))
}
