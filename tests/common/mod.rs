//! Shared utilities for integration tests.

use std::time::Duration;
use tokio::time::Instant;
use zone_timeout::config::TimeoutConfig;
use zone_timeout::lifecycle::Shutdown;
use zone_timeout::TimeoutManager;

/// Start a coordinator with a zero default cool-down.
pub fn start_manager() -> (TimeoutManager, Shutdown) {
    start_manager_with(TimeoutConfig::default())
}

/// Start a coordinator with the given timeout settings.
#[allow(dead_code)]
pub fn start_manager_with(config: TimeoutConfig) -> (TimeoutManager, Shutdown) {
    let shutdown = Shutdown::new();
    let manager = TimeoutManager::spawn(&config, shutdown.subscribe());
    (manager, shutdown)
}

/// Block the current thread, standing in for synchronous I/O.
#[allow(dead_code)]
pub fn blocking_work(duration: Duration) {
    std::thread::sleep(duration);
}

/// Milliseconds elapsed since `start`.
#[allow(dead_code)]
pub fn elapsed_ms(start: Instant) -> u128 {
    start.elapsed().as_millis()
}
