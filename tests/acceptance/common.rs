//! Common utilities for acceptance tests.
//!
//! Provides helpers for:
//! - Building HAL instances on real or simulated clocks
//! - Spawning waiter threads

use hal_common::time::{MonotonicClock, SimClock};
use hal_common::Handle;
use hal_notifier::NotifierHal;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Install a test-friendly tracing subscriber (once per process).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// HAL on real monotonic time.
pub fn realtime_hal() -> Arc<NotifierHal> {
    init_tracing();
    Arc::new(NotifierHal::new(Arc::new(MonotonicClock::new())))
}

/// HAL on a simulated clock starting at `start_us`.
pub fn sim_hal(start_us: u64) -> (Arc<SimClock>, Arc<NotifierHal>) {
    init_tracing();
    let clock = Arc::new(SimClock::new(start_us));
    let hal = Arc::new(NotifierHal::new(clock.clone()));
    (clock, hal)
}

/// Block on `handle` from a new thread.
pub fn spawn_waiter(hal: &Arc<NotifierHal>, handle: Handle) -> JoinHandle<u64> {
    let hal = Arc::clone(hal);
    thread::spawn(move || hal.wait_for_alarm(handle))
}

/// Milliseconds expressed in controller microseconds.
pub const fn ms(n: u64) -> u64 {
    n * 1_000
}
