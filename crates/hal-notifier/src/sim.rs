//! Simulated-time stepping.
//!
//! [`SimTiming`] drives a [`SimClock`] shared with a [`NotifierHal`]. Real-time
//! firing is paused for the lifetime of the driver, so notifiers only fire
//! when the driver moves the clock and runs the wakeup barrier.

use crate::hal::NotifierHal;
use hal_common::time::{SimClock, TimeSource};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Simulation clock driver.
#[derive(Debug)]
pub struct SimTiming {
    hal: Arc<NotifierHal>,
    clock: Arc<SimClock>,
}

impl SimTiming {
    /// Take control of timing. `hal` must have been built on `clock`.
    pub fn new(hal: Arc<NotifierHal>, clock: Arc<SimClock>) -> Self {
        hal.pause();
        Self { hal, clock }
    }

    /// Current simulated time in microseconds.
    pub fn now_us(&self) -> u64 {
        self.clock.now_us()
    }

    /// Advance simulated time by `delta`, firing every alarm that falls due
    /// along the way at its own deadline.
    ///
    /// Time is moved in sub-steps that stop at each pending notifier timeout,
    /// and the wakeup barrier runs after each sub-step so owners can re-arm
    /// before time moves on. Returns the new time.
    pub fn step_timing(&self, delta: Duration) -> u64 {
        let mut remaining = u64::try_from(delta.as_micros()).unwrap_or(u64::MAX);

        // Let anything already due settle before time moves.
        self.hal.sync_wakeups();

        while remaining > 0 {
            let now = self.clock.now_us();
            let next = self.hal.next_timeout();
            // A deadline at or before `now` still advances by 1us so re-arming
            // owners cannot stall the step.
            let step = next.saturating_sub(now).clamp(1, remaining);
            self.clock.advance_us(step);
            remaining -= step;
            let fired = self.hal.sync_wakeups();
            trace!(step_us = step, fired, "Simulation step");
        }

        self.clock.now_us()
    }
}

impl Drop for SimTiming {
    fn drop(&mut self) {
        self.hal.resume();
    }
}
