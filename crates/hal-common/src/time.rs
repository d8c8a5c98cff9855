//! Controller time sources.
//!
//! All HAL timestamps are microseconds on a monotonic timebase. Real hardware
//! uses [`MonotonicClock`]; simulation harnesses use [`SimClock`], which only
//! moves when told to.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Deadline value meaning "not armed".
pub const NO_DEADLINE: u64 = u64::MAX;

/// Source of the current controller time.
pub trait TimeSource: Send + Sync {
    /// Current time in microseconds. Never decreases.
    fn now_us(&self) -> u64;
}

/// Real monotonic time measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    /// Start a clock at zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicClock {
    fn now_us(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_micros()).unwrap_or(u64::MAX)
    }
}

/// Manually stepped clock for simulation.
#[derive(Debug, Default)]
pub struct SimClock {
    now_us: AtomicU64,
}

impl SimClock {
    /// Create a clock reading `start_us`.
    #[must_use]
    pub fn new(start_us: u64) -> Self {
        Self {
            now_us: AtomicU64::new(start_us),
        }
    }

    /// Move the clock forward by `delta` and return the new time.
    pub fn advance(&self, delta: Duration) -> u64 {
        let delta_us = u64::try_from(delta.as_micros()).unwrap_or(u64::MAX);
        self.advance_us(delta_us)
    }

    /// Move the clock forward by `delta_us` microseconds and return the new time.
    pub fn advance_us(&self, delta_us: u64) -> u64 {
        let prev = self
            .now_us
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |t| {
                Some(t.saturating_add(delta_us))
            })
            .unwrap_or_else(|t| t);
        prev.saturating_add(delta_us)
    }

    /// Jump to `time_us`. Earlier values are ignored to keep time monotonic.
    pub fn set(&self, time_us: u64) {
        self.now_us.fetch_max(time_us, Ordering::AcqRel);
    }
}

impl TimeSource for SimClock {
    fn now_us(&self) -> u64 {
        self.now_us.load(Ordering::Acquire)
    }
}

/// Convert a microsecond interval to a [`Duration`].
#[inline]
#[must_use]
pub fn micros(us: u64) -> Duration {
    Duration::from_micros(us)
}
