//! Per-alarm state and the blocking wait loop.
//!
//! A [`Notifier`] is shared through an `Arc` between the registry, the thread
//! that owns the alarm, the thread waiting on it, and the simulation driver.
//! Every read or write of its state happens under its own mutex.

use hal_common::time::{micros, TimeSource, NO_DEADLINE};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::trace;

/// Mutable alarm state guarded by [`Notifier`]'s lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifierState {
    /// Optional label; empty when unnamed.
    pub name: String,
    /// Trigger time in microseconds. Only meaningful while `armed`.
    pub deadline: u64,
    /// Cleared once by stop/free/shutdown and never set again.
    pub alive: bool,
    /// A deadline is pending.
    pub armed: bool,
    /// Incremented once per call that begins waiting.
    pub wake_count: u64,
}

impl Default for NotifierState {
    fn default() -> Self {
        Self {
            name: String::new(),
            deadline: 0,
            alive: true,
            armed: false,
            wake_count: 0,
        }
    }
}

/// One single-shot alarm.
#[derive(Debug, Default)]
pub struct Notifier {
    state: Mutex<NotifierState>,
    cond: Condvar,
}

impl Notifier {
    /// Create a live, unarmed notifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the state.
    pub(crate) fn lock(&self) -> MutexGuard<'_, NotifierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current state.
    #[must_use]
    pub fn state(&self) -> NotifierState {
        self.lock().clone()
    }

    /// Wake every thread blocked on this notifier so it re-evaluates.
    pub fn notify(&self) {
        self.cond.notify_all();
    }

    /// Replace the label.
    pub fn set_name(&self, name: &str) {
        let mut state = self.lock();
        name.clone_into(&mut state.name);
    }

    /// Set a new deadline. [`NO_DEADLINE`] disarms.
    ///
    /// Waiters are always woken so they recompute their sleep, including when
    /// the alarm was disarmed.
    pub fn update_alarm(&self, deadline: u64) {
        {
            let mut state = self.lock();
            state.deadline = deadline;
            state.armed = deadline != NO_DEADLINE;
        }
        self.notify();
    }

    /// Disarm without waking. A sleeping waiter sees it on its next pass.
    pub fn cancel_alarm(&self) {
        self.lock().armed = false;
    }

    /// Mark dead and wake all waiters. Idempotent.
    pub fn deactivate(&self) {
        {
            let mut state = self.lock();
            state.alive = false;
            state.armed = false;
        }
        self.notify();
    }

    /// Returns true until the notifier is stopped or freed.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.lock().alive
    }

    /// Current wake generation.
    #[must_use]
    pub fn wake_count(&self) -> u64 {
        self.lock().wake_count
    }

    /// Block until the armed deadline passes or the notifier dies.
    ///
    /// `state` must be this notifier's guard with the wake generation already
    /// advanced. Returns the sampled time that satisfied the deadline, or 0 if
    /// the notifier went inactive first.
    pub(crate) fn wait_locked<'a>(
        &'a self,
        mut state: MutexGuard<'a, NotifierState>,
        clock: &dyn TimeSource,
        paused: &AtomicBool,
        idle_wait: Duration,
    ) -> u64 {
        while state.alive {
            let now = clock.now_us();
            if state.armed && now >= state.deadline {
                state.armed = false;
                return now;
            }

            let timeout = if !state.armed || paused.load(Ordering::Acquire) {
                idle_wait
            } else {
                micros(state.deadline - now)
            };
            trace!(
                now_us = now,
                armed = state.armed,
                sleep_us = timeout.as_micros(),
                "Notifier sleeping"
            );

            state = self
                .cond
                .wait_timeout(state, timeout)
                .map_or_else(|e| e.into_inner().0, |(guard, _)| guard);
        }
        0
    }
}
