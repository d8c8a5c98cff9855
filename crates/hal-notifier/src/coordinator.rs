//! Cross-notifier wake coordination: pause/resume and the simulation barrier.
//!
//! # Lock hierarchy
//!
//! ```text
//! coordinator lock  ──►  notifier lock  ──►  registry lock
//! ```
//!
//! A thread holding a notifier lock never acquires the coordinator lock, and
//! the registry lock is never held while anything else is acquired. The
//! barrier therefore locks notifiers one at a time instead of all at once.

use crate::notifier::{Notifier, NotifierState};
use crate::store::NotifierStore;
use crossbeam_utils::CachePadded;
use hal_common::handles::Handle;
use hal_common::time::TimeSource;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

/// Process-wide wake state shared by every notifier.
#[derive(Debug)]
pub struct WakeCoordinator {
    /// Serializes barrier scans against waiters starting a new cycle.
    lock: Mutex<()>,
    /// Signaled whenever a waiter starts a new cycle, and on teardown.
    cond: Condvar,
    /// Read by every wait pass.
    paused: CachePadded<AtomicBool>,
    /// Upper bound for one barrier wait before re-polling.
    sync_retry: Duration,
}

impl WakeCoordinator {
    /// Create an unpaused coordinator.
    #[must_use]
    pub fn new(sync_retry: Duration) -> Self {
        Self {
            lock: Mutex::new(()),
            cond: Condvar::new(),
            paused: CachePadded::new(AtomicBool::new(false)),
            sync_retry,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The paused flag consulted by waiters.
    pub(crate) fn paused_flag(&self) -> &AtomicBool {
        &self.paused
    }

    /// Returns true while real-time firing is suspended.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Suspend real-time firing. Armed deadlines are kept.
    ///
    /// Every notifier is woken so a waiter already sleeping toward its
    /// deadline switches to the idle sleep.
    pub fn pause(&self, store: &NotifierStore) {
        self.paused.store(true, Ordering::Release);
        self.wakeup_all(store);
        debug!("Notifiers paused");
    }

    /// Lift the pause and wake every notifier so it sleeps on its real deadline again.
    pub fn resume(&self, store: &NotifierStore) {
        self.paused.store(false, Ordering::Release);
        self.wakeup_all(store);
        debug!("Notifiers resumed");
    }

    /// Nudge every registered notifier without changing its state.
    ///
    /// The notifier lock is taken before signaling, so a waiter that read the
    /// paused flag but has not yet blocked cannot miss the nudge.
    pub fn wakeup_all(&self, store: &NotifierStore) {
        store.for_each(|_, notifier| {
            let _state = notifier.lock();
            notifier.notify();
        });
    }

    /// Wake any barrier currently blocked in [`sync_wakeups`](Self::sync_wakeups).
    ///
    /// Must not be called with a notifier lock held.
    pub fn notify_all(&self) {
        let _guard = self.lock();
        self.cond.notify_all();
    }

    /// Start a wait cycle on `notifier`.
    ///
    /// Takes the coordinator lock, then the notifier lock, advances the wake
    /// generation, releases the coordinator lock and signals the barrier.
    /// The notifier lock is returned still held.
    pub(crate) fn begin_wait<'a>(&self, notifier: &'a Notifier) -> MutexGuard<'a, NotifierState> {
        let coord = self.lock();
        let mut state = notifier.lock();
        state.wake_count += 1;
        drop(coord);
        self.cond.notify_all();
        state
    }

    /// Block until every alarm that is due now has observably woken.
    ///
    /// An alarm counts as due when it is armed and either was never waited on
    /// or its deadline has passed. It has woken once its wake generation moves,
    /// or once it is freed or stopped. Returns the number of alarms that were
    /// due when the scan started.
    ///
    /// An owner that fires and then neither waits again nor frees its
    /// notifier keeps this call polling.
    ///
    /// Each wait on the coordinator condition is bounded by the configured
    /// retry interval, after which the pending set is polled again.
    pub fn sync_wakeups(&self, store: &NotifierStore, clock: &dyn TimeSource) -> usize {
        let mut guard = self.lock();
        let now = clock.now_us();

        let mut pending: Vec<(Handle, u64)> = Vec::new();
        store.for_each(|handle, notifier| {
            let state = notifier.lock();
            if state.armed && (state.wake_count == 0 || now >= state.deadline) {
                pending.push((handle, state.wake_count));
                notifier.notify();
            }
        });
        let due = pending.len();

        loop {
            pending.retain(|&(handle, count)| {
                store.get(handle).is_some_and(|notifier| {
                    let state = notifier.lock();
                    state.alive && state.wake_count == count
                })
            });
            if pending.is_empty() {
                break;
            }

            let (next, result) = self
                .cond
                .wait_timeout(guard, self.sync_retry)
                .unwrap_or_else(PoisonError::into_inner);
            guard = next;
            if result.timed_out() {
                warn!(
                    pending = pending.len(),
                    retry_ms = self.sync_retry.as_millis(),
                    "Wakeup barrier still waiting on due notifiers"
                );
            }
        }

        drop(guard);
        due
    }
}
