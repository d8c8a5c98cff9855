//! Public notifier API.
//!
//! Every operation that takes a [`Handle`] silently ignores unknown or freed
//! handles, since callers may race a free against a pending call. Only
//! [`NotifierHal::create`] can fail.

use crate::coordinator::WakeCoordinator;
use crate::introspect::{self, NotifierSnapshot};
use crate::store::NotifierStore;
use hal_common::config::NotifierConfig;
use hal_common::error::HalResult;
use hal_common::handles::Handle;
use hal_common::time::TimeSource;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Owner of all notifiers, the paused flag, and the wake coordinator.
///
/// One instance per process is expected; tests create their own.
pub struct NotifierHal {
    store: NotifierStore,
    coordinator: WakeCoordinator,
    clock: Arc<dyn TimeSource>,
    idle_wait: Duration,
}

impl std::fmt::Debug for NotifierHal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifierHal")
            .field("store", &self.store)
            .field("coordinator", &self.coordinator)
            .field("idle_wait", &self.idle_wait)
            .finish_non_exhaustive()
    }
}

impl NotifierHal {
    /// Create a HAL with default settings on `clock`.
    pub fn new(clock: Arc<dyn TimeSource>) -> Self {
        let config = NotifierConfig::default();
        Self {
            store: NotifierStore::new(config.max_handles),
            coordinator: WakeCoordinator::new(config.sync_retry),
            clock,
            idle_wait: config.idle_wait,
        }
    }

    /// Create a HAL from explicit settings.
    ///
    /// # Errors
    ///
    /// Returns `HalError::Config` if the settings fail validation.
    pub fn with_config(clock: Arc<dyn TimeSource>, config: &NotifierConfig) -> HalResult<Self> {
        config.validate()?;
        Ok(Self {
            store: NotifierStore::new(config.max_handles),
            coordinator: WakeCoordinator::new(config.sync_retry),
            clock,
            idle_wait: config.idle_wait,
        })
    }

    /// Current controller time in microseconds.
    pub fn now_us(&self) -> u64 {
        self.clock.now_us()
    }

    /// Register a new, unarmed notifier.
    ///
    /// # Errors
    ///
    /// Returns `HalError::HandleExhausted` when no handle is available.
    pub fn create(&self) -> HalResult<Handle> {
        self.store.create()
    }

    /// Set a notifier's label.
    pub fn set_name(&self, handle: Handle, name: &str) {
        if let Some(notifier) = self.store.get(handle) {
            notifier.set_name(name);
        }
    }

    /// Arm (or, with `NO_DEADLINE`, disarm) a notifier for `deadline_us`.
    pub fn update_alarm(&self, handle: Handle, deadline_us: u64) {
        if let Some(notifier) = self.store.get(handle) {
            trace!(%handle, deadline_us, "Notifier alarm updated");
            notifier.update_alarm(deadline_us);
        }
    }

    /// Disarm a notifier. A waiter already asleep notices on its next pass.
    pub fn cancel_alarm(&self, handle: Handle) {
        if let Some(notifier) = self.store.get(handle) {
            notifier.cancel_alarm();
        }
    }

    /// Deactivate a notifier, releasing its waiter with 0. The handle stays valid.
    pub fn stop(&self, handle: Handle) {
        if let Some(notifier) = self.store.get(handle) {
            notifier.deactivate();
            self.coordinator.notify_all();
            debug!(%handle, "Notifier stopped");
        }
    }

    /// Deactivate and unregister a notifier. Safe to call repeatedly.
    ///
    /// A wakeup barrier waiting on this notifier is released at once.
    pub fn free(&self, handle: Handle) {
        if let Some(notifier) = self.store.free(handle) {
            notifier.deactivate();
            self.coordinator.notify_all();
            debug!(%handle, "Notifier freed");
        }
    }

    /// Block the calling thread until the notifier's alarm fires.
    ///
    /// Returns the controller time at which the deadline was observed, or 0
    /// if the handle is unknown or the notifier was stopped, freed, or shut
    /// down. A 0 result must not be treated as a fire time.
    pub fn wait_for_alarm(&self, handle: Handle) -> u64 {
        // This reference keeps the notifier valid even if it is freed mid-wait.
        let Some(notifier) = self.store.get(handle) else {
            return 0;
        };
        let state = self.coordinator.begin_wait(&notifier);
        let fired = notifier.wait_locked(
            state,
            self.clock.as_ref(),
            self.coordinator.paused_flag(),
            self.idle_wait,
        );
        trace!(%handle, fired_us = fired, "Notifier wait returned");
        fired
    }

    /// Suspend real-time firing of every notifier without losing deadlines.
    pub fn pause(&self) {
        self.coordinator.pause(&self.store);
    }

    /// Resume real-time firing.
    pub fn resume(&self) {
        self.coordinator.resume(&self.store);
    }

    /// Returns true while paused.
    pub fn is_paused(&self) -> bool {
        self.coordinator.is_paused()
    }

    /// Wake every waiter so it re-evaluates its deadline.
    pub fn wakeup_all(&self) {
        self.coordinator.wakeup_all(&self.store);
    }

    /// Simulation barrier: block until every currently due alarm has woken.
    ///
    /// Returns the number of alarms that were due.
    pub fn sync_wakeups(&self) -> usize {
        self.coordinator
            .sync_wakeups(&self.store, self.clock.as_ref())
    }

    /// Earliest pending deadline, or `NO_DEADLINE` if nothing is armed.
    pub fn next_timeout(&self) -> u64 {
        introspect::next_timeout(&self.store)
    }

    /// Number of live notifiers, saturating at `i32::MAX`.
    pub fn count(&self) -> i32 {
        i32::try_from(introspect::count(&self.store)).unwrap_or(i32::MAX)
    }

    /// Describe up to `capacity` live notifiers.
    pub fn snapshot(&self, capacity: usize) -> NotifierSnapshot {
        introspect::snapshot(&self.store, capacity)
    }

    /// Teardown phase: deactivate every notifier, release all waiters, and
    /// release any barrier. Call before dropping the last reference; `Drop`
    /// repeats it as a backstop.
    pub fn shutdown(&self) {
        let released = self.store.deactivate_all();
        self.coordinator.notify_all();
        debug!(released, "Notifiers shut down");
    }
}

impl Drop for NotifierHal {
    fn drop(&mut self) {
        self.shutdown();
    }
}
