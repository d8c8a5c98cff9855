//! Read-only views of the registered notifiers for simulators.

use crate::store::NotifierStore;
use hal_common::handles::Handle;
use hal_common::time::NO_DEADLINE;
use serde::Serialize;

/// Size of the simulator's fixed-width name field, including the terminator.
pub const NAME_CAPACITY: usize = 64;

/// Simulator view of one live notifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotifierInfo {
    /// Notifier handle.
    pub handle: Handle,
    /// Label, or `Notifier<index>` when unnamed.
    pub name: String,
    /// Trigger time in microseconds; stale unless `armed`.
    pub deadline: u64,
    /// Whether a deadline is pending.
    pub armed: bool,
}

/// Result of [`snapshot`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotifierSnapshot {
    /// Up to the requested capacity of entries, in enumeration order.
    pub entries: Vec<NotifierInfo>,
    /// Total number of live notifiers seen, which may exceed `entries.len()`.
    pub total: usize,
}

impl NotifierSnapshot {
    /// Returns true if live notifiers were left out for lack of capacity.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.total > self.entries.len()
    }
}

/// Earliest deadline among live, armed notifiers, or [`NO_DEADLINE`].
pub fn next_timeout(store: &NotifierStore) -> u64 {
    let mut timeout = NO_DEADLINE;
    store.for_each(|_, notifier| {
        let state = notifier.lock();
        if state.alive && state.armed {
            timeout = timeout.min(state.deadline);
        }
    });
    timeout
}

/// Number of live notifiers.
pub fn count(store: &NotifierStore) -> usize {
    let mut live = 0;
    store.for_each(|_, notifier| {
        if notifier.lock().alive {
            live += 1;
        }
    });
    live
}

/// Describe up to `capacity` live notifiers.
pub fn snapshot(store: &NotifierStore, capacity: usize) -> NotifierSnapshot {
    let mut snap = NotifierSnapshot::default();
    store.for_each(|handle, notifier| {
        let state = notifier.lock();
        if !state.alive {
            return;
        }
        if snap.entries.len() < capacity {
            snap.entries.push(NotifierInfo {
                handle,
                name: display_name(handle, &state.name),
                deadline: state.deadline,
                armed: state.armed,
            });
        }
        snap.total += 1;
    });
    snap
}

/// Name shown to the simulator: the label cut to fit [`NAME_CAPACITY`], or a
/// placeholder derived from the handle index.
fn display_name(handle: Handle, name: &str) -> String {
    if name.is_empty() {
        return format!("Notifier{}", handle.index());
    }
    let mut end = name.len().min(NAME_CAPACITY - 1);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    name[..end].to_owned()
}
