//! Handle registry specialized to notifiers.

use crate::notifier::Notifier;
use hal_common::error::HalResult;
use hal_common::handles::{Handle, HandleKind, HandleRegistry};
use std::sync::Arc;
use tracing::{debug, warn};

/// All registered notifiers, keyed by handle.
#[derive(Debug)]
pub struct NotifierStore {
    handles: HandleRegistry<Notifier>,
}

impl NotifierStore {
    /// Create an empty store with room for `capacity` notifiers.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            handles: HandleRegistry::new(HandleKind::Notifier, capacity),
        }
    }

    /// Register a fresh live, unarmed notifier.
    ///
    /// # Errors
    ///
    /// Returns `HalError::HandleExhausted` when the registry is full.
    pub fn create(&self) -> HalResult<Handle> {
        match self.handles.allocate(Arc::new(Notifier::new())) {
            Ok(handle) => {
                debug!(%handle, "Notifier created");
                Ok(handle)
            }
            Err(e) => {
                warn!(capacity = self.handles.capacity(), "Notifier allocation failed");
                Err(e)
            }
        }
    }

    /// Look up a notifier.
    pub fn get(&self, handle: Handle) -> Option<Arc<Notifier>> {
        self.handles.get(handle)
    }

    /// Unregister a notifier and hand back the last registry reference.
    pub fn free(&self, handle: Handle) -> Option<Arc<Notifier>> {
        self.handles.free(handle)
    }

    /// Visit every registered notifier with the registry lock released.
    pub fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(Handle, &Notifier),
    {
        self.handles
            .for_each(|handle, notifier| visitor(handle, notifier.as_ref()));
    }

    /// Number of registered notifiers, live or stopped.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Teardown: deactivate and wake every registered notifier.
    ///
    /// Returns how many notifiers were visited. Entries stay registered so
    /// late callers still resolve their handles and see a dead notifier.
    pub fn deactivate_all(&self) -> usize {
        let mut visited = 0;
        self.for_each(|_, notifier| {
            notifier.deactivate();
            visited += 1;
        });
        visited
    }
}
