//! Opaque handle encoding and the generic handle registry.
//!
//! A [`Handle`] is a positive `i32` laid out as:
//!
//! ```text
//!  31      24 23     16 15              0
//! ┌──────────┬─────────┬─────────────────┐
//! │ kind tag │ version │   slot index    │
//! └──────────┴─────────┴─────────────────┘
//! ```
//!
//! The version byte changes every time a slot is reused, so a handle kept
//! after `free` never resolves to a later allocation. A slot is only reused
//! once every reference to its previous occupant has been dropped.

use crate::error::{HalError, HalResult};
use serde::Serialize;
use static_assertions::const_assert;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

const INDEX_BITS: u32 = 16;
const VERSION_SHIFT: u32 = 16;
const KIND_SHIFT: u32 = 24;

/// Maximum number of slots a single registry can hold.
pub const MAX_HANDLE_SLOTS: usize = u16::MAX as usize;

const_assert!(VERSION_SHIFT >= INDEX_BITS);
const_assert!(KIND_SHIFT - VERSION_SHIFT == 8);
const_assert!(MAX_HANDLE_SLOTS < (1 << INDEX_BITS));
// Kind tags must keep the sign bit clear so every handle is positive.
const_assert!((HandleKind::Notifier as u8) < 0x80);

/// Resource category encoded in the top byte of a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HandleKind {
    /// Alarm/timer notifier.
    Notifier = 10,
}

impl HandleKind {
    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            10 => Some(Self::Notifier),
            _ => None,
        }
    }
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Notifier => write!(f, "notifier"),
        }
    }
}

/// Opaque identifier for a registered object, independent of its address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Handle(i32);

impl Handle {
    fn new(kind: HandleKind, version: u8, index: u16) -> Self {
        Self(
            (i32::from(kind as u8) << KIND_SHIFT)
                | (i32::from(version) << VERSION_SHIFT)
                | i32::from(index),
        )
    }

    /// Raw integer value.
    #[must_use]
    pub fn raw(self) -> i32 {
        self.0
    }

    /// Kind tag, if it names a known handle kind.
    #[must_use]
    pub fn kind(self) -> Option<HandleKind> {
        HandleKind::from_tag(((self.0 >> KIND_SHIFT) & 0xFF) as u8)
    }

    /// Slot version.
    #[must_use]
    pub fn version(self) -> u8 {
        ((self.0 >> VERSION_SHIFT) & 0xFF) as u8
    }

    /// Slot index within the owning registry.
    #[must_use]
    pub fn index(self) -> usize {
        (self.0 & 0xFFFF) as usize
    }
}

impl TryFrom<i32> for Handle {
    type Error = HalError;

    fn try_from(raw: i32) -> HalResult<Self> {
        let handle = Handle(raw);
        if raw <= 0 || handle.kind().is_none() {
            return Err(HalError::InvalidHandle(raw));
        }
        Ok(handle)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// One registry slot.
#[derive(Debug)]
struct Slot<T> {
    /// Live object, if allocated.
    entry: Option<Arc<T>>,
    /// Previous occupant, kept to hold the slot until its last reference drops.
    retired: Weak<T>,
    /// Bumped on every reuse.
    version: u8,
}

impl<T> Slot<T> {
    fn is_reusable(&self) -> bool {
        self.entry.is_none() && self.retired.strong_count() == 0
    }
}

/// Thread-safe table mapping handles to shared, reference-counted objects.
///
/// The internal lock is held only for lookup, insert, and remove. It is never
/// held while a [`for_each`](Self::for_each) visitor runs.
#[derive(Debug)]
pub struct HandleRegistry<T> {
    kind: HandleKind,
    capacity: usize,
    slots: Mutex<Vec<Slot<T>>>,
}

impl<T> HandleRegistry<T> {
    /// Create an empty registry for `kind` with room for `capacity` live
    /// objects (clamped to [`MAX_HANDLE_SLOTS`]).
    #[must_use]
    pub fn new(kind: HandleKind, capacity: usize) -> Self {
        Self {
            kind,
            capacity: capacity.min(MAX_HANDLE_SLOTS),
            slots: Mutex::new(Vec::new()),
        }
    }

    fn slots(&self) -> MutexGuard<'_, Vec<Slot<T>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Kind of handle this registry hands out.
    #[must_use]
    pub fn kind(&self) -> HandleKind {
        self.kind
    }

    /// Maximum number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Register `object` and return its new handle.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::HandleExhausted`] when every slot is occupied or
    /// still referenced by a previous occupant.
    pub fn allocate(&self, object: Arc<T>) -> HalResult<Handle> {
        let mut slots = self.slots();

        if let Some(index) = slots.iter().position(Slot::is_reusable) {
            let slot = &mut slots[index];
            slot.version = slot.version.wrapping_add(1);
            slot.entry = Some(object);
            slot.retired = Weak::new();
            return Ok(Handle::new(self.kind, slot.version, index as u16));
        }

        if slots.len() >= self.capacity {
            return Err(HalError::HandleExhausted {
                kind: self.kind,
                capacity: self.capacity,
            });
        }

        let index = slots.len();
        slots.push(Slot {
            entry: Some(object),
            retired: Weak::new(),
            version: 0,
        });
        Ok(Handle::new(self.kind, 0, index as u16))
    }

    /// Look up the object for `handle`.
    ///
    /// Returns `None` for handles of another kind, stale versions, or freed slots.
    pub fn get(&self, handle: Handle) -> Option<Arc<T>> {
        if handle.kind() != Some(self.kind) {
            return None;
        }
        let slots = self.slots();
        let slot = slots.get(handle.index())?;
        if slot.version != handle.version() {
            return None;
        }
        slot.entry.clone()
    }

    /// Remove `handle` from the table, returning its object so the caller can
    /// finish tearing it down.
    pub fn free(&self, handle: Handle) -> Option<Arc<T>> {
        if handle.kind() != Some(self.kind) {
            return None;
        }
        let mut slots = self.slots();
        let slot = slots.get_mut(handle.index())?;
        if slot.version != handle.version() {
            return None;
        }
        let object = slot.entry.take()?;
        slot.retired = Arc::downgrade(&object);
        Some(object)
    }

    /// Visit every live entry.
    ///
    /// Entries are collected under the lock, then `visitor` runs with the lock
    /// released. Each visited object is kept alive by a cloned reference for
    /// the duration of its callback, so concurrent frees are harmless.
    pub fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(Handle, &Arc<T>),
    {
        for (handle, object) in self.entries() {
            visitor(handle, &object);
        }
    }

    /// Snapshot of all live entries in slot order.
    pub fn entries(&self) -> Vec<(Handle, Arc<T>)> {
        let slots = self.slots();
        slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                slot.entry.as_ref().map(|object| {
                    (
                        Handle::new(self.kind, slot.version, index as u16),
                        Arc::clone(object),
                    )
                })
            })
            .collect()
    }

    /// Number of registered objects.
    pub fn len(&self) -> usize {
        self.slots().iter().filter(|s| s.entry.is_some()).count()
    }

    /// Returns true if no objects are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
