//! Alarm/timer notifiers for the robot HAL.
//!
//! A notifier is a single-shot alarm. Its owner arms it with an absolute
//! deadline in controller microseconds and blocks a thread in
//! [`NotifierHal::wait_for_alarm`] until the deadline passes. Re-arming,
//! cancelling, stopping, and freeing are all safe while a wait is in progress.
//!
//! - **Notifiers** ([`notifier`]): per-alarm state, lock, and condition variable
//! - **Store** ([`store`]): handle registry of notifiers, with teardown
//! - **Coordinator** ([`coordinator`]): pause/resume and the simulation barrier
//! - **Introspection** ([`introspect`]): read-only views for simulators
//! - **Simulation** ([`sim`]): stepping a simulated clock
//!
//! # Example
//!
//! ```
//! use hal_common::time::MonotonicClock;
//! use hal_notifier::NotifierHal;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let hal = Arc::new(NotifierHal::new(Arc::new(MonotonicClock::new())));
//! let handle = hal.create().unwrap();
//! hal.set_name(handle, "drive loop");
//!
//! let deadline = hal.now_us() + 5_000;
//! hal.update_alarm(handle, deadline);
//!
//! let waiter = {
//!     let hal = Arc::clone(&hal);
//!     thread::spawn(move || hal.wait_for_alarm(handle))
//! };
//! assert!(waiter.join().unwrap() >= deadline);
//!
//! hal.free(handle);
//! ```

pub mod coordinator;
pub mod hal;
pub mod introspect;
pub mod notifier;
pub mod sim;
pub mod store;

pub use coordinator::WakeCoordinator;
pub use hal::NotifierHal;
pub use introspect::{NotifierInfo, NotifierSnapshot, NAME_CAPACITY};
pub use notifier::{Notifier, NotifierState};
pub use sim::SimTiming;
pub use store::NotifierStore;
