//! Alarm lifecycle acceptance tests.
//!
//! # Acceptance Criteria
//!
//! - A wait returns a time at or after the most recently set deadline
//! - A superseded deadline never fires
//! - Stop/free release waiters with 0 and are idempotent
//! - `next_timeout` tracks the earliest armed deadline

use super::common::{ms, realtime_hal, spawn_waiter};
use hal_common::time::NO_DEADLINE;
use std::thread;
use std::time::{Duration, Instant};

/// Arm for now+50ms and wait on another thread.
#[test]
fn test_alarm_fires_after_deadline() {
    let hal = realtime_hal();
    let a = hal.create().unwrap();
    let deadline = hal.now_us() + ms(50);
    hal.update_alarm(a, deadline);

    let start = Instant::now();
    let fired = spawn_waiter(&hal, a).join().unwrap();

    assert!(fired >= deadline, "fired at {fired}, deadline {deadline}");
    assert!(start.elapsed() >= Duration::from_millis(40));
    assert!(start.elapsed() < Duration::from_secs(2));
    hal.free(a);
}

/// Waiting on an already freed handle returns 0 at once.
#[test]
fn test_wait_after_free_returns_zero() {
    let hal = realtime_hal();
    let b = hal.create().unwrap();
    hal.free(b);

    let start = Instant::now();
    assert_eq!(hal.wait_for_alarm(b), 0);
    assert!(start.elapsed() < Duration::from_millis(100));
}

/// A wait already in progress returns 0 once free takes effect.
#[test]
fn test_free_during_wait_returns_zero() {
    let hal = realtime_hal();
    let b = hal.create().unwrap();
    hal.update_alarm(b, hal.now_us() + ms(10_000));

    let waiter = spawn_waiter(&hal, b);
    thread::sleep(Duration::from_millis(20));
    hal.free(b);

    assert_eq!(waiter.join().unwrap(), 0);
}

/// Stop then free, and free twice, are harmless.
#[test]
fn test_stop_and_free_are_idempotent() {
    let hal = realtime_hal();
    let h = hal.create().unwrap();

    let waiter = spawn_waiter(&hal, h);
    hal.stop(h);
    hal.stop(h);
    hal.free(h);
    hal.free(h);

    assert_eq!(waiter.join().unwrap(), 0);
    assert_eq!(hal.count(), 0);
    assert_eq!(hal.wait_for_alarm(h), 0);
}

/// Many re-arms and cancels during a wait: only the last deadline fires.
#[test]
fn test_interleaved_updates_never_fire_stale_deadline() {
    let hal = realtime_hal();
    let h = hal.create().unwrap();
    hal.update_alarm(h, hal.now_us() + ms(5_000));

    crossbeam_utils::thread::scope(|s| {
        let waiter = s.spawn(|_| hal.wait_for_alarm(h));

        for i in 0..200u64 {
            if i % 3 == 0 {
                hal.cancel_alarm(h);
            } else {
                hal.update_alarm(h, hal.now_us() + ms(5_000) + i);
            }
        }
        let last = hal.now_us() + ms(20);
        hal.update_alarm(h, last);

        let fired = waiter.join().unwrap();
        assert!(fired >= last, "fired at {fired}, last deadline {last}");
        assert!(fired < last + ms(2_000));
    })
    .unwrap();

    hal.free(h);
}

/// A fired alarm is disarmed until re-armed.
#[test]
fn test_fire_disarms() {
    let hal = realtime_hal();
    let h = hal.create().unwrap();
    hal.update_alarm(h, hal.now_us());

    assert_ne!(hal.wait_for_alarm(h), 0);
    assert_eq!(hal.next_timeout(), NO_DEADLINE);
    assert!(!hal.snapshot(1).entries[0].armed);

    // Nothing armed now, so a new wait blocks until stopped.
    let waiter = spawn_waiter(&hal, h);
    thread::sleep(Duration::from_millis(30));
    assert!(!waiter.is_finished());
    hal.stop(h);
    assert_eq!(waiter.join().unwrap(), 0);
    hal.free(h);
}

/// Disarming through `update_alarm(NO_DEADLINE)` wakes the waiter so it
/// stops sleeping toward the old deadline.
#[test]
fn test_update_to_no_deadline_disarms() {
    let hal = realtime_hal();
    let h = hal.create().unwrap();
    hal.update_alarm(h, hal.now_us() + ms(40));

    let waiter = spawn_waiter(&hal, h);
    hal.update_alarm(h, NO_DEADLINE);

    thread::sleep(Duration::from_millis(100));
    assert!(!waiter.is_finished());
    hal.free(h);
    assert_eq!(waiter.join().unwrap(), 0);
}

/// `next_timeout` is the minimum armed deadline.
#[test]
fn test_next_timeout_tracks_minimum() {
    let hal = realtime_hal();
    assert_eq!(hal.next_timeout(), NO_DEADLINE);

    let base = hal.now_us() + ms(60_000);
    let handles: Vec<_> = [30u64, 10, 20]
        .iter()
        .map(|&offset| {
            let h = hal.create().unwrap();
            hal.update_alarm(h, base + offset);
            h
        })
        .collect();
    assert_eq!(hal.next_timeout(), base + 10);

    hal.cancel_alarm(handles[1]);
    assert_eq!(hal.next_timeout(), base + 20);

    hal.free(handles[2]);
    assert_eq!(hal.next_timeout(), base + 30);

    hal.stop(handles[0]);
    assert_eq!(hal.next_timeout(), NO_DEADLINE);
    // Only the cancelled alarm is still live.
    assert_eq!(hal.count(), 1);
}
