//! Simulation wakeup barrier acceptance tests.
//!
//! # Acceptance Criteria
//!
//! - After `sync_wakeups` returns, every alarm due at its start has fired
//!   or been removed
//! - Alarms that are not due do not hold the barrier
//! - Teardown releases a barrier blocked on an alarm with no waiter

use super::common::{ms, sim_hal};
use hal_common::time::TimeSource;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Periodic owners re-arm after each fire. Every owner due at T has fired
/// by the time the barrier returns.
#[test]
fn test_sync_wakeups_waits_for_due_alarms() {
    let (clock, hal) = sim_hal(0);
    hal.pause();

    let fires: Vec<Arc<AtomicU64>> = (0..6).map(|_| Arc::new(AtomicU64::new(0))).collect();
    let mut owners = Vec::new();
    for (i, counter) in fires.iter().enumerate() {
        let h = hal.create().unwrap();
        // Owners 0..3 are due at 10ms, 3..6 at 30ms.
        let deadline = if i < 3 { ms(10) } else { ms(30) };
        hal.update_alarm(h, deadline);

        let hal = Arc::clone(&hal);
        let counter = Arc::clone(counter);
        owners.push((
            h,
            thread::spawn(move || loop {
                let t = hal.wait_for_alarm(h);
                if t == 0 {
                    break;
                }
                counter.fetch_add(1, Ordering::SeqCst);
                hal.update_alarm(h, t + ms(100));
            }),
        ));
    }

    // Owners that have not begun their first wait count as due, so this
    // returns only once all of them are blocked.
    assert!(hal.sync_wakeups() <= 6);
    assert!(fires.iter().all(|c| c.load(Ordering::SeqCst) == 0));

    clock.set(ms(10));
    assert_eq!(hal.sync_wakeups(), 3);
    for (i, counter) in fires.iter().enumerate() {
        let expected = u64::from(i < 3);
        assert_eq!(counter.load(Ordering::SeqCst), expected, "owner {i}");
    }

    clock.set(ms(30));
    assert_eq!(hal.sync_wakeups(), 3);
    assert!(fires.iter().all(|c| c.load(Ordering::SeqCst) == 1));
    assert_eq!(hal.next_timeout(), ms(110));

    for (h, thread) in owners {
        hal.free(h);
        thread.join().unwrap();
    }
}

/// Nothing due: the barrier does not block.
#[test]
fn test_sync_wakeups_without_due_alarms() {
    let (clock, hal) = sim_hal(ms(1));
    let h = hal.create().unwrap();
    hal.update_alarm(h, clock.now_us() + ms(50));

    let waiter = {
        let hal = Arc::clone(&hal);
        thread::spawn(move || hal.wait_for_alarm(h))
    };
    // Returns once the owner has started its wait cycle.
    hal.sync_wakeups();

    let start = Instant::now();
    assert_eq!(hal.sync_wakeups(), 0);
    assert!(start.elapsed() < Duration::from_millis(500));

    hal.free(h);
    assert_eq!(waiter.join().unwrap(), 0);
}

/// A one-shot owner that frees its alarm after firing releases the barrier.
#[test]
fn test_freed_alarm_releases_barrier() {
    let (clock, hal) = sim_hal(0);
    hal.pause();
    let h = hal.create().unwrap();
    hal.update_alarm(h, ms(5));

    let owner = {
        let hal = Arc::clone(&hal);
        thread::spawn(move || {
            let t = hal.wait_for_alarm(h);
            hal.free(h);
            t
        })
    };
    hal.sync_wakeups();

    clock.set(ms(5));
    assert_eq!(hal.sync_wakeups(), 1);
    assert_eq!(owner.join().unwrap(), ms(5));
    assert_eq!(hal.count(), 0);
}

/// An armed alarm whose owner never waits keeps the barrier polling until
/// shutdown deactivates it.
#[test]
fn test_shutdown_releases_blocked_barrier() {
    let (_clock, hal) = sim_hal(0);
    let h = hal.create().unwrap();
    hal.update_alarm(h, ms(1));

    let barrier = {
        let hal = Arc::clone(&hal);
        thread::spawn(move || hal.sync_wakeups())
    };
    thread::sleep(Duration::from_millis(50));
    assert!(!barrier.is_finished());

    let start = Instant::now();
    hal.shutdown();
    assert_eq!(barrier.join().unwrap(), 1);
    assert!(start.elapsed() < Duration::from_millis(500));
}
