//! Periodic task runners built on single-shot notifiers.
//!
//! Each runner owns one notifier and one thread. The thread waits for the
//! alarm, records the fire, and re-arms for the next period, until the
//! notifier is stopped.

use anyhow::{anyhow, Context, Result};
use hal_common::handles::Handle;
use hal_notifier::NotifierHal;
use serde::Serialize;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info};

/// Per-runner results, reported once the runner is stopped.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunnerReport {
    /// Runner name (also the notifier name).
    pub name: String,
    /// Period in microseconds.
    pub period_us: u64,
    /// Number of times the alarm fired.
    pub fires: u64,
    /// Controller time of the last fire.
    pub last_fire_us: u64,
    /// Worst observed delay between deadline and fire.
    pub max_lateness_us: u64,
}

/// A thread that fires every `period` until stopped.
#[derive(Debug)]
pub struct PeriodicRunner {
    name: String,
    handle: Handle,
    thread: Option<JoinHandle<RunnerReport>>,
}

impl PeriodicRunner {
    /// Create a notifier, arm it one period from now, and start the runner thread.
    pub fn spawn(hal: &Arc<NotifierHal>, name: &str, period: Duration) -> Result<Self> {
        let handle = hal
            .create()
            .with_context(|| format!("Failed to create notifier for {name}"))?;
        hal.set_name(handle, name);

        let period_us = u64::try_from(period.as_micros()).unwrap_or(u64::MAX);
        let first = hal.now_us().saturating_add(period_us);
        hal.update_alarm(handle, first);

        let thread_hal = Arc::clone(hal);
        let mut report = RunnerReport {
            name: name.to_owned(),
            period_us,
            ..RunnerReport::default()
        };

        let thread = thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || {
                let mut expected = first;
                loop {
                    let fired = thread_hal.wait_for_alarm(handle);
                    if fired == 0 {
                        break;
                    }
                    report.fires += 1;
                    report.last_fire_us = fired;
                    report.max_lateness_us =
                        report.max_lateness_us.max(fired.saturating_sub(expected));

                    expected = expected.saturating_add(period_us);
                    thread_hal.update_alarm(handle, expected);
                }
                debug!(runner = %report.name, fires = report.fires, "Runner exiting");
                report
            })
            .with_context(|| format!("Failed to spawn runner thread {name}"))?;

        info!(runner = name, %handle, period_us, "Runner started");
        Ok(Self {
            name: name.to_owned(),
            handle,
            thread: Some(thread),
        })
    }

    /// Notifier handle owned by this runner.
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Stop the notifier, join the thread, and free the handle.
    pub fn stop(mut self, hal: &NotifierHal) -> Result<RunnerReport> {
        hal.stop(self.handle);
        let report = match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|_| anyhow!("Runner thread {} panicked", self.name))?,
            None => RunnerReport::default(),
        };
        hal.free(self.handle);
        Ok(report)
    }
}
