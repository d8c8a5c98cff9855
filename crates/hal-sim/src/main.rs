//! HAL simulator entry point.
//!
//! Spawns periodic runners on notifiers, takes over timing with a stepped
//! simulation clock, and prints a JSON summary of what fired.

mod runner;

use anyhow::{Context, Result};
use clap::Parser;
use hal_common::config::HalConfig;
use hal_common::time::SimClock;
use hal_notifier::{NotifierHal, NotifierSnapshot, SimTiming};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::runner::{PeriodicRunner, RunnerReport};

/// Simulator command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "hal-sim",
    about = "Robot HAL simulator - periodic notifiers on a stepped clock",
    version,
    long_about = None
)]
struct Args {
    /// Path to a HAL configuration file (TOML).
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of periodic runners (overrides config file).
    #[arg(long, short = 'r')]
    runners: Option<usize>,

    /// Number of simulation steps (overrides config file).
    #[arg(long, short = 'n')]
    steps: Option<u64>,

    /// Simulated time per step, e.g. "20ms" (overrides config file).
    #[arg(long, value_parser = humantime::parse_duration)]
    step: Option<Duration>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,
}

/// Final report printed on stdout.
#[derive(Debug, Serialize)]
struct SimSummary {
    /// Simulated time when stepping ended.
    end_time_us: u64,
    /// Live notifiers just before the runners were stopped.
    notifiers: NotifierSnapshot,
    /// Per-runner results.
    runners: Vec<RunnerReport>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting HAL simulator");

    let mut config = load_config(&args)?;

    if let Some(runners) = args.runners {
        config.sim.runners = runners;
    }
    if let Some(steps) = args.steps {
        config.sim.steps = steps;
    }
    if let Some(step) = args.step {
        config.sim.step = step;
    }

    info!(?config.sim, "Configuration loaded");

    let summary = run_simulation(&config)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?
    );
    Ok(())
}

/// Initialize logging with the specified log level.
fn init_logging(level: &str) {
    let filter = format!(
        "hal_sim={},hal_notifier={},hal_common={}",
        level, level, level
    );

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&filter)),
        )
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Load configuration from file or use defaults.
///
/// Resolution priority (first existing file wins):
/// 1. Command-line `--config` argument
/// 2. `HAL_CONFIG_PATH` environment variable
/// 3. `config/hal.toml` (local development)
/// 4. Built-in defaults
fn load_config(args: &Args) -> Result<HalConfig> {
    if let Some(config_path) = &args.config {
        info!(?config_path, "Loading config from command-line argument");
        return HalConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path));
    }

    if let Ok(env_path) = std::env::var("HAL_CONFIG_PATH") {
        let config_path = PathBuf::from(&env_path);
        if config_path.exists() {
            info!(?config_path, "Loading config from HAL_CONFIG_PATH");
            return HalConfig::from_file(&config_path).with_context(|| {
                format!("Failed to load config from HAL_CONFIG_PATH={:?}", env_path)
            });
        }
        warn!(
            path = %env_path,
            "HAL_CONFIG_PATH set but file does not exist, checking other locations"
        );
    }

    let local_path = PathBuf::from("config/hal.toml");
    if local_path.exists() {
        info!(?local_path, "Loading config from local path");
        return HalConfig::from_file(&local_path)
            .with_context(|| format!("Failed to load config from {:?}", local_path));
    }

    info!("No config file found, using built-in defaults");
    Ok(HalConfig::default())
}

/// Run the configured runners for the configured number of steps.
fn run_simulation(config: &HalConfig) -> Result<SimSummary> {
    let clock = Arc::new(SimClock::new(0));
    let hal = Arc::new(
        NotifierHal::with_config(clock.clone(), &config.notifier)
            .context("Invalid notifier configuration")?,
    );
    let timing = SimTiming::new(Arc::clone(&hal), Arc::clone(&clock));

    let runners = (0..config.sim.runners)
        .map(|i| {
            let multiple = u32::try_from(i + 1).unwrap_or(u32::MAX);
            PeriodicRunner::spawn(&hal, &format!("runner-{i}"), config.sim.period * multiple)
        })
        .collect::<Result<Vec<_>>>()?;

    for step in 0..config.sim.steps {
        let now = timing.step_timing(config.sim.step);
        debug!(
            step,
            now_us = now,
            next_timeout_us = hal.next_timeout(),
            "Step complete"
        );
    }

    let end_time_us = timing.now_us();
    let notifiers = hal.snapshot(runners.len());
    info!(end_time_us, live = hal.count(), "Stepping finished");

    let runners = runners
        .into_iter()
        .map(|r| {
            debug!(handle = %r.handle(), "Stopping runner");
            r.stop(&hal)
        })
        .collect::<Result<Vec<_>>>()?;

    drop(timing);
    hal.shutdown();

    Ok(SimSummary {
        end_time_us,
        notifiers,
        runners,
    })
}
