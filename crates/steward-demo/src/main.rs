//! Demonstration daemon for the `steward` lifecycle controller.
//!
//! Parses its flags, installs telemetry, and runs a small host that logs its
//! lifecycle callbacks and the config file it watches. The run's outcome
//! becomes the process exit status.

mod cli;
mod host;

use std::io::{self, Write};
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use clap::Parser;
use steward::{
    ConfigError, Controller, JsonTarget, LifecycleConfig, Phase, RunError, TelemetryError,
    TracingSink, telemetry,
};
use thiserror::Error;
use tracing::{error, info};

use crate::cli::Cli;
use crate::host::{DemoDaemon, DemoSettings};

const DEMO_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::main");
const SCHEDULE_POLL: Duration = Duration::from_millis(5);

#[derive(Debug, Error)]
enum DemoError {
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("invalid lifecycle configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Run(#[from] RunError),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => code,
        Err(error) => {
            writeln!(io::stderr().lock(), "stewardd: {error}").ok();
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode, DemoError> {
    telemetry::initialise(&cli.telemetry())?;

    let settings = JsonTarget::<DemoSettings>::default();
    let mut builder = LifecycleConfig::builder()
        .sink(TracingSink::new())
        .check_interval(Duration::from_millis(cli.check_interval_ms))
        .start_timeout(Duration::from_millis(cli.start_timeout_ms))
        .drain_timeout(Duration::from_millis(cli.drain_timeout_ms))
        .stop_timeout(Duration::from_millis(cli.stop_timeout_ms))
        .drain_enabled(cli.enable_drain)
        .stop_timeout_policy(cli.stop_timeout_policy())
        .no_exit(true);
    if let Some(path) = &cli.config_file {
        builder = builder.config_file(path).target(settings.clone());
    }
    let controller = Controller::new(DemoDaemon::new(settings), builder.build()?);

    if let Some(after) = cli.run_for() {
        schedule_stop(&controller, after);
    }

    let outcome = controller.run()?;
    if outcome.is_success() {
        info!(target: DEMO_TARGET, %outcome, "stewardd exiting");
    } else {
        error!(target: DEMO_TARGET, %outcome, "stewardd exiting");
    }
    Ok(ExitCode::from(outcome.exit_code()))
}

/// Stops the controller once it has been running for `after`.
fn schedule_stop(controller: &Controller, after: Duration) {
    let stopper = controller.clone();
    let spawned = thread::Builder::new()
        .name("stewardd-run-for".to_owned())
        .spawn(move || {
            loop {
                match stopper.phase() {
                    Phase::Running => break,
                    Phase::Stopped => return,
                    _ => thread::sleep(SCHEDULE_POLL),
                }
            }
            thread::sleep(after);
            stopper.stop();
        });
    if let Err(source) = spawned {
        error!(target: DEMO_TARGET, %source, "failed to schedule stop");
    }
}
