//! Command-line flags for the demonstration daemon.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use steward::telemetry::DEFAULT_LOG_FILTER;
use steward::{LogFormat, StopTimeoutPolicy, TelemetryConfig};

/// Runs a demonstration host under the lifecycle controller until it is
/// interrupted, terminated, or the optional run time elapses.
#[derive(Parser, Debug)]
#[command(name = "stewardd", version)]
pub(crate) struct Cli {
    /// JSON config file watched for changes.
    #[arg(long, value_name = "PATH")]
    pub(crate) config_file: Option<PathBuf>,
    /// Milliseconds between config file checks.
    #[arg(long, value_name = "MS", default_value_t = 5_000)]
    pub(crate) check_interval_ms: u64,
    /// Milliseconds the host may spend starting.
    #[arg(long, value_name = "MS", default_value_t = 5_000)]
    pub(crate) start_timeout_ms: u64,
    /// Milliseconds the host may spend draining.
    #[arg(long, value_name = "MS", default_value_t = 5_000)]
    pub(crate) drain_timeout_ms: u64,
    /// Milliseconds the host may spend stopping.
    #[arg(long, value_name = "MS", default_value_t = 500)]
    pub(crate) stop_timeout_ms: u64,
    /// Drains in-flight work before stopping.
    #[arg(long)]
    pub(crate) enable_drain: bool,
    /// Exits with a failure status when stop overruns its timeout.
    #[arg(long)]
    pub(crate) fatal_stop_timeout: bool,
    /// Tracing filter expression.
    #[arg(long, value_name = "FILTER", default_value = DEFAULT_LOG_FILTER)]
    pub(crate) log_filter: String,
    /// Log output format.
    #[arg(long, value_name = "FORMAT", default_value_t = LogFormat::Json)]
    pub(crate) log_format: LogFormat,
    /// Stops the daemon after this many milliseconds of running.
    #[arg(long, value_name = "MS")]
    pub(crate) run_for_ms: Option<u64>,
}

impl Cli {
    pub(crate) fn telemetry(&self) -> TelemetryConfig {
        TelemetryConfig::new(self.log_filter.as_str(), self.log_format)
    }

    pub(crate) const fn stop_timeout_policy(&self) -> StopTimeoutPolicy {
        if self.fatal_stop_timeout {
            StopTimeoutPolicy::Fatal
        } else {
            StopTimeoutPolicy::Continue
        }
    }

    pub(crate) fn run_for(&self) -> Option<Duration> {
        self.run_for_ms.map(Duration::from_millis)
    }
}
