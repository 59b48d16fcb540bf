//! Controller configuration and its builder.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::controller::RunOutcome;
use crate::error::ConfigError;
use crate::signals::{SignalSource, SystemSignals};
use crate::sink::{LogSink, TracingSink};
use crate::target::ConfigTarget;

/// Default interval between config file polls.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(5);
/// Default bound on the start callback.
pub const DEFAULT_START_TIMEOUT: Duration = Duration::from_secs(5);
/// Default bound on the drain callback.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);
/// Default bound on the stop callback.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_millis(500);

/// What an overrunning stop callback does to the cycle's outcome.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StopTimeoutPolicy {
    /// Log the timeout and report a clean stop.
    #[default]
    Continue,
    /// Log the timeout and report [`RunOutcome::StopFailed`].
    Fatal,
}

impl StopTimeoutPolicy {
    /// Outcome reported when the stop callback did not return in time.
    #[must_use]
    pub const fn outcome(self) -> RunOutcome {
        match self {
            Self::Continue => RunOutcome::Stopped,
            Self::Fatal => RunOutcome::StopFailed,
        }
    }
}

/// Immutable settings for a [`crate::Controller`].
#[derive(Clone)]
pub struct LifecycleConfig {
    check_interval: Duration,
    start_timeout: Duration,
    drain_timeout: Duration,
    stop_timeout: Duration,
    config_file: Option<PathBuf>,
    target: Option<Arc<dyn ConfigTarget>>,
    drain_enabled: bool,
    no_exit: bool,
    stop_timeout_policy: StopTimeoutPolicy,
    sink: Arc<dyn LogSink>,
    signals: Option<Arc<dyn SignalSource>>,
}

impl LifecycleConfig {
    /// Default configuration: tracing-backed logging, OS signal handling, no
    /// config file, drain disabled.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            check_interval: DEFAULT_CHECK_INTERVAL,
            start_timeout: DEFAULT_START_TIMEOUT,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            config_file: None,
            target: None,
            drain_enabled: false,
            no_exit: false,
            stop_timeout_policy: StopTimeoutPolicy::default(),
            sink: Arc::new(TracingSink::new()),
            signals: Some(Arc::new(SystemSignals::new())),
        }
    }

    /// Starts a builder with default timings and no log sink.
    #[must_use]
    pub fn builder() -> LifecycleConfigBuilder {
        LifecycleConfigBuilder::default()
    }

    /// Interval between config file polls.
    #[must_use]
    pub const fn check_interval(&self) -> Duration {
        self.check_interval
    }

    /// Bound on the start callback.
    #[must_use]
    pub const fn start_timeout(&self) -> Duration {
        self.start_timeout
    }

    /// Bound on the drain callback.
    #[must_use]
    pub const fn drain_timeout(&self) -> Duration {
        self.drain_timeout
    }

    /// Bound on the stop callback.
    #[must_use]
    pub const fn stop_timeout(&self) -> Duration {
        self.stop_timeout
    }

    /// Watched config file, if any.
    #[must_use]
    pub fn config_file(&self) -> Option<&Path> {
        self.config_file.as_deref()
    }

    /// Destination for reloaded config contents.
    #[must_use]
    pub fn target(&self) -> Option<&Arc<dyn ConfigTarget>> {
        self.target.as_ref()
    }

    /// Initial drain flag of every cycle.
    #[must_use]
    pub const fn drain_enabled(&self) -> bool {
        self.drain_enabled
    }

    /// Whether [`crate::Controller::run_and_exit`] returns instead of exiting.
    #[must_use]
    pub const fn no_exit(&self) -> bool {
        self.no_exit
    }

    /// Policy applied when stop overruns its timeout.
    #[must_use]
    pub const fn stop_timeout_policy(&self) -> StopTimeoutPolicy {
        self.stop_timeout_policy
    }

    /// Destination for controller diagnostics.
    #[must_use]
    pub fn sink(&self) -> &Arc<dyn LogSink> {
        &self.sink
    }

    /// Source of process notifications; `None` disables signal handling.
    #[must_use]
    pub fn signals(&self) -> Option<&Arc<dyn SignalSource>> {
        self.signals.as_ref()
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

impl fmt::Debug for LifecycleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleConfig")
            .field("check_interval", &self.check_interval)
            .field("start_timeout", &self.start_timeout)
            .field("drain_timeout", &self.drain_timeout)
            .field("stop_timeout", &self.stop_timeout)
            .field("config_file", &self.config_file)
            .field("has_target", &self.target.is_some())
            .field("drain_enabled", &self.drain_enabled)
            .field("no_exit", &self.no_exit)
            .field("stop_timeout_policy", &self.stop_timeout_policy)
            .field("signals", &self.signals.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`LifecycleConfig`].
///
/// Unlike [`LifecycleConfig::defaults`], the builder has no log sink until one
/// is supplied, and [`LifecycleConfigBuilder::build`] rejects the result
/// without one.
pub struct LifecycleConfigBuilder {
    check_interval: Duration,
    start_timeout: Duration,
    drain_timeout: Duration,
    stop_timeout: Duration,
    config_file: Option<PathBuf>,
    target: Option<Arc<dyn ConfigTarget>>,
    drain_enabled: bool,
    no_exit: bool,
    stop_timeout_policy: StopTimeoutPolicy,
    sink: Option<Arc<dyn LogSink>>,
    signals: Option<Arc<dyn SignalSource>>,
}

impl Default for LifecycleConfigBuilder {
    fn default() -> Self {
        Self {
            check_interval: DEFAULT_CHECK_INTERVAL,
            start_timeout: DEFAULT_START_TIMEOUT,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            config_file: None,
            target: None,
            drain_enabled: false,
            no_exit: false,
            stop_timeout_policy: StopTimeoutPolicy::default(),
            sink: None,
            signals: Some(Arc::new(SystemSignals::new())),
        }
    }
}

impl LifecycleConfigBuilder {
    /// Sets the polling interval.
    #[must_use]
    pub const fn check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    /// Sets the start timeout.
    #[must_use]
    pub const fn start_timeout(mut self, timeout: Duration) -> Self {
        self.start_timeout = timeout;
        self
    }

    /// Sets the drain timeout.
    #[must_use]
    pub const fn drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Sets the stop timeout.
    #[must_use]
    pub const fn stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Watches `path`. An empty path leaves the watcher disabled.
    #[must_use]
    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        let file: PathBuf = path.into();
        self.config_file = (!file.as_os_str().is_empty()).then_some(file);
        self
    }

    /// Sets where reloaded contents are decoded.
    #[must_use]
    pub fn target(mut self, target: impl ConfigTarget + 'static) -> Self {
        self.target = Some(Arc::new(target));
        self
    }

    /// Sets the initial drain flag of every cycle.
    #[must_use]
    pub const fn drain_enabled(mut self, enabled: bool) -> Self {
        self.drain_enabled = enabled;
        self
    }

    /// Makes [`crate::Controller::run_and_exit`] return instead of exiting.
    #[must_use]
    pub const fn no_exit(mut self, no_exit: bool) -> Self {
        self.no_exit = no_exit;
        self
    }

    /// Sets the stop timeout policy.
    #[must_use]
    pub const fn stop_timeout_policy(mut self, policy: StopTimeoutPolicy) -> Self {
        self.stop_timeout_policy = policy;
        self
    }

    /// Sets the log sink.
    #[must_use]
    pub fn sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Replaces the signal source.
    #[must_use]
    pub fn signals(mut self, source: impl SignalSource + 'static) -> Self {
        self.signals = Some(Arc::new(source));
        self
    }

    /// Turns signal handling off.
    #[must_use]
    pub fn disable_signals(mut self) -> Self {
        self.signals = None;
        self
    }

    /// Validates and freezes the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingLogSink`] without a sink,
    /// [`ConfigError::MissingTarget`] when a config file has no target and
    /// [`ConfigError::ZeroCheckInterval`] for a zero polling interval.
    pub fn build(self) -> Result<LifecycleConfig, ConfigError> {
        let sink = self.sink.ok_or(ConfigError::MissingLogSink)?;
        if let Some(path) = &self.config_file
            && self.target.is_none()
        {
            return Err(ConfigError::MissingTarget { path: path.clone() });
        }
        if self.check_interval.is_zero() {
            return Err(ConfigError::ZeroCheckInterval);
        }
        Ok(LifecycleConfig {
            check_interval: self.check_interval,
            start_timeout: self.start_timeout,
            drain_timeout: self.drain_timeout,
            stop_timeout: self.stop_timeout,
            config_file: self.config_file,
            target: self.target,
            drain_enabled: self.drain_enabled,
            no_exit: self.no_exit,
            stop_timeout_policy: self.stop_timeout_policy,
            sink,
            signals: self.signals,
        })
    }
}

impl fmt::Debug for LifecycleConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleConfigBuilder")
            .field("check_interval", &self.check_interval)
            .field("config_file", &self.config_file)
            .field("has_sink", &self.sink.is_some())
            .finish_non_exhaustive()
    }
}
