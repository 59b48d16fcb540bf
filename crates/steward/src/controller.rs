//! The lifecycle controller: drives a host through start, drain and stop.

use std::fmt;
use std::io;
use std::process;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};

use strum::Display;

use crate::bounded::{self, Completion};
use crate::callbacks::Lifecycle;
use crate::config::LifecycleConfig;
use crate::error::RunError;
use crate::phase::{Phase, PhaseGuard, RunCycle, StartTransition, StopTicket};
use crate::signals::{SignalBridge, SignalStream};
use crate::sink::LogSink;
use crate::watcher::ConfigWatcher;

/// How a run cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum RunOutcome {
    /// The stop sequence ran to completion (or its timeout was tolerated).
    Stopped,
    /// Start timed out or panicked. No drain or stop was attempted.
    StartFailed,
    /// Stop panicked, or timed out under [`crate::StopTimeoutPolicy::Fatal`].
    StopFailed,
}

impl RunOutcome {
    /// Process exit status conventionally associated with the outcome.
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Stopped => 0,
            Self::StartFailed | Self::StopFailed => 1,
        }
    }

    /// Whether the cycle ended cleanly.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Stopped)
    }
}

struct Shared {
    host: Arc<dyn Lifecycle>,
    config: LifecycleConfig,
    guard: Arc<PhaseGuard>,
}

impl Shared {
    fn sink(&self) -> &Arc<dyn LogSink> {
        self.config.sink()
    }

    /// Asks the live cycle to stop. Runs the stop sequence inline when this
    /// caller wins the race; otherwise returns without waiting.
    fn request_stop(&self) -> Option<Arc<RunCycle>> {
        match self.guard.begin_stop() {
            StopTicket::Run { drain, cycle } => {
                self.stop_sequence(drain);
                Some(cycle)
            }
            StopTicket::Deferred(cycle) => {
                self.sink().debug(format_args!(
                    "stop requested while starting; deferring until start returns"
                ));
                Some(cycle)
            }
            StopTicket::InProgress(cycle) => {
                self.sink().trace(format_args!("stop already in progress"));
                Some(cycle)
            }
            StopTicket::Idle => None,
        }
    }

    fn stop_sequence(&self, drain: bool) -> RunOutcome {
        let sink = self.sink();
        if drain {
            sink.debug(format_args!("draining"));
            let host = Arc::clone(&self.host);
            let timeout = self.config.drain_timeout();
            match bounded::execute("drain", timeout, move || host.drain()) {
                Completion::Completed => sink.debug(format_args!("drain complete")),
                Completion::TimedOut => {
                    sink.error(format_args!("timed out after {timeout:?} waiting for drain"));
                }
                Completion::Failed => sink.error(format_args!("drain callback failed")),
            }
            self.guard.enter_stopping();
        }

        sink.debug(format_args!("stopping"));
        let host = Arc::clone(&self.host);
        let timeout = self.config.stop_timeout();
        let outcome = match bounded::execute("stop", timeout, move || host.stop()) {
            Completion::Completed => RunOutcome::Stopped,
            Completion::TimedOut => {
                sink.error(format_args!("timed out after {timeout:?} waiting for stop"));
                self.config.stop_timeout_policy().outcome()
            }
            Completion::Failed => {
                sink.error(format_args!("stop callback failed"));
                RunOutcome::StopFailed
            }
        };
        let reported = self.guard.finish(outcome);
        sink.debug(format_args!("stopped with outcome {reported}"));
        reported
    }
}

/// Drives a [`Lifecycle`] host through run cycles.
///
/// Clones share the same host and run state, so a clone handed to another
/// thread can observe or stop the cycle a `run` call is blocked on.
#[derive(Clone)]
pub struct Controller {
    shared: Arc<Shared>,
}

impl Controller {
    /// Builds a controller for `host`.
    pub fn new(host: impl Lifecycle, config: LifecycleConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                host: Arc::new(host),
                config,
                guard: Arc::new(PhaseGuard::new()),
            }),
        }
    }

    /// Builds a controller with [`LifecycleConfig::defaults`].
    pub fn new_default(host: impl Lifecycle) -> Self {
        Self::new(host, LifecycleConfig::defaults())
    }

    /// Configuration the controller was built with.
    #[must_use]
    pub fn config(&self) -> &LifecycleConfig {
        &self.shared.config
    }

    /// Whether a cycle is starting or running and no stop has begun.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.guard.is_running()
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.shared.guard.phase()
    }

    /// Drain flag of the live cycle.
    #[must_use]
    pub fn drain_enabled(&self) -> bool {
        self.shared.guard.drain_enabled()
    }

    /// Turns drain on or off for the live cycle only. Returns `false` when
    /// there is no running cycle or its stop sequence already began.
    pub fn set_drain_enabled(&self, enabled: bool) -> bool {
        let changed = self.shared.guard.set_drain_enabled(enabled);
        if changed {
            self.shared
                .sink()
                .debug(format_args!("drain {}", if enabled { "enabled" } else { "disabled" }));
        }
        changed
    }

    /// Runs one cycle and blocks until it ends.
    ///
    /// The cycle loads the config file (when one is set) and starts the host,
    /// both under the start timeout. It then waits for a termination signal or
    /// a call to [`Controller::stop`] and runs drain (when enabled) and stop,
    /// each under its own timeout.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::AlreadyRunning`] when a cycle is already live and
    /// [`RunError::Signals`] when signal handlers cannot be installed.
    pub fn run(&self) -> Result<RunOutcome, RunError> {
        let shared = &self.shared;
        let sink = shared.sink();

        let stream = match shared.config.signals() {
            Some(source) => Some(source.subscribe()?),
            None => None,
        };
        let Some(cycle) = shared.guard.begin_cycle(shared.config.drain_enabled()) else {
            sink.error(format_args!("run called while already running"));
            return Err(RunError::AlreadyRunning);
        };
        sink.debug(format_args!("run cycle {} starting", cycle.id()));

        let bridge = stream.and_then(|signals| self.start_bridge(signals));
        let loaded = self.start_watcher(&cycle);

        // The initial config load counts against the start deadline.
        let host = Arc::clone(&shared.host);
        let pending = Arc::clone(&cycle);
        let timeout = shared.config.start_timeout();
        let started = bounded::execute("start", timeout, move || {
            if let Some(receiver) = loaded {
                receiver.recv().ok();
            }
            // A load that outlived the deadline already failed this cycle.
            if pending.outcome().is_none() {
                host.start();
            }
        });
        if !started.is_completed() {
            if started == Completion::TimedOut {
                sink.error(format_args!("timed out after {timeout:?} waiting for start"));
            } else {
                sink.error(format_args!("start callback failed"));
            }
            let outcome = shared.guard.finish(RunOutcome::StartFailed);
            sink.debug(format_args!("stopped with outcome {outcome}"));
            close_bridge(bridge);
            return Ok(outcome);
        }

        match shared.guard.mark_started() {
            StartTransition::Running => {
                sink.debug(format_args!("started, pid {}", process::id()));
            }
            StartTransition::Stop { drain } => {
                sink.debug(format_args!("started; running deferred stop"));
                shared.stop_sequence(drain);
            }
        }

        let outcome = cycle.wait();
        sink.trace(format_args!("run cycle {} ended: {outcome}", cycle.id()));
        close_bridge(bridge);
        Ok(outcome)
    }

    /// Runs one cycle and exits the process with the outcome's exit code,
    /// unless the configuration sets `no_exit`.
    ///
    /// # Errors
    ///
    /// Only returns when `no_exit` is set, with the same errors as
    /// [`Controller::run`].
    pub fn run_and_exit(&self) -> Result<RunOutcome, RunError> {
        let result = self.run();
        if self.shared.config.no_exit() {
            return result;
        }
        let code = result.map_or(1, RunOutcome::exit_code);
        process::exit(i32::from(code));
    }

    /// Requests a stop and blocks until the live cycle has ended.
    ///
    /// Returns `None` when no cycle is live. Concurrent calls, and calls
    /// racing a termination signal, run the stop sequence once between them.
    pub fn stop(&self) -> Option<RunOutcome> {
        self.shared.request_stop().map(|cycle| cycle.wait())
    }

    /// Blocks until the live cycle, if any, has ended.
    pub fn wait_for_stop(&self) -> Option<RunOutcome> {
        self.shared.guard.current_cycle().map(|cycle| cycle.wait())
    }

    /// Spawns the watcher thread, which loads the file before polling. The
    /// returned receiver hears once that load is done; it disconnects instead
    /// when the thread could not start. The thread itself is never joined.
    fn start_watcher(&self, cycle: &Arc<RunCycle>) -> Option<Receiver<()>> {
        let shared = &self.shared;
        let path = shared.config.config_file()?;
        let target = shared.config.target()?;
        let watcher = ConfigWatcher::new(
            path.to_path_buf(),
            Arc::clone(target),
            Arc::clone(&shared.host),
            Arc::clone(shared.sink()),
        );
        let (loaded_tx, loaded_rx) = mpsc::channel();
        let spawned = watcher.spawn(
            Arc::clone(&shared.guard),
            Arc::clone(cycle),
            shared.config.check_interval(),
            loaded_tx,
        );
        log_spawn_failure(shared.sink(), "config watcher", spawned);
        Some(loaded_rx)
    }

    fn start_bridge(&self, stream: Box<dyn SignalStream>) -> Option<SignalBridge> {
        let shared = Arc::clone(&self.shared);
        let spawned = SignalBridge::spawn(stream, Arc::clone(self.shared.sink()), move |_| {
            shared.request_stop();
        });
        log_spawn_failure(self.shared.sink(), "signal bridge", spawned)
    }
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("phase", &self.phase())
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}

fn log_spawn_failure<T>(sink: &Arc<dyn LogSink>, what: &str, spawned: io::Result<T>) -> Option<T> {
    spawned
        .map_err(|error| sink.error(format_args!("failed to spawn {what} thread: {error}")))
        .ok()
}

fn close_bridge(bridge: Option<SignalBridge>) {
    if let Some(live) = bridge {
        live.close();
    }
}
