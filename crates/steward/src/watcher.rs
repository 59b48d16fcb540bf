//! Polling watcher that reloads the config file while a cycle is running.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};

use crate::callbacks::Lifecycle;
use crate::error::ReloadError;
use crate::phase::{PhaseGuard, RunCycle};
use crate::sink::LogSink;
use crate::target::ConfigTarget;

/// Result of one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PollOutcome {
    /// The file changed and was applied; the host was notified.
    Reloaded,
    /// The modification time matched the last poll.
    Unchanged,
    /// The file could not be read or decoded; the previous value stands.
    Failed,
}

/// Tracks one config file and the last modification time it was read at.
pub(crate) struct ConfigWatcher {
    path: PathBuf,
    target: Arc<dyn ConfigTarget>,
    host: Arc<dyn Lifecycle>,
    sink: Arc<dyn LogSink>,
    last_modified: Option<SystemTime>,
}

impl ConfigWatcher {
    pub(crate) fn new(
        path: PathBuf,
        target: Arc<dyn ConfigTarget>,
        host: Arc<dyn Lifecycle>,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            path,
            target,
            host,
            sink,
            last_modified: None,
        }
    }

    /// Checks the file once, reloading it when its modification time moved.
    pub(crate) fn poll(&mut self) -> PollOutcome {
        match self.reload() {
            Ok(true) => {
                self.sink.debug(format_args!(
                    "config file '{}' reloaded",
                    self.path.display()
                ));
                self.host.on_new_config();
                PollOutcome::Reloaded
            }
            Ok(false) => {
                self.sink.trace(format_args!("config file not changed"));
                PollOutcome::Unchanged
            }
            Err(error) => {
                self.sink.error(format_args!("{error}"));
                PollOutcome::Failed
            }
        }
    }

    fn reload(&mut self) -> Result<bool, ReloadError> {
        let modified = fs::metadata(&self.path)
            .and_then(|metadata| metadata.modified())
            .map_err(|source| ReloadError::Stat {
                path: self.path.clone(),
                source,
            })?;
        if self.last_modified == Some(modified) {
            return Ok(false);
        }
        // A broken write is not retried until the file changes again.
        self.last_modified = Some(modified);

        let contents = fs::read(&self.path).map_err(|source| ReloadError::Read {
            path: self.path.clone(),
            source,
        })?;
        self.target.apply(&contents)?;
        Ok(true)
    }

    /// Moves the watcher onto its own thread. The thread loads the file once,
    /// signals `loaded`, then polls every `interval` until the controller
    /// stops running or `cycle` finishes.
    ///
    /// `loaded` is dropped without a message when the thread cannot start.
    pub(crate) fn spawn(
        mut self,
        guard: Arc<PhaseGuard>,
        cycle: Arc<RunCycle>,
        interval: Duration,
        loaded: Sender<()>,
    ) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("steward-config-watcher".to_owned())
            .spawn(move || {
                self.poll();
                // Nobody listens once start gave up waiting.
                loaded.send(()).ok();
                while guard.is_running() && cycle.wait_timeout(interval).is_none() {
                    if !guard.is_running() {
                        break;
                    }
                    self.poll();
                }
                self.sink.trace(format_args!("config watcher stopped"));
            })
    }
}
