//! Scenario world shared by the controller behaviour suites.

use std::cell::RefCell;
use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::{Arc, Barrier};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};

use serde::Deserialize;
use tempfile::TempDir;

use crate::config::StopTimeoutPolicy;
use crate::controller::{Controller, RunOutcome};
use crate::error::RunError;
use crate::phase::Phase;
use crate::signals::Notification;
use crate::target::JsonTarget;

use super::harness::{quick_config, spawn_run, wait_for_phase, wait_until};
use super::host::{HostEvent, RecordingHost};
use super::signals::ManualSignals;
use super::sink::RecordingSink;

pub type StepResult = Result<(), String>;

type RunResult = Result<RunOutcome, RunError>;

/// Settings decoded from the scenario's config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScenarioSettings {
    #[serde(rename = "Foo")]
    pub foo: String,
    #[serde(rename = "Baz")]
    pub baz: String,
}

/// State carried between the steps of one scenario.
pub struct ControllerWorld {
    host: Option<RecordingHost>,
    live_host: Arc<RecordingHost>,
    pub sink: Arc<RecordingSink>,
    pub signals: ManualSignals,
    drain_enabled: bool,
    start_timeout: Option<Duration>,
    stop_timeout: Option<Duration>,
    policy: StopTimeoutPolicy,
    config_dir: Option<TempDir>,
    config_writes: u64,
    pub settings: JsonTarget<ScenarioSettings>,
    controller: Option<Controller>,
    run: Option<JoinHandle<RunResult>>,
    result: Option<RunResult>,
    pub stop_results: Vec<Option<RunOutcome>>,
    pub reentry: Option<RunResult>,
    pending_stop: Option<JoinHandle<Option<RunOutcome>>>,
}

impl Default for ControllerWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerWorld {
    pub fn new() -> Self {
        Self {
            host: Some(RecordingHost::default()),
            live_host: Arc::new(RecordingHost::default()),
            sink: Arc::new(RecordingSink::default()),
            signals: ManualSignals::default(),
            drain_enabled: false,
            start_timeout: None,
            stop_timeout: None,
            policy: StopTimeoutPolicy::Continue,
            config_dir: None,
            config_writes: 0,
            settings: JsonTarget::default(),
            controller: None,
            run: None,
            result: None,
            stop_results: Vec::new(),
            reentry: None,
            pending_stop: None,
        }
    }

    /// Host whose callbacks the controller drives.
    pub fn host(&self) -> &RecordingHost {
        &self.live_host
    }

    pub fn delay(&mut self, event: HostEvent, delay: Duration) -> StepResult {
        let host = self.host.take().ok_or("host already handed to the controller")?;
        self.host = Some(host.with_delay(event, delay));
        Ok(())
    }

    pub fn fail(&mut self, event: HostEvent) -> StepResult {
        let host = self.host.take().ok_or("host already handed to the controller")?;
        self.host = Some(host.with_panic(event));
        Ok(())
    }

    pub const fn enable_drain(&mut self) {
        self.drain_enabled = true;
    }

    pub const fn set_start_timeout(&mut self, timeout: Duration) {
        self.start_timeout = Some(timeout);
    }

    pub const fn set_stop_timeout(&mut self, timeout: Duration) {
        self.stop_timeout = Some(timeout);
    }

    pub const fn set_policy(&mut self, policy: StopTimeoutPolicy) {
        self.policy = policy;
    }

    fn config_path(&self) -> Option<PathBuf> {
        self.config_dir
            .as_ref()
            .map(|dir| dir.path().join("host.json"))
    }

    /// Writes the config file with a modification time no earlier write used.
    pub fn write_config(&mut self, contents: &str) -> StepResult {
        if self.config_dir.is_none() {
            self.config_dir = Some(TempDir::new().map_err(|error| error.to_string())?);
        }
        let path = self.config_path().ok_or("config directory missing")?;
        fs::write(&path, contents).map_err(|error| error.to_string())?;
        self.config_writes += 1;
        let modified = SystemTime::now() + Duration::from_secs(self.config_writes);
        File::options()
            .write(true)
            .open(&path)
            .and_then(|file| file.set_modified(modified))
            .map_err(|error| error.to_string())
    }

    fn build_controller(&mut self) -> Result<Controller, String> {
        if let Some(controller) = &self.controller {
            return Ok(controller.clone());
        }
        let host = self.host.take().ok_or("host already handed to the controller")?;
        self.live_host = Arc::new(host);

        let mut builder = quick_config(&self.sink, &self.signals)
            .drain_enabled(self.drain_enabled)
            .stop_timeout_policy(self.policy);
        if let Some(timeout) = self.start_timeout {
            builder = builder.start_timeout(timeout);
        }
        if let Some(timeout) = self.stop_timeout {
            builder = builder.stop_timeout(timeout);
        }
        if let Some(path) = self.config_path() {
            builder = builder.config_file(path).target(self.settings.clone());
        }
        let config = builder.build().map_err(|error| error.to_string())?;
        let controller = Controller::new(Arc::clone(&self.live_host), config);
        self.controller = Some(controller.clone());
        Ok(controller)
    }

    fn controller(&self) -> Result<&Controller, String> {
        self.controller
            .as_ref()
            .ok_or_else(|| "controller has not been built".to_owned())
    }

    /// Starts a run cycle on a background thread.
    pub fn start_run(&mut self) -> StepResult {
        if self.run.is_some() {
            return Err("a run is already in flight".to_owned());
        }
        let controller = self.build_controller()?;
        self.result = None;
        self.run = Some(spawn_run(&controller));
        Ok(())
    }

    pub fn wait_for_phase(&self, phase: Phase) -> StepResult {
        let controller = self.controller()?;
        if wait_for_phase(controller, phase) {
            Ok(())
        } else {
            Err(format!(
                "controller stayed in {} instead of reaching {phase}",
                controller.phase()
            ))
        }
    }

    pub fn wait_for_entered(&self, event: HostEvent) -> StepResult {
        let host = Arc::clone(&self.live_host);
        if wait_until(|| host.count(event) > 0) {
            Ok(())
        } else {
            Err(format!("{event:?} callback was never entered"))
        }
    }

    pub fn raise(&self, notification: Notification) {
        self.signals.raise(notification);
    }

    /// Calls `stop` from `callers` threads released together, optionally
    /// racing them against `signal`.
    pub fn concurrent_stops(
        &mut self,
        callers: usize,
        signal: Option<Notification>,
    ) -> StepResult {
        let controller = self.controller()?.clone();
        let barrier = Arc::new(Barrier::new(callers + 1));
        let handles: Vec<_> = (0..callers)
            .map(|_| {
                let stopper = controller.clone();
                let gate = Arc::clone(&barrier);
                thread::spawn(move || {
                    gate.wait();
                    stopper.stop()
                })
            })
            .collect();
        barrier.wait();
        if let Some(notification) = signal {
            self.signals.raise(notification);
        }
        for handle in handles {
            let outcome = handle.join().map_err(|_| "stop caller panicked")?;
            self.stop_results.push(outcome);
        }
        Ok(())
    }

    /// Requests a stop without waiting for it.
    pub fn request_stop_in_background(&mut self) -> StepResult {
        let stopper = self.controller()?.clone();
        self.pending_stop = Some(thread::spawn(move || stopper.stop()));
        Ok(())
    }

    pub fn set_drain(&self, enabled: bool) -> Result<bool, String> {
        Ok(self.controller()?.set_drain_enabled(enabled))
    }

    pub fn run_again(&mut self) -> StepResult {
        self.reentry = Some(self.controller()?.run());
        Ok(())
    }

    /// Waits for the background run, and any pending stop, to return.
    pub fn finish_run(&mut self) -> StepResult {
        let run = self.run.take().ok_or("no run in flight")?;
        let result = run.join().map_err(|_| "run thread panicked")?;
        self.result = Some(result);
        if let Some(pending) = self.pending_stop.take() {
            let outcome = pending.join().map_err(|_| "stop caller panicked")?;
            self.stop_results.push(outcome);
        }
        Ok(())
    }

    pub fn outcome(&self) -> Result<RunOutcome, String> {
        match &self.result {
            Some(Ok(outcome)) => Ok(*outcome),
            Some(Err(error)) => Err(format!("run failed: {error}")),
            None => Err("run has not completed".to_owned()),
        }
    }

    pub fn is_running(&self) -> Result<bool, String> {
        Ok(self.controller()?.is_running())
    }
}

/// Fresh scenario world.
pub fn world() -> RefCell<ControllerWorld> {
    RefCell::new(ControllerWorld::new())
}
