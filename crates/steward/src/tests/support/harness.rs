//! Helpers for driving a controller from test threads.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::{LifecycleConfig, LifecycleConfigBuilder};
use crate::controller::{Controller, RunOutcome};
use crate::error::RunError;
use crate::phase::Phase;

use super::signals::ManualSignals;
use super::sink::RecordingSink;

pub const WAIT_TIMEOUT: Duration = Duration::from_secs(2);
pub const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Builder with short timings, the recording sink and manual signals.
pub fn quick_config(sink: &Arc<RecordingSink>, signals: &ManualSignals) -> LifecycleConfigBuilder {
    LifecycleConfig::builder()
        .sink(Arc::clone(sink))
        .signals(signals.clone())
        .no_exit(true)
        .check_interval(Duration::from_millis(20))
        .start_timeout(WAIT_TIMEOUT)
        .drain_timeout(WAIT_TIMEOUT)
        .stop_timeout(WAIT_TIMEOUT)
}

/// Polls `condition` until it holds or [`WAIT_TIMEOUT`] elapses.
pub fn wait_until(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + WAIT_TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(POLL_INTERVAL);
    }
    condition()
}

/// Waits for the controller to reach `phase`.
pub fn wait_for_phase(controller: &Controller, phase: Phase) -> bool {
    wait_until(|| controller.phase() == phase)
}

/// Runs a cycle on a background thread.
pub fn spawn_run(controller: &Controller) -> JoinHandle<Result<RunOutcome, RunError>> {
    let runner = controller.clone();
    thread::spawn(move || runner.run())
}
