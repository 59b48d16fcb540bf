//! Test doubles and helpers shared by the controller suites.

mod harness;
mod host;
mod signals;
mod sink;
mod world;

pub use harness::{
    POLL_INTERVAL, WAIT_TIMEOUT, quick_config, spawn_run, wait_for_phase, wait_until,
};
pub use host::{HostEvent, RecordingHost};
pub use signals::ManualSignals;
pub use sink::RecordingSink;
pub use world::{ControllerWorld, StepResult, world};
