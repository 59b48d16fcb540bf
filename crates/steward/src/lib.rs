//! Process lifecycle control for long-running hosts.
//!
//! A host registers four lifecycle callbacks through the [`Lifecycle`] trait
//! (start, drain, stop and new-config) and hands them to a [`Controller`].
//! [`Controller::run`] drives the callbacks through a fixed sequence:
//!
//! ```text
//! Idle → Starting → Running → (Draining) → Stopping → Stopped
//! ```
//!
//! Start runs under its own timeout, after which `run` blocks until a stop is
//! requested by a termination signal, by [`Controller::stop`], or by an
//! internal failure. The stop sequence (drain, when enabled, then stop) runs
//! exactly once per run cycle however many triggers race for it. While the
//! cycle is live a background watcher polls the configured JSON file and
//! reloads it into the host's [`ConfigTarget`].
//!
//! ## Bounded, not cancellable
//!
//! Every callback runs on its own thread and the controller only waits for it
//! up to a deadline. A timeout changes what the controller reports and does
//! next; it never stops the callback, which keeps running detached. See
//! [`bounded`] for the contract.
//!
//! ## Process exit
//!
//! `run` returns a [`RunOutcome`] rather than terminating the process. The
//! binary entry point decides what to do with it, either by mapping
//! [`RunOutcome::exit_code`] into its own exit status or by calling
//! [`Controller::run_and_exit`].

pub mod bounded;
mod callbacks;
mod config;
mod controller;
mod error;
mod phase;
mod signals;
mod sink;
mod target;
pub mod telemetry;
mod watcher;

pub use callbacks::{Callbacks, Lifecycle};
pub use config::{LifecycleConfig, LifecycleConfigBuilder, StopTimeoutPolicy};
pub use controller::{Controller, RunOutcome};
pub use error::{ConfigError, ReloadError, RunError};
pub use phase::Phase;
pub use signals::{
    Notification, SignalError, SignalSource, SignalStream, StreamCloser, SystemSignals,
};
pub use sink::{LogLevel, LogSink, TracingSink};
pub use target::{ConfigTarget, JsonTarget};
pub use telemetry::{LogFormat, TelemetryConfig, TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
