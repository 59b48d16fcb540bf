//! Error surface for configuring and running the lifecycle controller.
//!
//! Lifecycle callbacks have no error channel; failures inside them surface
//! only as timeouts. The types here cover what the controller itself can get
//! wrong: an incomplete configuration, a re-entrant `run`, signal handlers
//! that cannot be installed, and config reloads that fail.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::signals::SignalError;

/// Errors reported while building a [`crate::LifecycleConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No log sink was supplied.
    #[error("a log sink is required")]
    MissingLogSink,
    /// A config file was configured without somewhere to decode it into.
    #[error("config file '{path}' has no deserialisation target")]
    MissingTarget {
        /// Configured config file path.
        path: PathBuf,
    },
    /// The polling interval was zero.
    #[error("config check interval must be greater than zero")]
    ZeroCheckInterval,
}

/// Errors returned by [`crate::Controller::run`].
#[derive(Debug, Error)]
pub enum RunError {
    /// The controller already has a live run cycle.
    #[error("lifecycle controller is already running")]
    AlreadyRunning,
    /// Subscribing to process signals failed before the cycle began.
    #[error("failed to subscribe to process signals: {source}")]
    Signals {
        /// Underlying signal error.
        #[source]
        source: SignalError,
    },
}

impl From<SignalError> for RunError {
    fn from(source: SignalError) -> Self {
        Self::Signals { source }
    }
}

/// Errors raised while reloading the config file.
///
/// The watcher logs these and carries on; they never end a run cycle.
#[derive(Debug, Error)]
pub enum ReloadError {
    /// The file's metadata could not be read.
    #[error("unable to stat config file '{path}': {source}")]
    Stat {
        /// Config file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The file's contents could not be read.
    #[error("unable to read config file '{path}': {source}")]
    Read {
        /// Config file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The contents were not valid for the target.
    #[error("config file decode error: {source}")]
    Decode {
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}
