//! Leveled logging sink injected into the lifecycle controller.

use std::fmt;
use std::sync::Arc;

use strum::Display;

pub(crate) const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");

/// Severity attached to a sink message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum LogLevel {
    /// Fine-grained polling chatter.
    Trace,
    /// Phase transitions and other lifecycle progress.
    Debug,
    /// Notable but expected events.
    Info,
    /// Recoverable anomalies.
    Warn,
    /// Timeouts and failed reloads.
    Error,
}

/// Capability accepting leveled messages from the controller.
///
/// Messages arrive as [`fmt::Arguments`], so call sites pass a format string
/// and its ordered positional arguments through `format_args!` and the sink
/// decides whether to render them at all.
pub trait LogSink: Send + Sync {
    /// Records a single message at `level`.
    fn log(&self, level: LogLevel, message: fmt::Arguments<'_>);

    /// Records a [`LogLevel::Trace`] message.
    fn trace(&self, message: fmt::Arguments<'_>) {
        self.log(LogLevel::Trace, message);
    }

    /// Records a [`LogLevel::Debug`] message.
    fn debug(&self, message: fmt::Arguments<'_>) {
        self.log(LogLevel::Debug, message);
    }

    /// Records a [`LogLevel::Info`] message.
    fn info(&self, message: fmt::Arguments<'_>) {
        self.log(LogLevel::Info, message);
    }

    /// Records a [`LogLevel::Warn`] message.
    fn warn(&self, message: fmt::Arguments<'_>) {
        self.log(LogLevel::Warn, message);
    }

    /// Records a [`LogLevel::Error`] message.
    fn error(&self, message: fmt::Arguments<'_>) {
        self.log(LogLevel::Error, message);
    }
}

impl<T> LogSink for Arc<T>
where
    T: LogSink + ?Sized,
{
    fn log(&self, level: LogLevel, message: fmt::Arguments<'_>) {
        (**self).log(level, message);
    }
}

/// Default sink that forwards every message to a `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TracingSink {
    /// Builds a new sink.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl LogSink for TracingSink {
    fn log(&self, level: LogLevel, message: fmt::Arguments<'_>) {
        match level {
            LogLevel::Trace => tracing::trace!(target: LIFECYCLE_TARGET, "{message}"),
            LogLevel::Debug => tracing::debug!(target: LIFECYCLE_TARGET, "{message}"),
            LogLevel::Info => tracing::info!(target: LIFECYCLE_TARGET, "{message}"),
            LogLevel::Warn => tracing::warn!(target: LIFECYCLE_TARGET, "{message}"),
            LogLevel::Error => tracing::error!(target: LIFECYCLE_TARGET, "{message}"),
        }
    }
}
