//! Bridge from process signals into the controller's stop sequence.
//!
//! Termination notifications (interrupt and terminate) request a stop through
//! the same single-fire path as [`crate::Controller::stop`], so a signal
//! racing an explicit stop never runs drain or stop twice. The reload
//! notification is subscribed to and acknowledged in the log, and otherwise
//! left as a reserved extension point.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use strum::Display;
use thiserror::Error;

use crate::sink::LogSink;

/// Process-level notification understood by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Notification {
    /// Interactive interrupt (`SIGINT`).
    Interrupt,
    /// Termination request (`SIGTERM`).
    Terminate,
    /// Reload request (`SIGHUP`). Reserved; currently acknowledged only.
    Reload,
}

impl Notification {
    /// Whether the notification should start the stop sequence.
    #[must_use]
    pub const fn is_termination(self) -> bool {
        matches!(self, Self::Interrupt | Self::Terminate)
    }

    const fn from_signal(signal: i32) -> Option<Self> {
        match signal {
            SIGINT => Some(Self::Interrupt),
            SIGTERM => Some(Self::Terminate),
            SIGHUP => Some(Self::Reload),
            _ => None,
        }
    }
}

/// Errors reported by signal sources.
#[derive(Debug, Error)]
pub enum SignalError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Supplier of process notifications for one run cycle.
pub trait SignalSource: Send + Sync {
    /// Installs handlers and returns a stream of notifications. Handlers stay
    /// installed until the stream is dropped.
    fn subscribe(&self) -> Result<Box<dyn SignalStream>, SignalError>;
}

/// Blocking stream of notifications.
pub trait SignalStream: Send {
    /// Blocks for the next notification. Returns `None` once the stream has
    /// been closed.
    fn next_notification(&mut self) -> Option<Notification>;

    /// Returns a handle that closes this stream from another thread.
    fn closer(&self) -> StreamCloser;
}

/// Closes a [`SignalStream`] from any thread.
pub struct StreamCloser(Box<dyn Fn() + Send + Sync>);

impl StreamCloser {
    /// Wraps the closing action.
    pub fn new(close: impl Fn() + Send + Sync + 'static) -> Self {
        Self(Box::new(close))
    }

    /// Closes the stream. Safe to call more than once.
    pub fn close(&self) {
        (self.0)();
    }
}

impl fmt::Debug for StreamCloser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamCloser").finish_non_exhaustive()
    }
}

/// Signal source backed by `SIGINT`, `SIGTERM` and `SIGHUP` handlers.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSignals;

impl SystemSignals {
    /// Builds the source. Handlers are installed on [`SignalSource::subscribe`].
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SignalSource for SystemSignals {
    fn subscribe(&self) -> Result<Box<dyn SignalStream>, SignalError> {
        let signals = Signals::new([SIGINT, SIGTERM, SIGHUP])
            .map_err(|source| SignalError::Install { source })?;
        Ok(Box::new(SystemStream { signals }))
    }
}

struct SystemStream {
    signals: Signals,
}

impl SignalStream for SystemStream {
    fn next_notification(&mut self) -> Option<Notification> {
        self.signals.forever().find_map(Notification::from_signal)
    }

    fn closer(&self) -> StreamCloser {
        let handle = self.signals.handle();
        StreamCloser::new(move || handle.close())
    }
}

/// Background thread forwarding notifications for one run cycle.
#[derive(Debug)]
pub(crate) struct SignalBridge {
    closer: StreamCloser,
    thread: Option<JoinHandle<()>>,
}

impl SignalBridge {
    /// Spawns the forwarding thread. `on_termination` runs on that thread for
    /// every interrupt or terminate notification.
    pub(crate) fn spawn<F>(
        mut stream: Box<dyn SignalStream>,
        sink: Arc<dyn LogSink>,
        on_termination: F,
    ) -> io::Result<Self>
    where
        F: Fn(Notification) + Send + 'static,
    {
        let closer = stream.closer();
        let thread = thread::Builder::new()
            .name("steward-signals".to_owned())
            .spawn(move || {
                while let Some(notification) = stream.next_notification() {
                    if notification.is_termination() {
                        sink.debug(format_args!("{notification} signal received; stopping"));
                        on_termination(notification);
                    } else {
                        sink.debug(format_args!(
                            "{notification} signal received; reload handling is reserved"
                        ));
                    }
                }
                sink.trace(format_args!("signal bridge closed"));
            })?;
        Ok(Self {
            closer,
            thread: Some(thread),
        })
    }

    /// Closes the stream and waits for the forwarding thread to exit.
    pub(crate) fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.closer.close();
        if let Some(thread) = self.thread.take()
            && thread.thread().id() != thread::current().id()
        {
            thread.join().ok();
        }
    }
}

impl Drop for SignalBridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}
