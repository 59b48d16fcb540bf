//! Bounded execution of lifecycle callbacks.
//!
//! An operation is launched on its own thread and the caller waits for it up
//! to a deadline. The wait is bounded; the operation is not. When the deadline
//! passes first the worker thread is neither cancelled nor joined, it simply
//! keeps running detached from the caller. A `false` from [`run_bounded`] (or
//! [`Completion::TimedOut`] from [`execute`]) therefore means "completion state
//! unknown", never "operation aborted".

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// Result of a bounded execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The operation returned before the deadline.
    Completed,
    /// The deadline passed first. The operation may still be running.
    TimedOut,
    /// The operation panicked, or its worker thread could not be spawned.
    Failed,
}

impl Completion {
    /// Whether the operation returned normally within the deadline.
    #[must_use]
    pub const fn is_completed(self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Runs `operation` on a new thread and reports whether it finished within
/// `timeout`.
///
/// Returns `true` only when the operation returned before the deadline; its
/// side effects are then visible to the caller. On `false` the operation is
/// left running.
pub fn run_bounded<F>(timeout: Duration, operation: F) -> bool
where
    F: FnOnce() + Send + 'static,
{
    execute("bounded", timeout, operation).is_completed()
}

/// Runs `operation` on a thread named after `label` and waits up to
/// `timeout` for it.
///
/// A panic inside the operation is caught on the worker thread and reported
/// as [`Completion::Failed`] instead of unwinding into the caller.
pub fn execute<F>(label: &str, timeout: Duration, operation: F) -> Completion
where
    F: FnOnce() + Send + 'static,
{
    let (done_tx, done_rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name(format!("steward-{label}"))
        .spawn(move || {
            let returned = panic::catch_unwind(AssertUnwindSafe(operation)).is_ok();
            // The receiver is gone once the caller stopped waiting.
            done_tx.send(returned).ok();
        });
    if spawned.is_err() {
        return Completion::Failed;
    }

    match done_rx.recv_timeout(timeout) {
        Ok(true) => Completion::Completed,
        Ok(false) | Err(RecvTimeoutError::Disconnected) => Completion::Failed,
        Err(RecvTimeoutError::Timeout) => Completion::TimedOut,
    }
}
