//! The host's lifecycle callback set.

use std::fmt;
use std::sync::Arc;

/// Callbacks a host exposes to the controller.
///
/// Every method defaults to a no-op so hosts override only the phases they
/// care about. Callbacks run on worker threads under a timeout and have no
/// error channel: a callback that fails should handle the failure itself,
/// and one that overruns its timeout is reported and left running.
///
/// # Examples
///
/// ```rust,ignore
/// use steward::{Controller, Lifecycle};
///
/// struct Worker;
///
/// impl Lifecycle for Worker {
///     fn start(&self) {
///         tracing::info!("worker starting");
///     }
///
///     fn stop(&self) {
///         tracing::info!("worker stopping");
///     }
/// }
///
/// let controller = Controller::new_default(Worker);
/// let outcome = controller.run()?;
/// ```
pub trait Lifecycle: Send + Sync + 'static {
    /// Brings the host up. `run` blocks until a stop is requested once this
    /// returns.
    fn start(&self) {}

    /// Finishes in-flight work ahead of `stop`. Only called when drain is
    /// enabled for the cycle.
    fn drain(&self) {}

    /// Tears the host down.
    fn stop(&self) {}

    /// Called after the config file was reloaded into the config target.
    fn on_new_config(&self) {}
}

impl<T> Lifecycle for Arc<T>
where
    T: Lifecycle + ?Sized,
{
    fn start(&self) {
        (**self).start();
    }

    fn drain(&self) {
        (**self).drain();
    }

    fn stop(&self) {
        (**self).stop();
    }

    fn on_new_config(&self) {
        (**self).on_new_config();
    }
}

type Hook = Box<dyn Fn() + Send + Sync>;

/// Lifecycle built from closures, one optional slot per callback.
///
/// Empty slots behave like the trait defaults.
#[derive(Default)]
pub struct Callbacks {
    start: Option<Hook>,
    drain: Option<Hook>,
    stop: Option<Hook>,
    new_config: Option<Hook>,
}

impl Callbacks {
    /// Builds a callback set where every slot is a no-op.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the start callback.
    #[must_use]
    pub fn with_start(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.start = Some(Box::new(hook));
        self
    }

    /// Sets the drain callback.
    #[must_use]
    pub fn with_drain(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.drain = Some(Box::new(hook));
        self
    }

    /// Sets the stop callback.
    #[must_use]
    pub fn with_stop(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.stop = Some(Box::new(hook));
        self
    }

    /// Sets the new-config callback.
    #[must_use]
    pub fn with_new_config(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.new_config = Some(Box::new(hook));
        self
    }
}

fn invoke(hook: Option<&Hook>) {
    if let Some(callback) = hook {
        callback();
    }
}

impl Lifecycle for Callbacks {
    fn start(&self) {
        invoke(self.start.as_ref());
    }

    fn drain(&self) {
        invoke(self.drain.as_ref());
    }

    fn stop(&self) {
        invoke(self.stop.as_ref());
    }

    fn on_new_config(&self) {
        invoke(self.new_config.as_ref());
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("start", &self.start.is_some())
            .field("drain", &self.drain.is_some())
            .field("stop", &self.stop.is_some())
            .field("new_config", &self.new_config.is_some())
            .finish()
    }
}
