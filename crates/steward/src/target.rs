//! Destinations for reloaded configuration.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use serde::de::DeserializeOwned;

use crate::error::ReloadError;

/// Receives the raw contents of the config file on every reload.
///
/// Implementations must leave their previous value untouched when `apply`
/// fails, so a broken write to the file never clobbers a working config.
pub trait ConfigTarget: Send + Sync {
    /// Decodes `contents` and, on success, replaces the live value.
    fn apply(&self, contents: &[u8]) -> Result<(), ReloadError>;
}

impl<T> ConfigTarget for Arc<T>
where
    T: ConfigTarget + ?Sized,
{
    fn apply(&self, contents: &[u8]) -> Result<(), ReloadError> {
        (**self).apply(contents)
    }
}

/// JSON-decoded config shared between the watcher and the host.
///
/// Each reload decodes into a scratch `T` first and swaps it in only once
/// decoding succeeded. The whole value is replaced, so fields missing from
/// the file take their serde defaults rather than keeping old values.
///
/// Clones share the same live value.
pub struct JsonTarget<T> {
    live: Arc<RwLock<T>>,
}

impl<T> JsonTarget<T> {
    /// Wraps `initial` as the live value.
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self {
            live: Arc::new(RwLock::new(initial)),
        }
    }

    /// Borrows the live value.
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.live.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copies the live value out.
    #[must_use]
    pub fn snapshot(&self) -> T
    where
        T: Clone,
    {
        self.read().clone()
    }
}

impl<T> Clone for JsonTarget<T> {
    fn clone(&self) -> Self {
        Self {
            live: Arc::clone(&self.live),
        }
    }
}

impl<T: Default> Default for JsonTarget<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for JsonTarget<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonTarget")
            .field("live", &*self.read())
            .finish()
    }
}

impl<T> ConfigTarget for JsonTarget<T>
where
    T: DeserializeOwned + Send + Sync,
{
    fn apply(&self, contents: &[u8]) -> Result<(), ReloadError> {
        let scratch: T =
            serde_json::from_slice(contents).map_err(|source| ReloadError::Decode { source })?;
        *self.live.write().unwrap_or_else(PoisonError::into_inner) = scratch;
        Ok(())
    }
}
