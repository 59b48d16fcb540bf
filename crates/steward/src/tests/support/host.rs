//! Lifecycle host double that records callback invocations.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use crate::callbacks::Lifecycle;

/// Callback events observed by [`RecordingHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostEvent {
    /// Start was entered.
    Start,
    /// Start returned.
    Started,
    /// Drain was entered.
    Drain,
    /// Stop was entered.
    Stop,
    /// New-config was entered.
    NewConfig,
}

/// Records callbacks, optionally sleeping in or panicking from them.
#[derive(Debug, Default)]
pub struct RecordingHost {
    events: Mutex<Vec<HostEvent>>,
    delays: HashMap<HostEvent, Duration>,
    panics: HashSet<HostEvent>,
}

impl RecordingHost {
    /// Makes the callback behind `event` sleep for `delay`.
    pub fn with_delay(mut self, event: HostEvent, delay: Duration) -> Self {
        self.delays.insert(event, delay);
        self
    }

    /// Makes the callback behind `event` panic after recording itself.
    pub fn with_panic(mut self, event: HostEvent) -> Self {
        self.panics.insert(event);
        self
    }

    /// Copies the recorded events in arrival order.
    pub fn events(&self) -> Vec<HostEvent> {
        self.events
            .lock()
            .expect("host events mutex poisoned")
            .clone()
    }

    /// Number of times `event` was recorded.
    pub fn count(&self, event: HostEvent) -> usize {
        self.events()
            .into_iter()
            .filter(|recorded| *recorded == event)
            .count()
    }

    fn record(&self, event: HostEvent) {
        self.events
            .lock()
            .expect("host events mutex poisoned")
            .push(event);
        if let Some(delay) = self.delays.get(&event) {
            thread::sleep(*delay);
        }
        assert!(
            !self.panics.contains(&event),
            "{event:?} callback failed on purpose"
        );
    }
}

impl Lifecycle for RecordingHost {
    fn start(&self) {
        self.record(HostEvent::Start);
        self.events
            .lock()
            .expect("host events mutex poisoned")
            .push(HostEvent::Started);
    }

    fn drain(&self) {
        self.record(HostEvent::Drain);
    }

    fn stop(&self) {
        self.record(HostEvent::Stop);
    }

    fn on_new_config(&self) {
        self.record(HostEvent::NewConfig);
    }
}
