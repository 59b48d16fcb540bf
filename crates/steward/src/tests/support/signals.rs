//! Signal source driven by the test instead of the operating system.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use crate::signals::{Notification, SignalError, SignalSource, SignalStream, StreamCloser};

type Subscriber = Sender<Option<Notification>>;

/// Delivers raised notifications to every live subscription, like a process
/// signal reaching every installed handler.
#[derive(Debug, Clone, Default)]
pub struct ManualSignals {
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
}

impl ManualSignals {
    /// Delivers `notification` to every open stream.
    pub fn raise(&self, notification: Notification) {
        self.subscribers
            .lock()
            .expect("manual signals mutex poisoned")
            .retain(|subscriber| subscriber.send(Some(notification)).is_ok());
    }
}

impl SignalSource for ManualSignals {
    fn subscribe(&self) -> Result<Box<dyn SignalStream>, SignalError> {
        let (sender, receiver) = mpsc::channel();
        self.subscribers
            .lock()
            .expect("manual signals mutex poisoned")
            .push(sender.clone());
        Ok(Box::new(ManualStream { receiver, sender }))
    }
}

struct ManualStream {
    receiver: Receiver<Option<Notification>>,
    sender: Subscriber,
}

impl SignalStream for ManualStream {
    fn next_notification(&mut self) -> Option<Notification> {
        self.receiver.recv().ok().flatten()
    }

    fn closer(&self) -> StreamCloser {
        let sender = self.sender.clone();
        StreamCloser::new(move || {
            sender.send(None).ok();
        })
    }
}
