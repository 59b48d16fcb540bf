//! Log sink double that keeps every message for assertions.

use std::fmt;
use std::sync::Mutex;

use crate::sink::{LogLevel, LogSink};

/// Records rendered messages with their levels.
#[derive(Debug, Default)]
pub struct RecordingSink {
    entries: Mutex<Vec<(LogLevel, String)>>,
}

impl RecordingSink {
    /// Copies every recorded entry in arrival order.
    pub fn entries(&self) -> Vec<(LogLevel, String)> {
        self.entries
            .lock()
            .expect("recording sink mutex poisoned")
            .clone()
    }

    /// Messages recorded at `level`.
    pub fn messages_at(&self, level: LogLevel) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(recorded, _)| *recorded == level)
            .map(|(_, message)| message)
            .collect()
    }

    /// Whether any message at `level` contains `needle`.
    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.messages_at(level)
            .iter()
            .any(|message| message.contains(needle))
    }
}

impl LogSink for RecordingSink {
    fn log(&self, level: LogLevel, message: fmt::Arguments<'_>) {
        self.entries
            .lock()
            .expect("recording sink mutex poisoned")
            .push((level, message.to_string()));
    }
}
