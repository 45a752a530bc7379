//! Human-readable checkout log.
//!
//! The engine reports what it is doing as ordered plain-text lines ("Start downloading
//! file: a.txt"). Where they end up is up to the [`ProgressSink`].

/// Receives checkout progress lines in order.
pub trait ProgressSink: Send + Sync + std::fmt::Debug {
    fn line(&self, message: &str);
}

/// Emits every line as an INFO event with the [`common::PROGRESS_TARGET`] target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn line(&self, message: &str) {
        tracing::info!(target: common::PROGRESS_TARGET, "{}", message);
    }
}

/// Keeps every line in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    lines: std::sync::Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl ProgressSink for RecordingSink {
    fn line(&self, message: &str) {
        self.lines
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(message.to_string());
    }
}
