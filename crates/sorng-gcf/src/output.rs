//! Where workflow results are written.

use std::sync::Mutex;

/// Line-oriented sink for user-facing output.
pub trait OutputSink: Send + Sync {
    fn log(&self, message: &str);
}

/// Writes to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl OutputSink for ConsoleSink {
    fn log(&self, message: &str) {
        println!("{}", message);
    }
}

/// Keeps every message in memory.
#[derive(Debug, Default)]
pub struct BufferedSink {
    lines: Mutex<Vec<String>>,
}

impl BufferedSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every message logged so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }
}

impl OutputSink for BufferedSink {
    fn log(&self, message: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(message.to_string());
        }
    }
}
