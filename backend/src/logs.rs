//! Leveled logging to stderr, with in-process capture.
//!
//! stdout is reserved for CSV output, so every entry goes to stderr. Entries
//! are also sent on a broadcast channel: a [`LogCapture`] taken before a run
//! sees every entry logged while it is alive, which is how the CLI reports
//! warning counts and how tests check that a warning was recorded.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::TryRecvError};

/// Entries kept for a capture that has not drained yet.
const CAPTURE_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    fn marker(self) -> &'static str {
        match self {
            LogLevel::Info => "",
            LogLevel::Success => "✓ ",
            LogLevel::Warning => "⚠️  ",
            LogLevel::Error => "❌ ",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

/// Process-wide logger behind the `log_*` functions.
pub static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::with_capacity(CAPTURE_CAPACITY));

pub struct Logger {
    sender: broadcast::Sender<LogEntry>,
}

impl Logger {
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn emit(&self, level: LogLevel, message: impl Into<String>) {
        let entry = LogEntry {
            level,
            message: message.into(),
        };
        eprintln!("   {}{}", level.marker(), entry.message);

        // Nobody capturing is fine
        let _ = self.sender.send(entry);
    }

    /// Start collecting entries logged from now on.
    pub fn capture(&self) -> LogCapture {
        LogCapture {
            receiver: self.sender.subscribe(),
        }
    }
}

/// Entries logged since the capture was taken.
pub struct LogCapture {
    receiver: broadcast::Receiver<LogEntry>,
}

impl LogCapture {
    /// Take every entry received so far. Entries lost to lag are skipped.
    pub fn drain(&mut self) -> Vec<LogEntry> {
        let mut entries = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(entry) => entries.push(entry),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        entries
    }

    /// Drain and keep only warning messages.
    pub fn warnings(&mut self) -> Vec<String> {
        self.drain()
            .into_iter()
            .filter(|e| e.level == LogLevel::Warning)
            .map(|e| e.message)
            .collect()
    }
}

/// Capture entries sent through the `log_*` functions.
pub fn capture() -> LogCapture {
    LOGGER.capture()
}

pub fn log_info(msg: impl Into<String>) {
    LOGGER.emit(LogLevel::Info, msg);
}

pub fn log_success(msg: impl Into<String>) {
    LOGGER.emit(LogLevel::Success, msg);
}

pub fn log_warning(msg: impl Into<String>) {
    LOGGER.emit(LogLevel::Warning, msg);
}

pub fn log_error(msg: impl Into<String>) {
    LOGGER.emit(LogLevel::Error, msg);
}
