//! Pipeline progress logs, printed and streamed via Server-Sent Events.
//!
//! The conversion pipeline reports each step through [`log_info`] and
//! friends. Entries are printed to stdout and broadcast to every SSE client
//! connected to `/api/logs`.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Entries kept for slow SSE subscribers before they start lagging.
const CHANNEL_CAPACITY: usize = 256;

/// Log level for display
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    fn prefix(&self) -> &'static str {
        match self {
            LogLevel::Info => "   ",
            LogLevel::Success => "   ✓",
            LogLevel::Warning => "   ⚠️",
            LogLevel::Error => "   ❌",
        }
    }
}

/// A single log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Nesting depth (mapping lines sit one level below their heading)
    #[serde(default)]
    pub indent: u8,
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self { level, message: message.into(), indent: 0, timestamp: Utc::now() }
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }

    /// Console form: indentation, level marker, message.
    pub fn render(&self) -> String {
        format!("{}{} {}", "   ".repeat(self.indent as usize), self.level.prefix(), self.message)
    }
}

/// Global log broadcaster
pub static LOG_BROADCASTER: Lazy<LogBroadcaster> = Lazy::new(LogBroadcaster::new);

/// Fans log entries out to stdout and every SSE subscriber.
pub struct LogBroadcaster {
    sender: broadcast::Sender<LogEntry>,
}

impl LogBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn log(&self, entry: LogEntry) {
        println!("{}", entry.render());
        // no subscribers is fine
        let _ = self.sender.send(entry);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.sender.subscribe()
    }
}

impl Default for LogBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

pub fn log_info(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Info, msg));
}

pub fn log_success(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Success, msg));
}

pub fn log_warning(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Warning, msg));
}

pub fn log_error(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Error, msg));
}

pub fn log_info_indent(msg: impl Into<String>, indent: u8) {
    LOG_BROADCASTER.log(LogEntry::new(LogLevel::Info, msg).with_indent(indent));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_indent() {
        let entry = LogEntry::new(LogLevel::Success, "done").with_indent(1);
        assert_eq!(entry.render(), "      ✓ done");
    }

    #[test]
    fn test_subscribers_receive_entries() {
        let broadcaster = LogBroadcaster::new();
        let mut rx = broadcaster.subscribe();
        broadcaster.log(LogEntry::new(LogLevel::Warning, "careful"));

        let entry = rx.try_recv().unwrap();
        assert_eq!(entry.level, LogLevel::Warning);
        assert_eq!(entry.message, "careful");
    }

    #[test]
    fn test_entry_serializes_camel_case() {
        let json = serde_json::to_value(LogEntry::new(LogLevel::Error, "x")).unwrap();
        assert_eq!(json["level"], "error");
        assert!(json.get("timestamp").is_some());
    }
}
