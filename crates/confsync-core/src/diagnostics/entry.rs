//! Log entries as kept in the recent-activity window.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Severity of a log entry, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Upper-case label used in rendered lines.
    pub fn label(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    /// Only the highest severity is ever forwarded to the error reporter.
    pub fn escalates(self) -> bool {
        self == LogLevel::Error
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One entry of the recent-activity window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    /// The full rendered line: `[<timestamp>] [<LEVEL>] <message> <context>`.
    pub formatted: String,
}

impl LogEntry {
    /// Creates an entry and renders its text line.
    ///
    /// `context` carries the structured fields of the event already rendered
    /// as text (e.g. `path=/tmp/x attempt=2`).
    pub fn new(
        timestamp: DateTime<Utc>,
        level: LogLevel,
        message: impl Into<String>,
        context: Option<&str>,
    ) -> Self {
        let message = message.into();
        let mut formatted = format!(
            "[{}] [{}] {}",
            timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            level.label(),
            message
        );
        if let Some(context) = context.filter(|c| !c.is_empty()) {
            formatted.push(' ');
            formatted.push_str(context);
        }

        Self {
            timestamp,
            level,
            message,
            formatted,
        }
    }
}

/// Description of the error that caused an entry, captured at log time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// The error's display text.
    pub message: String,
    /// Display text of each `source()` in the chain, outermost first.
    pub sources: Vec<String>,
}

impl ErrorDetails {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            sources: Vec::new(),
        }
    }

    /// Captures an error together with its whole source chain.
    pub fn from_error(error: &(dyn std::error::Error + 'static)) -> Self {
        let mut sources = Vec::new();
        let mut next = error.source();
        while let Some(source) = next {
            sources.push(source.to_string());
            next = source.source();
        }

        Self {
            message: error.to_string(),
            sources,
        }
    }
}
