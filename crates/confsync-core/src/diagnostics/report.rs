//! Error report payload and pre-submission scrubbing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entry::{ErrorDetails, LogEntry, LogLevel};

/// Everything the error reporter receives for one escalated entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub severity: LogLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetails>,
    /// Snapshot of the recent-activity window, oldest first.
    pub logs: Vec<LogEntry>,
}

impl ErrorReport {
    pub fn new(
        severity: LogLevel,
        message: impl Into<String>,
        error: Option<ErrorDetails>,
        logs: Vec<LogEntry>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            severity,
            message: message.into(),
            error,
            logs,
        }
    }

    /// Returns a copy with user names removed from every free-text field.
    pub fn redacted(mut self) -> Self {
        self.message = redact_user_paths(&self.message);
        if let Some(error) = self.error.as_mut() {
            error.message = redact_user_paths(&error.message);
            for source in &mut error.sources {
                *source = redact_user_paths(source);
            }
        }
        for entry in &mut self.logs {
            entry.message = redact_user_paths(&entry.message);
            entry.formatted = redact_user_paths(&entry.formatted);
        }
        self
    }
}

/// Home-directory prefixes whose next path segment is a user name.
///
/// `Users\\` covers paths that were JSON-escaped before being logged.
const USER_DIR_MARKERS: [&str; 4] = ["Users\\\\", "Users\\", "Users/", "/home/"];

/// Replaces the user-name segment of home-directory paths with `***`.
///
/// ```
/// use confsync_core::redact_user_paths;
///
/// assert_eq!(
///     redact_user_paths(r"C:\Users\alice\AppData\gui_config.json"),
///     r"C:\Users\***\AppData\gui_config.json"
/// );
/// assert_eq!(redact_user_paths("/home/bob/.config"), "/home/***/.config");
/// ```
pub fn redact_user_paths(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    loop {
        // Earliest marker wins; on a tie the longer marker wins.
        let next = USER_DIR_MARKERS
            .iter()
            .filter_map(|marker| rest.find(marker).map(|idx| (idx, *marker)))
            .min_by_key(|(idx, marker)| (*idx, std::cmp::Reverse(marker.len())));

        let Some((idx, marker)) = next else {
            out.push_str(rest);
            return out;
        };

        let segment_start = idx + marker.len();
        out.push_str(&rest[..segment_start]);

        let tail = &rest[segment_start..];
        let segment_len = tail
            .find(|c: char| matches!(c, '\\' | '/' | '"' | '\'') || c.is_whitespace())
            .unwrap_or(tail.len());
        if segment_len > 0 {
            out.push_str("***");
        }
        rest = &tail[segment_len..];
    }
}
