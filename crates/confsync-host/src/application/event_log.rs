//! EventLog: the bounded recent-activity window plus escalation to an error
//! reporter.
//!
//! Every event emitted through `tracing` reaches [`EventLog::append`] via the
//! logging layer in `infrastructure::logging`.  Entries at
//! [`LogLevel::Error`] are additionally escalated when escalation is enabled
//! and a reporter has been installed.  The reporter receives a scrubbed
//! [`ErrorReport`] carrying a snapshot of the window at the time of the error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use confsync_core::{ErrorDetails, ErrorReport, LogEntry, LogLevel, RecentLog};
use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tracing::{debug, warn};

/// Error type for handing a report to the external reporter.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("error reporter is not accepting reports: {0}")]
    Unavailable(String),

    #[error("failed to encode error report: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write error report: {0}")]
    Io(#[from] std::io::Error),
}

/// Receives escalated error reports.
///
/// `submit` is called synchronously from inside logging calls, so
/// implementations must hand the report off quickly (e.g. to a channel) and
/// must not block on I/O.
#[cfg_attr(test, mockall::automock)]
pub trait ErrorReporter: Send + Sync {
    fn submit(&self, report: ErrorReport) -> Result<(), ReportError>;
}

/// Bounded event log with gated escalation.
pub struct EventLog {
    recent: Mutex<RecentLog>,
    escalation_enabled: AtomicBool,
    reporter: RwLock<Option<Arc<dyn ErrorReporter>>>,
}

impl EventLog {
    /// Creates an empty log.  Escalation starts disabled with no reporter.
    pub fn new(window: Duration, capacity: usize) -> Self {
        Self {
            recent: Mutex::new(RecentLog::new(window, capacity)),
            escalation_enabled: AtomicBool::new(false),
            reporter: RwLock::new(None),
        }
    }

    /// Records a message stamped with the current time.
    pub fn record(&self, level: LogLevel, message: &str, context: Option<&str>) {
        self.append(LogEntry::new(Utc::now(), level, message, context), None);
    }

    /// Appends `entry` and, for an error entry, escalates it.
    ///
    /// `error` is the error that caused the entry, if one was captured.
    pub fn append(&self, entry: LogEntry, error: Option<ErrorDetails>) {
        let escalate = entry.level.escalates() && self.escalation_enabled();
        let level = entry.level;
        let message = entry.message.clone();

        // Snapshot while holding the lock, submit after releasing it.
        let snapshot = {
            let mut recent = self.recent.lock();
            recent.push(entry);
            escalate.then(|| recent.snapshot())
        };

        let Some(snapshot) = snapshot else {
            return;
        };
        let Some(reporter) = self.reporter.read().clone() else {
            return;
        };

        let report = ErrorReport::new(level, message, error, snapshot).redacted();
        let report_id = report.id;
        match reporter.submit(report) {
            Ok(()) => debug!(%report_id, "error report submitted"),
            Err(e) => warn!(error = %e, "failed to submit error report"),
        }
    }

    /// Enables or disables escalation for subsequent entries.
    pub fn set_escalation_enabled(&self, enabled: bool) {
        let previous = self.escalation_enabled.swap(enabled, Ordering::SeqCst);
        if previous != enabled {
            debug!(enabled, "error reporting toggled");
        }
    }

    pub fn escalation_enabled(&self) -> bool {
        self.escalation_enabled.load(Ordering::SeqCst)
    }

    /// Installs (or replaces) the reporter that receives escalated entries.
    pub fn set_reporter(&self, reporter: Arc<dyn ErrorReporter>) {
        *self.reporter.write() = Some(reporter);
    }

    /// Removes the reporter; error entries are still recorded.
    pub fn clear_reporter(&self) {
        *self.reporter.write() = None;
    }

    /// Ordered copy of the window, oldest first.
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.recent.lock().snapshot()
    }

    pub fn len(&self) -> usize {
        self.recent.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.recent.lock().is_empty()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use confsync_core::{DEFAULT_LOG_CAPACITY, DEFAULT_LOG_WINDOW};

    /// Reporter double that keeps every report it receives.
    #[derive(Default)]
    struct RecordingReporter {
        reports: Mutex<Vec<ErrorReport>>,
    }

    impl RecordingReporter {
        fn reports(&self) -> Vec<ErrorReport> {
            self.reports.lock().clone()
        }
    }

    impl ErrorReporter for RecordingReporter {
        fn submit(&self, report: ErrorReport) -> Result<(), ReportError> {
            self.reports.lock().push(report);
            Ok(())
        }
    }

    fn make_log() -> EventLog {
        EventLog::new(DEFAULT_LOG_WINDOW, DEFAULT_LOG_CAPACITY)
    }

    // ── Escalation gating ─────────────────────────────────────────────────────

    #[test]
    fn test_error_is_escalated_with_snapshot_when_enabled() {
        // Arrange
        let log = make_log();
        let reporter = Arc::new(RecordingReporter::default());
        log.set_reporter(reporter.clone());
        log.set_escalation_enabled(true);

        // Act
        log.record(LogLevel::Info, "opened settings", None);
        log.record(LogLevel::Warn, "slow disk", None);
        log.record(LogLevel::Error, "save failed", Some("path=/tmp/x"));

        // Assert
        let reports = reporter.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].severity, LogLevel::Error);
        assert_eq!(reports[0].message, "save failed");
        let messages: Vec<&str> = reports[0].logs.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["opened settings", "slow disk", "save failed"]);
    }

    #[test]
    fn test_error_is_not_escalated_when_disabled() {
        // Arrange
        let log = make_log();
        let mut reporter = MockErrorReporter::new();
        reporter.expect_submit().never();
        log.set_reporter(Arc::new(reporter));

        // Act
        log.record(LogLevel::Error, "save failed", None);

        // Assert
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_error_without_reporter_is_only_recorded() {
        let log = make_log();
        log.set_escalation_enabled(true);
        log.record(LogLevel::Error, "nobody listening", None);
        assert_eq!(log.snapshot()[0].message, "nobody listening");
    }

    #[test]
    fn test_non_error_levels_never_escalate() {
        // Arrange
        let log = make_log();
        let mut reporter = MockErrorReporter::new();
        reporter.expect_submit().never();
        log.set_reporter(Arc::new(reporter));
        log.set_escalation_enabled(true);

        // Act
        log.record(LogLevel::Debug, "d", None);
        log.record(LogLevel::Info, "i", None);
        log.record(LogLevel::Warn, "w", None);

        // Assert
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_toggle_applies_to_subsequent_entries_only() {
        // Arrange
        let log = make_log();
        let reporter = Arc::new(RecordingReporter::default());
        log.set_reporter(reporter.clone());

        // Act
        log.record(LogLevel::Error, "before enabling", None);
        log.set_escalation_enabled(true);
        log.record(LogLevel::Error, "while enabled", None);
        log.set_escalation_enabled(false);
        log.record(LogLevel::Error, "after disabling", None);

        // Assert
        let reports = reporter.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].message, "while enabled");
    }

    #[test]
    fn test_reporter_failure_is_swallowed() {
        // Arrange
        let log = make_log();
        let mut reporter = MockErrorReporter::new();
        reporter
            .expect_submit()
            .times(1)
            .returning(|_| Err(ReportError::Unavailable("offline".to_string())));
        log.set_reporter(Arc::new(reporter));
        log.set_escalation_enabled(true);

        // Act
        log.record(LogLevel::Error, "save failed", None);

        // Assert: the entry is kept and nothing panicked
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_cleared_reporter_receives_nothing() {
        let log = make_log();
        let reporter = Arc::new(RecordingReporter::default());
        log.set_reporter(reporter.clone());
        log.set_escalation_enabled(true);
        log.clear_reporter();

        log.record(LogLevel::Error, "dropped", None);

        assert!(reporter.reports().is_empty());
    }

    // ── Report content ────────────────────────────────────────────────────────

    #[test]
    fn test_report_carries_error_details_and_is_scrubbed() {
        // Arrange
        let log = make_log();
        let reporter = Arc::new(RecordingReporter::default());
        log.set_reporter(reporter.clone());
        log.set_escalation_enabled(true);
        let details = ErrorDetails {
            message: "failed to write /home/alice/.config/confsync/gui_config.json".to_string(),
            sources: vec!["permission denied".to_string()],
        };

        // Act
        let entry = LogEntry::new(Utc::now(), LogLevel::Error, "error saving settings", None);
        log.append(entry, Some(details));

        // Assert
        let reports = reporter.reports();
        let error = reports[0].error.as_ref().expect("details attached");
        assert_eq!(
            error.message,
            "failed to write /home/***/.config/confsync/gui_config.json"
        );
        assert_eq!(error.sources, vec!["permission denied"]);
    }

    #[test]
    fn test_snapshot_in_report_is_independent_of_later_entries() {
        // Arrange
        let log = make_log();
        let reporter = Arc::new(RecordingReporter::default());
        log.set_reporter(reporter.clone());
        log.set_escalation_enabled(true);

        // Act
        log.record(LogLevel::Error, "first failure", None);
        log.record(LogLevel::Info, "later", None);

        // Assert
        assert_eq!(reporter.reports()[0].logs.len(), 1);
        assert_eq!(log.len(), 2);
    }

    // ── Bounding ──────────────────────────────────────────────────────────────

    #[test]
    fn test_log_keeps_only_capacity_most_recent_entries() {
        // Arrange
        let log = EventLog::new(Duration::from_secs(60), 3);

        // Act
        for i in 0..5 {
            log.record(LogLevel::Info, &format!("entry {i}"), None);
        }

        // Assert
        let messages: Vec<String> = log.snapshot().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["entry 2", "entry 3", "entry 4"]);
    }
}
