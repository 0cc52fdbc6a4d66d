//! Error report spool: the production [`ErrorReporter`].
//!
//! Escalated reports are written as one pretty-printed JSON file per report
//! (`<report id>.json`) into a spool directory, from where an uploader or a
//! support engineer can pick them up.
//!
//! `submit` is called from inside logging calls, so it never touches the file
//! system itself: it hands the report to a background task over an unbounded
//! channel and returns immediately.

use std::path::{Path, PathBuf};

use confsync_core::ErrorReport;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::application::event_log::{ErrorReporter, ReportError};

/// Directory name used for the spool when none is configured.
pub const DEFAULT_SPOOL_DIRNAME: &str = "reports";

/// Writes escalated reports into a spool directory.
pub struct SpoolReporter {
    reports: mpsc::UnboundedSender<ErrorReport>,
}

impl SpoolReporter {
    /// Starts the background writer.  Must be called inside a Tokio runtime.
    pub fn spawn(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let (reports, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_spool(dir, rx));
        Self { reports }
    }
}

impl ErrorReporter for SpoolReporter {
    fn submit(&self, report: ErrorReport) -> Result<(), ReportError> {
        self.reports
            .send(report)
            .map_err(|_| ReportError::Unavailable("report spool stopped".to_string()))
    }
}

async fn run_spool(dir: PathBuf, mut rx: mpsc::UnboundedReceiver<ErrorReport>) {
    while let Some(report) = rx.recv().await {
        match write_report(&dir, &report).await {
            Ok(path) => debug!(path = %path.display(), "error report spooled"),
            // Logged at warn so a broken spool can never escalate into itself.
            Err(e) => warn!(error = %e, report_id = %report.id, "failed to spool error report"),
        }
    }
}

/// Writes `report` as `<dir>/<id>.json` and returns the file path.
///
/// # Errors
///
/// Returns [`ReportError::Encode`] if serialization fails and
/// [`ReportError::Io`] for file-system failures.
pub async fn write_report(dir: &Path, report: &ErrorReport) -> Result<PathBuf, ReportError> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!("{}.json", report.id));
    let body = serde_json::to_string_pretty(report)?;
    tokio::fs::write(&path, body).await?;
    Ok(path)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
