//! Logging infrastructure: `tracing` subscriber setup and the bridge that
//! feeds every event into the [`EventLog`].
//!
//! # How log lines reach the event log (for beginners)
//!
//! Components never talk to the event log directly.  They call the ordinary
//! `tracing` macros (`info!`, `error!`, ...).  The subscriber installed by
//! [`init_tracing`] fans each event out to three layers, each with its own
//! filter:
//!
//! ```text
//!            ┌──► EnvFilter ──► console (fmt layer, stderr)
//! error!(..) ┼──► EnvFilter ──► app.log  (fmt layer, non-blocking file writer)
//!            └──► DEBUG ──────► EventLogLayer ──► EventLog::append
//! ```
//!
//! The configured filter (or `RUST_LOG`) only limits what is printed.  The
//! recent-activity window always records every level down to `DEBUG`, so an
//! error report carries its full context regardless of console verbosity.
//!
//! [`EventLogLayer`] turns the event's fields into a [`LogEntry`]: the
//! `message` field becomes the entry message, every other field is rendered
//! as `key=value` context, and a field named `error` is also captured as
//! [`ErrorDetails`] for the error report.

use std::fmt::{self, Write as _};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use confsync_core::{ErrorDetails, LogEntry, LogLevel};
use thiserror::Error;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::application::event_log::EventLog;

/// File name of the plain-text log written next to the config document.
pub const LOG_FILENAME: &str = "app.log";

const ERROR_FIELD: &str = "error";
const MESSAGE_FIELD: &str = "message";

/// Error type for installing the global subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to open log file {path}: {source}")]
    OpenLogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("a global tracing subscriber is already installed: {0}")]
    AlreadyInstalled(#[from] tracing_subscriber::util::TryInitError),
}

/// Installs the global subscriber.
///
/// `filter` is used unless `RUST_LOG` is set.  When `log_dir` is given, a
/// plain-text copy of the log is appended to `app.log` inside it.
///
/// The returned guard must be kept alive for the lifetime of the process;
/// dropping it flushes and stops the file writer.
///
/// # Errors
///
/// Returns [`LoggingError::OpenLogFile`] if the log file cannot be opened and
/// [`LoggingError::AlreadyInstalled`] if a subscriber was installed earlier.
pub fn init_tracing(
    filter: &str,
    log_dir: Option<&Path>,
    event_log: Arc<EventLog>,
) -> Result<Option<WorkerGuard>, LoggingError> {
    let (file_writer, guard) = match log_dir {
        Some(dir) => {
            let (writer, guard) = tracing_appender::non_blocking(open_log_file(dir)?);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    build_subscriber(filter, file_writer, event_log).try_init()?;
    Ok(guard)
}

/// Assembles the layered subscriber without installing it.
///
/// `filter` (or `RUST_LOG`) applies to the console and file layers only; the
/// event log layer sees every event down to `DEBUG`.
pub fn build_subscriber(
    filter: &str,
    file_writer: Option<NonBlocking>,
    event_log: Arc<EventLog>,
) -> impl Subscriber + Send + Sync + 'static {
    let file_layer = file_writer.map(|writer| {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(writer)
            .with_filter(output_filter(filter))
    });

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(output_filter(filter)),
        )
        .with(file_layer)
        .with(EventLogLayer::new(event_log).with_filter(LevelFilter::DEBUG))
}

/// `RUST_LOG` when set, otherwise `filter`, otherwise `info`.
fn output_filter(filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

fn open_log_file(dir: &Path) -> Result<std::fs::File, LoggingError> {
    let path = dir.join(LOG_FILENAME);
    std::fs::create_dir_all(dir)
        .and_then(|()| OpenOptions::new().create(true).append(true).open(&path))
        .map_err(|source| LoggingError::OpenLogFile { path, source })
}

// ── EventLogLayer ─────────────────────────────────────────────────────────────

/// A [`Layer`] that appends every event it sees to an [`EventLog`].
pub struct EventLogLayer {
    log: Arc<EventLog>,
}

impl EventLogLayer {
    pub fn new(log: Arc<EventLog>) -> Self {
        Self { log }
    }
}

impl<S: Subscriber> Layer<S> for EventLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = EntryVisitor::default();
        event.record(&mut visitor);

        let level = level_of(event.metadata().level());
        let context = (!visitor.context.is_empty()).then_some(visitor.context.as_str());
        let entry = LogEntry::new(Utc::now(), level, visitor.message, context);
        self.log.append(entry, visitor.error);
    }
}

/// `TRACE` has no counterpart in the event log and is folded into `Debug`.
fn level_of(level: &Level) -> LogLevel {
    match *level {
        Level::ERROR => LogLevel::Error,
        Level::WARN => LogLevel::Warn,
        Level::INFO => LogLevel::Info,
        Level::DEBUG | Level::TRACE => LogLevel::Debug,
    }
}

#[derive(Default)]
struct EntryVisitor {
    message: String,
    context: String,
    error: Option<ErrorDetails>,
}

impl EntryVisitor {
    fn push_context(&mut self, field: &Field, value: fmt::Arguments<'_>) {
        if !self.context.is_empty() {
            self.context.push(' ');
        }
        let _ = write!(self.context, "{}={}", field.name(), value);
    }
}

impl Visit for EntryVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == MESSAGE_FIELD {
            self.message = value.to_string();
            return;
        }
        if field.name() == ERROR_FIELD && self.error.is_none() {
            self.error = Some(ErrorDetails::new(value));
        }
        self.push_context(field, format_args!("{value}"));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.error = Some(ErrorDetails::from_error(value));
        self.push_context(field, format_args!("{value}"));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == MESSAGE_FIELD {
            self.message = format!("{value:?}");
            return;
        }
        let rendered = format!("{value:?}");
        if field.name() == ERROR_FIELD && self.error.is_none() {
            self.error = Some(ErrorDetails::new(rendered.clone()));
        }
        self.push_context(field, format_args!("{rendered}"));
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
