//! UI command bridge: exposes the sync engine and event log to the UI.
//!
//! Every command function here takes the shared [`AppState`] and returns a
//! [`CommandResult`].  The desktop shell registers these as its IPC command
//! handlers; nothing in the application layer imports this module.
//!
//! # `CommandResult<T>` wrapper
//!
//! All commands return `CommandResult<T>` rather than `Result<T, E>`.
//! This ensures every command response has the same shape:
//! `{ success: bool, data: T | null, error: string | null }`.
//! The frontend can always safely access `result.success` without a
//! try/catch block around the `invoke` call.
//!
//! # Side effects of `save_config`
//!
//! Once a save has been confirmed persisted, the bridge applies the parts of
//! the *written* document that configure the host itself:
//!
//! - `error_reporting_enabled` switches escalation of error entries.
//! - A change of `auto_startup` (compared with the document the write
//!   replaced) updates the OS login-item registration.
//!
//! When several saves coalesce into one write, only the call whose document
//! was written applies these effects, so they run once per write and always
//! match what is on disk.

use std::sync::Arc;

use confsync_core::{AppConfig, LogEntry, LogLevel};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::application::event_log::EventLog;
use crate::application::sync_engine::{ConfigView, SyncEngine};
use crate::infrastructure::autostart::AutoStart;

/// `tracing` target of messages forwarded from the UI.
pub const UI_LOG_TARGET: &str = "confsync::ui";

// ── Shared application state ──────────────────────────────────────────────────

/// Application state shared between command handlers.
pub struct AppState {
    pub engine: SyncEngine,
    pub event_log: Arc<EventLog>,
    pub autostart: Box<dyn AutoStart>,
}

impl AppState {
    pub fn new(engine: SyncEngine, event_log: Arc<EventLog>, autostart: Box<dyn AutoStart>) -> Arc<Self> {
        Arc::new(Self {
            engine,
            event_log,
            autostart,
        })
    }

    /// Makes the host-level settings of a persisted `config` take effect.
    fn apply_host_settings(&self, previous: &AppConfig, config: &AppConfig) {
        self.event_log
            .set_escalation_enabled(config.error_reporting_enabled);

        if previous.auto_startup != config.auto_startup {
            if let Err(e) = self.autostart.sync(config.auto_startup) {
                warn!(error = %e, enabled = config.auto_startup, "failed to update autostart registration");
            }
        }
    }
}

/// Unified response wrapper used by UI commands.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResult<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> CommandResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

/// Returns the document the UI should display.
///
/// This is the optimistic view when one exists.  When the view is stale (a
/// save failed with nothing to fall back to) the document is reloaded.
///
/// # Example (frontend)
/// ```ts
/// const config = await invoke<AppConfig>('load_config');
/// ```
pub async fn load_config(state: Arc<AppState>) -> CommandResult<AppConfig> {
    let config = match state.engine.view() {
        ConfigView::Current(config) => (*config).clone(),
        ConfigView::Stale => {
            debug!("config view is stale, reloading");
            state.engine.load().await
        }
    };
    CommandResult::ok(config)
}

/// Saves `config` and resolves once the write covering it has settled.
///
/// The view is updated immediately, so a `load_config` issued while this is
/// still pending already sees `config`.
pub async fn save_config(state: Arc<AppState>, config: AppConfig) -> CommandResult<()> {
    // Establish a known-good baseline so the first write has something to
    // compare `auto_startup` against.
    if state.engine.known_good().is_none() {
        state.engine.load().await;
    }

    match state.engine.request_save(config).await {
        Ok(receipt) => {
            if receipt.own_document_written() {
                let previous = receipt.previous().cloned().unwrap_or_default();
                state.apply_host_settings(&previous, receipt.document());
            }
            CommandResult::ok(())
        }
        Err(e) => CommandResult::err(e.to_string()),
    }
}

/// Returns whether a write is currently in progress.
pub async fn is_saving(state: Arc<AppState>) -> CommandResult<bool> {
    CommandResult::ok(state.engine.is_saving())
}

/// Returns the recent-activity window, oldest first.
pub async fn get_recent_logs(state: Arc<AppState>) -> CommandResult<Vec<LogEntry>> {
    CommandResult::ok(state.event_log.snapshot())
}

/// Forwards a log line from the UI into the host's log pipeline.
///
/// `level` is one of `debug`, `info`, `warn` (or `warning`) and `error`.
pub async fn log_message(_state: Arc<AppState>, level: String, message: String) -> CommandResult<()> {
    let Some(level) = parse_level(&level) else {
        return CommandResult::err(format!("unknown log level: {level}"));
    };

    match level {
        LogLevel::Debug => debug!(target: UI_LOG_TARGET, "{message}"),
        LogLevel::Info => info!(target: UI_LOG_TARGET, "{message}"),
        LogLevel::Warn => warn!(target: UI_LOG_TARGET, "{message}"),
        LogLevel::Error => error!(target: UI_LOG_TARGET, "{message}"),
    }
    CommandResult::ok(())
}

/// Enables or disables escalation of error entries without saving.
pub async fn set_error_reporting(state: Arc<AppState>, enabled: bool) -> CommandResult<()> {
    state.event_log.set_escalation_enabled(enabled);
    CommandResult::ok(())
}

fn parse_level(level: &str) -> Option<LogLevel> {
    match level.trim().to_ascii_lowercase().as_str() {
        "debug" => Some(LogLevel::Debug),
        "info" => Some(LogLevel::Info),
        "warn" | "warning" => Some(LogLevel::Warn),
        "error" => Some(LogLevel::Error),
        _ => None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
