//! Runtime settings of the host process itself (not the user's document).
//!
//! Read from an optional `confsync.toml`:
//!
//! ```toml
//! data_dir = "/var/lib/confsync"
//! debounce_ms = 400
//! log_window_secs = 30
//! max_log_entries = 200
//! log_filter = "info,confsync_host=debug"
//! report_dir = "/var/lib/confsync/reports"
//! ```
//!
//! Every field is optional and falls back to its default, so an empty file
//! (or no file at all) gives a working setup.  CLI flags are applied on top
//! in `main`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use confsync_core::{DEFAULT_LOG_CAPACITY, DEFAULT_LOG_WINDOW};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::sync_engine::DEFAULT_SAVE_DEBOUNCE;

/// Error type for the host settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("I/O error reading settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Host process settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSettings {
    /// Directory holding `gui_config.json` and `app.log`.  `None` selects the
    /// platform application-data directory.
    pub data_dir: Option<PathBuf>,
    /// Debounce window of the sync engine in milliseconds.
    pub debounce_ms: u64,
    /// Age limit of the recent-activity window in seconds.
    pub log_window_secs: u64,
    /// Count limit of the recent-activity window.
    pub max_log_entries: usize,
    /// `tracing` filter directive; `RUST_LOG` takes precedence.
    pub log_filter: String,
    /// Spool directory for error reports.  `None` selects `<data_dir>/reports`.
    pub report_dir: Option<PathBuf>,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            data_dir: None,
            debounce_ms: DEFAULT_SAVE_DEBOUNCE.as_millis() as u64,
            log_window_secs: DEFAULT_LOG_WINDOW.as_secs(),
            max_log_entries: DEFAULT_LOG_CAPACITY,
            log_filter: "info".to_string(),
            report_dir: None,
        }
    }
}

impl HostSettings {
    /// Parses settings from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(text)?)
    }

    /// Loads settings from `path`, returning defaults if the file does not
    /// exist.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Io`] for file-system errors other than "not
    /// found", and [`SettingsError::Parse`] if the TOML is malformed.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(SettingsError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn log_window(&self) -> Duration {
        Duration::from_secs(self.log_window_secs)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
