//! Confsync host entry point.
//!
//! Wires the configuration synchronization services together, then runs until
//! Ctrl-C, at which point any pending save is flushed before exiting.
//!
//! # Usage
//!
//! ```text
//! confsync-host [OPTIONS]
//!
//! Options:
//!   --settings    <PATH>  Host settings file [default: <data dir>/confsync.toml]
//!   --data-dir    <DIR>   Directory holding gui_config.json and app.log
//!   --debounce-ms <MS>    Save debounce window in milliseconds
//!   --log-filter  <FILTER> tracing filter directive (RUST_LOG wins)
//! ```
//!
//! Every option can also be set through the environment variable listed in
//! `--help`.  CLI args take precedence over the settings file.
//!
//! # Embedding
//!
//! The binary itself runs headless.  A desktop shell that embeds
//! `confsync_host` as a library registers the `ui_bridge` commands against
//! the [`AppState`] built here; the IPC transport between that shell and its
//! UI process lives outside this crate.  On its own, the binary keeps the
//! engine, logging and reporting alive and flushes on exit.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ HostSettings          -- confsync.toml + CLI overrides
//!  └─ EventLog + tracing    -- console, app.log, recent-activity window
//!  └─ SpoolReporter         -- escalated error reports
//!  └─ SyncEngine
//!       └─ WriteSerializer  -- single writer task
//!            └─ DurableStore<JsonFileBackend>
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use confsync_host::application::event_log::EventLog;
use confsync_host::application::store::DurableStore;
use confsync_host::application::sync_engine::SyncEngine;
use confsync_host::application::write_serializer::WriteSerializer;
use confsync_host::infrastructure::autostart::platform_autostart;
use confsync_host::infrastructure::logging::init_tracing;
use confsync_host::infrastructure::reporting::{SpoolReporter, DEFAULT_SPOOL_DIRNAME};
use confsync_host::infrastructure::settings::HostSettings;
use confsync_host::infrastructure::storage::json_file::{self, JsonFileBackend};
use confsync_host::infrastructure::ui_bridge::AppState;

/// File name of the host settings file inside the data directory.
const SETTINGS_FILENAME: &str = "confsync.toml";

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Confsync configuration synchronization host.
#[derive(Debug, Parser)]
#[command(
    name = "confsync-host",
    about = "Keeps the confsync settings document in sync with disk",
    version
)]
struct Cli {
    /// Host settings file.
    #[arg(long, env = "CONFSYNC_SETTINGS")]
    settings: Option<PathBuf>,

    /// Directory holding gui_config.json and app.log.
    ///
    /// Defaults to the platform application-data directory.
    #[arg(long, env = "CONFSYNC_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Save debounce window in milliseconds.
    #[arg(long, env = "CONFSYNC_DEBOUNCE_MS")]
    debounce_ms: Option<u64>,

    /// `tracing` filter directive, e.g. `info,confsync_host=debug`.
    #[arg(long, env = "CONFSYNC_LOG")]
    log_filter: Option<String>,
}

impl Cli {
    /// Loads the settings file and applies CLI overrides on top.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file exists but cannot be read or
    /// parsed.
    fn into_settings(self) -> anyhow::Result<HostSettings> {
        let path = match self.settings {
            Some(path) => Some(path),
            None => self
                .data_dir
                .clone()
                .or_else(|| json_file::data_dir().ok())
                .map(|dir| dir.join(SETTINGS_FILENAME)),
        };

        let mut settings = match &path {
            Some(path) => HostSettings::load(path)
                .with_context(|| format!("invalid settings file '{}'", path.display()))?,
            None => HostSettings::default(),
        };

        if let Some(dir) = self.data_dir {
            settings.data_dir = Some(dir);
        }
        if let Some(ms) = self.debounce_ms {
            settings.debounce_ms = ms;
        }
        if let Some(filter) = self.log_filter {
            settings.log_filter = filter;
        }
        Ok(settings)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Cli::parse().into_settings()?;

    let data_dir = match settings.data_dir.clone() {
        Some(dir) => dir,
        None => json_file::data_dir().context("no --data-dir given")?,
    };

    // ── Logging setup ─────────────────────────────────────────────────────────
    let event_log = Arc::new(EventLog::new(settings.log_window(), settings.max_log_entries));
    let _log_guard = init_tracing(&settings.log_filter, Some(&data_dir), Arc::clone(&event_log))?;

    info!(data_dir = %data_dir.display(), "confsync host starting");

    let report_dir = settings
        .report_dir
        .clone()
        .unwrap_or_else(|| data_dir.join(DEFAULT_SPOOL_DIRNAME));
    event_log.set_reporter(Arc::new(SpoolReporter::spawn(report_dir)));

    // ── Sync engine ───────────────────────────────────────────────────────────
    let store = DurableStore::new(JsonFileBackend::in_dir(&data_dir));
    let engine = SyncEngine::with_debounce(WriteSerializer::spawn(store), settings.debounce());

    // Escalation stays off until the user has opted in.
    let config = engine.load().await;
    event_log.set_escalation_enabled(config.error_reporting_enabled);

    // Command surface for an embedding shell.
    let state = AppState::new(engine, Arc::clone(&event_log), platform_autostart());

    info!("confsync host ready.  Press Ctrl-C to exit.");

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for Ctrl-C signal");
    }

    info!("shutdown signal received, flushing pending settings");
    state.engine.shutdown().await;

    info!("confsync host stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
