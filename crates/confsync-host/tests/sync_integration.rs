//! Integration tests for the configuration sync pipeline.
//!
//! These tests run the real stack against a temporary directory: the sync
//! engine, the write serializer, the durable store and the JSON file backend,
//! plus the UI bridge commands on top.  Real time is used with a short
//! debounce window.

use std::sync::Arc;
use std::time::Duration;

use confsync_core::{AppConfig, LogLevel, UpstreamProxyConfig};
use confsync_host::application::event_log::EventLog;
use confsync_host::application::store::DurableStore;
use confsync_host::application::sync_engine::SyncEngine;
use confsync_host::application::write_serializer::WriteSerializer;
use confsync_host::infrastructure::autostart::UnsupportedAutoStart;
use confsync_host::infrastructure::storage::json_file::{JsonFileBackend, CONFIG_FILENAME};
use confsync_host::infrastructure::ui_bridge::{self, AppState};

const TEST_DEBOUNCE: Duration = Duration::from_millis(40);

fn engine_in(dir: &std::path::Path) -> SyncEngine {
    let store = DurableStore::new(JsonFileBackend::in_dir(dir));
    SyncEngine::with_debounce(WriteSerializer::spawn(store), TEST_DEBOUNCE)
}

fn read_json(dir: &std::path::Path) -> serde_json::Value {
    let text = std::fs::read_to_string(dir.join(CONFIG_FILENAME)).expect("config file exists");
    serde_json::from_str(&text).expect("valid json")
}

#[tokio::test]
async fn test_partial_file_on_disk_is_merged_with_defaults() {
    // Arrange: an older build only wrote the upstream host
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(
        dir.path().join(CONFIG_FILENAME),
        r#"{ "proxy": { "upstream_proxy": { "host": "x" } } }"#,
    )
    .expect("seed file");
    let engine = engine_in(dir.path());

    // Act
    let cfg = engine.load().await;

    // Assert
    assert_eq!(cfg.theme, "light");
    assert_eq!(cfg.proxy.port, 8080);
    let upstream = cfg.proxy.upstream_proxy.expect("upstream");
    assert_eq!(upstream.host, "x");
    assert_eq!(upstream.port, UpstreamProxyConfig::default().port);
}

#[tokio::test]
async fn test_burst_of_edits_lands_on_disk_as_last_document() {
    // Arrange
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = engine_in(dir.path());
    engine.load().await;

    // Act
    let handles: Vec<_> = ["a", "b", "c", "d"]
        .iter()
        .map(|theme| {
            engine.request_save(AppConfig {
                theme: theme.to_string(),
                ..AppConfig::default()
            })
        })
        .collect();
    for handle in handles {
        handle.await.expect("save");
    }

    // Assert
    assert_eq!(read_json(dir.path())["theme"], "d");
    assert_eq!(engine.known_good().expect("known good").theme, "d");
}

#[tokio::test]
async fn test_saved_document_survives_restart() {
    // Arrange
    let dir = tempfile::tempdir().expect("tempdir");
    let mut cfg = AppConfig::default();
    cfg.language = "ja".to_string();
    cfg.proxy.api_key = "sk-test".to_string();

    // Act
    {
        let engine = engine_in(dir.path());
        engine.load().await;
        let handle = engine.request_save(cfg.clone());
        engine.shutdown().await;
        handle.await.expect("flushed on shutdown");
    }
    let reloaded = engine_in(dir.path()).load().await;

    // Assert
    assert_eq!(reloaded, cfg);
}

#[tokio::test]
async fn test_write_failure_rolls_back_view_through_bridge() {
    // Arrange: the data "directory" is a regular file, so every write fails
    let dir = tempfile::tempdir().expect("tempdir");
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "not a directory").expect("write blocker");
    let engine = engine_in(&blocker);
    let loaded = engine.load().await;
    let state = AppState::new(
        engine,
        Arc::new(EventLog::new(Duration::from_secs(30), 200)),
        Box::new(UnsupportedAutoStart),
    );
    let mut edited = loaded.clone();
    edited.theme = "dark".to_string();

    // Act
    let result = ui_bridge::save_config(Arc::clone(&state), edited).await;

    // Assert
    assert!(!result.success);
    let view = ui_bridge::load_config(Arc::clone(&state)).await;
    assert_eq!(view.data, Some(loaded));
}

#[tokio::test]
async fn test_bridge_round_trip_with_logs() {
    // Arrange
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = engine_in(dir.path());
    engine.load().await;
    let event_log = Arc::new(EventLog::new(Duration::from_secs(30), 200));
    let state = AppState::new(engine, Arc::clone(&event_log), Box::new(UnsupportedAutoStart));
    event_log.record(LogLevel::Info, "settings window opened", None);

    // Act
    let mut cfg = AppConfig::default();
    cfg.refresh_interval = 60;
    let saved = ui_bridge::save_config(Arc::clone(&state), cfg).await;
    let loaded = ui_bridge::load_config(Arc::clone(&state)).await;
    let logs = ui_bridge::get_recent_logs(Arc::clone(&state)).await;
    let saving = ui_bridge::is_saving(Arc::clone(&state)).await;

    // Assert
    assert!(saved.success);
    assert_eq!(loaded.data.map(|c| c.refresh_interval), Some(60));
    assert_eq!(read_json(dir.path())["refresh_interval"], 60);
    assert_eq!(logs.data.map(|l| l.len()), Some(1));
    assert_eq!(saving.data, Some(false));
}
