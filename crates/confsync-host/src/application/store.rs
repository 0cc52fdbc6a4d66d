//! DurableStore: reads and writes the configuration document.
//!
//! The store sits on top of a [`DocumentBackend`] (the raw persistent medium)
//! and owns the document-level rules:
//!
//! - **Loading never fails.**  A missing file, an unreadable file and a file
//!   that is not valid JSON all produce the default document.  Anything that
//!   is parsed is merged over the defaults (see
//!   [`confsync_core::merge_with_defaults`]).
//! - **Saving replaces the whole file** with pretty-printed JSON.
//! - **The last loaded or saved document is cached** and can be read without
//!   touching the backend.
//!
//! The store performs no ordering of its own.  It is owned exclusively by the
//! [`super::write_serializer::WriteSerializer`] worker, which is what
//! guarantees one write at a time.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use confsync_core::{parse_document, AppConfig};
use parking_lot::RwLock;
use thiserror::Error;
use tracing::{error, info};

/// Error type for persistence operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The platform application-data directory could not be determined.
    #[error("could not determine platform application-data directory")]
    NoPlatformDataDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document could not be serialized to JSON.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The raw persistent medium behind a [`DurableStore`].
///
/// Infrastructure implementations write a JSON file; tests use an in-memory
/// backend with failure injection.
#[async_trait]
pub trait DocumentBackend: Send + Sync + 'static {
    /// Returns the persisted text, or `None` when nothing has been persisted.
    async fn read(&self) -> Result<Option<String>, StoreError>;

    /// Replaces the persisted text entirely.
    async fn write(&self, contents: &str) -> Result<(), StoreError>;

    /// Human-readable location used in log lines.
    fn location(&self) -> String;
}

/// Last successfully loaded or saved document, shared with readers.
pub type SharedCache = Arc<RwLock<Option<AppConfig>>>;

/// Document-level persistence over a [`DocumentBackend`].
pub struct DurableStore<B> {
    backend: B,
    cache: SharedCache,
}

impl<B: DocumentBackend> DurableStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Returns a handle to the cache that stays valid after the store is
    /// moved into its worker.
    pub fn cache(&self) -> SharedCache {
        Arc::clone(&self.cache)
    }

    /// Returns the cached document without any I/O.
    pub fn cached(&self) -> Option<AppConfig> {
        self.cache.read().clone()
    }

    /// Loads the document, falling back to defaults on any failure.
    pub async fn load(&self) -> AppConfig {
        let location = self.backend.location();
        let config = match self.backend.read().await {
            Ok(None) => {
                info!(%location, "config file not found, using defaults");
                AppConfig::default()
            }
            Ok(Some(text)) => match parse_document(&text) {
                Ok(config) => config,
                Err(e) => {
                    error!(%location, error = %e, "failed to load config, using defaults");
                    AppConfig::default()
                }
            },
            Err(e) => {
                error!(%location, error = %e, "failed to load config, using defaults");
                AppConfig::default()
            }
        };

        *self.cache.write() = Some(config.clone());
        config
    }

    /// Persists `config`, replacing the previous content entirely.
    ///
    /// The cache is only updated once the backend write succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Serialize`] if encoding fails and whatever the
    /// backend reports for the write itself.
    pub async fn save(&self, config: &AppConfig) -> Result<(), StoreError> {
        let contents = serde_json::to_string_pretty(config)?;
        self.backend.write(&contents).await?;
        *self.cache.write() = Some(config.clone());
        info!(location = %self.backend.location(), "config saved");
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::memory::MemoryBackend;

    #[tokio::test]
    async fn test_load_returns_defaults_when_nothing_persisted() {
        // Arrange
        let store = DurableStore::new(MemoryBackend::new());

        // Act
        let config = store.load().await;

        // Assert
        assert_eq!(config, AppConfig::default());
        assert_eq!(store.cached(), Some(AppConfig::default()));
    }

    #[tokio::test]
    async fn test_load_merges_partial_document_over_defaults() {
        // Arrange
        let backend = MemoryBackend::with_contents(r#"{ "proxy": { "upstream_proxy": { "host": "x" } } }"#);
        let store = DurableStore::new(backend);

        // Act
        let config = store.load().await;

        // Assert
        assert_eq!(config.theme, "light");
        assert_eq!(config.proxy.port, 8080);
        assert_eq!(config.proxy.upstream_proxy.expect("upstream").host, "x");
    }

    #[tokio::test]
    async fn test_load_treats_corrupt_document_as_absent() {
        let store = DurableStore::new(MemoryBackend::with_contents("{{{ definitely not json"));
        assert_eq!(store.load().await, AppConfig::default());
    }

    #[tokio::test]
    async fn test_load_treats_read_failure_as_absent() {
        // Arrange
        let backend = MemoryBackend::with_contents(r#"{ "theme": "dark" }"#);
        backend.fail_reads(true);
        let store = DurableStore::new(backend);

        // Act / Assert
        assert_eq!(store.load().await, AppConfig::default());
    }

    #[tokio::test]
    async fn test_save_writes_pretty_json_and_updates_cache() {
        // Arrange
        let backend = MemoryBackend::new();
        let store = DurableStore::new(backend.clone());
        let mut config = AppConfig::default();
        config.theme = "dark".to_string();

        // Act
        store.save(&config).await.expect("save");

        // Assert
        let written = backend.contents().expect("written");
        assert!(written.contains("\n  \"theme\": \"dark\""), "expected pretty JSON, got {written}");
        assert_eq!(store.cached(), Some(config));
    }

    #[tokio::test]
    async fn test_failed_save_keeps_previous_cache() {
        // Arrange
        let backend = MemoryBackend::new();
        let store = DurableStore::new(backend.clone());
        store.load().await;
        backend.fail_next_writes(1);
        let mut config = AppConfig::default();
        config.language = "ru".to_string();

        // Act
        let result = store.save(&config).await;

        // Assert
        assert!(matches!(result, Err(StoreError::Io { .. })));
        assert_eq!(store.cached(), Some(AppConfig::default()));
    }
}
