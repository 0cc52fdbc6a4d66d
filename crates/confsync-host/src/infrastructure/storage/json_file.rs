//! JSON file backend for the configuration document.
//!
//! The document lives in `gui_config.json` inside the platform-appropriate
//! application-data directory:
//! - Windows:  `%APPDATA%\Confsync\gui_config.json`
//! - Linux:    `$XDG_CONFIG_HOME/confsync/gui_config.json` (or `~/.config/confsync`)
//! - macOS:    `~/Library/Application Support/Confsync/gui_config.json`
//!
//! # Whole-file replacement (for beginners)
//!
//! Writing straight into the target file leaves a truncated document behind
//! if the process dies halfway through.  Instead the new text is written to a
//! sibling temporary file which is then renamed over the target.  A rename
//! within one directory is atomic on every supported platform, so a reader
//! sees either the old document or the new one, never a mix.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::trace;

use crate::application::store::{DocumentBackend, StoreError};

/// File name of the persisted document.
pub const CONFIG_FILENAME: &str = "gui_config.json";

const TEMP_SUFFIX: &str = ".tmp";

/// Determines the platform-appropriate application-data directory.
///
/// # Errors
///
/// Returns [`StoreError::NoPlatformDataDir`] when the base directory cannot
/// be determined from the environment.
pub fn data_dir() -> Result<PathBuf, StoreError> {
    platform_data_dir().ok_or(StoreError::NoPlatformDataDir)
}

/// A [`DocumentBackend`] backed by one JSON file on disk.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    /// Uses `gui_config.json` inside `dir`.  The directory is created on the
    /// first write.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(CONFIG_FILENAME),
        }
    }

    /// Uses `gui_config.json` inside the platform application-data directory.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoPlatformDataDir`] if the base directory cannot
    /// be determined.
    pub fn platform_default() -> Result<Self, StoreError> {
        Ok(Self::in_dir(data_dir()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(TEMP_SUFFIX);
        PathBuf::from(name)
    }
}

#[async_trait]
impl DocumentBackend for JsonFileBackend {
    async fn read(&self) -> Result<Option<String>, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    async fn write(&self, contents: &str) -> Result<(), StoreError> {
        // Ensure directory exists before writing.
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| StoreError::Io {
                    path: dir.to_path_buf(),
                    source,
                })?;
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, contents)
            .await
            .map_err(|source| StoreError::Io {
                path: temp.clone(),
                source,
            })?;

        if let Err(source) = tokio::fs::rename(&temp, &self.path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(StoreError::Io {
                path: self.path.clone(),
                source,
            });
        }

        trace!(path = %self.path.display(), bytes = contents.len(), "config file replaced");
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Resolves the platform application-data directory including the
/// `Confsync` subdirectory.
fn platform_data_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        // %APPDATA% e.g. C:\Users\<user>\AppData\Roaming
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("Confsync"))
    }

    #[cfg(target_os = "linux")]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("confsync"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("Confsync")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
