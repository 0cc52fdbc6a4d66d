//! OS login-item registration, driven by the `auto_startup` setting.
//!
//! - Linux: an XDG autostart entry `confsync.desktop` in
//!   `$XDG_CONFIG_HOME/autostart` (or `~/.config/autostart`).
//! - Other platforms: not supported yet; [`platform_autostart`] returns an
//!   implementation that reports [`AutoStartError::Unsupported`].

use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

/// File name of the XDG autostart entry.
pub const DESKTOP_ENTRY_FILENAME: &str = "confsync.desktop";

/// Error type for autostart registration.
#[derive(Debug, Error)]
pub enum AutoStartError {
    #[error("autostart registration is not supported on this platform")]
    Unsupported,

    #[error("could not determine the autostart directory")]
    NoAutostartDir,

    #[error("I/O error updating autostart entry at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Registers or unregisters the application as a login item.
pub trait AutoStart: Send + Sync {
    /// Makes the registration match `enabled`.  Idempotent.
    fn sync(&self, enabled: bool) -> Result<(), AutoStartError>;
}

/// Returns the autostart implementation for the running platform.
pub fn platform_autostart() -> Box<dyn AutoStart> {
    #[cfg(target_os = "linux")]
    {
        match (XdgAutoStart::default_dir(), std::env::current_exe()) {
            (Some(dir), Ok(exec)) => Box::new(XdgAutoStart::new(dir, exec)),
            _ => Box::new(UnsupportedAutoStart),
        }
    }

    #[cfg(not(target_os = "linux"))]
    {
        Box::new(UnsupportedAutoStart)
    }
}

/// Placeholder for platforms without an implementation.
pub struct UnsupportedAutoStart;

impl AutoStart for UnsupportedAutoStart {
    fn sync(&self, _enabled: bool) -> Result<(), AutoStartError> {
        Err(AutoStartError::Unsupported)
    }
}

/// XDG autostart entry writer.
pub struct XdgAutoStart {
    dir: PathBuf,
    exec: PathBuf,
}

impl XdgAutoStart {
    pub fn new(dir: impl Into<PathBuf>, exec: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            exec: exec.into(),
        }
    }

    /// `$XDG_CONFIG_HOME/autostart`, or `~/.config/autostart`.
    pub fn default_dir() -> Option<PathBuf> {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("autostart"))
    }

    pub fn entry_path(&self) -> PathBuf {
        self.dir.join(DESKTOP_ENTRY_FILENAME)
    }

    fn desktop_entry(&self) -> String {
        format!(
            "[Desktop Entry]\n\
             Type=Application\n\
             Name=Confsync\n\
             Exec=\"{}\"\n\
             X-GNOME-Autostart-enabled=true\n",
            self.exec.display()
        )
    }
}

impl AutoStart for XdgAutoStart {
    fn sync(&self, enabled: bool) -> Result<(), AutoStartError> {
        let path = self.entry_path();
        let io_error = |source| AutoStartError::Io {
            path: path.clone(),
            source,
        };

        if enabled {
            std::fs::create_dir_all(&self.dir).map_err(io_error)?;
            std::fs::write(&path, self.desktop_entry()).map_err(io_error)?;
            info!(path = %path.display(), "autostart entry installed");
        } else {
            match std::fs::remove_file(&path) {
                Ok(()) => info!(path = %path.display(), "autostart entry removed"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(io_error(e)),
            }
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
