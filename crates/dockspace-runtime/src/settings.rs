//! Settings collaborator: where the raw persisted layout lives.
//!
//! The orchestrator only needs two values, so hosts with their own settings
//! store implement [`LayoutSettings`]. [`WorkspaceSettings`] is a JSON-file
//! backed implementation used by default.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Read/write access to the persisted dock layout.
pub trait LayoutSettings {
    /// Raw persisted layout text, if one was saved.
    fn dock_layout(&self) -> Option<&str>;

    fn set_dock_layout(&mut self, layout: Option<String>);

    /// When true, restore is skipped and the default layout is always built.
    fn use_default_dock_layout_only(&self) -> bool;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceSettings {
    pub dock_layout: Option<String>,
    pub use_default_dock_layout_only: bool,
}

impl LayoutSettings for WorkspaceSettings {
    fn dock_layout(&self) -> Option<&str> {
        self.dock_layout.as_deref()
    }

    fn set_dock_layout(&mut self, layout: Option<String>) {
        self.dock_layout = layout;
    }

    fn use_default_dock_layout_only(&self) -> bool {
        self.use_default_dock_layout_only
    }
}

impl WorkspaceSettings {
    /// Load from a JSON file. A missing file yields default settings.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!(
                    target: "dockspace.settings",
                    path = %path.display(),
                    "settings file missing, using defaults"
                );
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(SettingsError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Ok(serde_json::from_str(&text)?)
    }

    /// Write as pretty JSON, replacing any existing file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Read a persisted layout, giving up after `timeout`.
///
/// The read runs on a helper thread; on timeout the thread is abandoned and
/// its result discarded.
pub fn read_with_timeout(path: impl AsRef<Path>, timeout: Duration) -> Result<String, SettingsError> {
    let path = path.as_ref().to_path_buf();
    let (tx, rx) = mpsc::channel();
    let reader_path = path.clone();
    thread::Builder::new()
        .name("dockspace-layout-read".into())
        .spawn(move || {
            let _ = tx.send(std::fs::read_to_string(&reader_path));
        })
        .map_err(|source| SettingsError::Io {
            path: path.clone(),
            source,
        })?;
    match rx.recv_timeout(timeout) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(source)) => Err(SettingsError::Io { path, source }),
        Err(_) => {
            tracing::warn!(
                target: "dockspace.settings",
                path = %path.display(),
                ?timeout,
                "layout read timed out"
            );
            Err(SettingsError::TimedOut { timeout })
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed settings: {0}")]
    Json(#[from] serde_json::Error),
    #[error("read timed out after {timeout:?}")]
    TimedOut { timeout: Duration },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let settings = WorkspaceSettings::load(dir.path().join("settings.json")).expect("load");
        assert_eq!(settings, WorkspaceSettings::default());
        assert!(settings.dock_layout().is_none());
        assert!(!settings.use_default_dock_layout_only());
    }

    #[test]
    fn save_then_load_keeps_values() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("settings.json");
        let mut settings = WorkspaceSettings::default();
        settings.set_dock_layout(Some("{\"format_version\":1}".into()));
        settings.use_default_dock_layout_only = true;
        settings.save(&path).expect("save");

        let loaded = WorkspaceSettings::load(&path).expect("load");
        assert_eq!(loaded, settings);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").expect("write");
        assert!(matches!(
            WorkspaceSettings::load(&path),
            Err(SettingsError::Json(_))
        ));
    }

    #[test]
    fn bounded_read_returns_contents() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("layout.json");
        std::fs::write(&path, "layout").expect("write");
        let text = read_with_timeout(&path, Duration::from_secs(5)).expect("read");
        assert_eq!(text, "layout");
        assert!(matches!(
            read_with_timeout(dir.path().join("absent"), Duration::from_secs(5)),
            Err(SettingsError::Io { .. })
        ));
    }

    /// A FIFO with no writer blocks `open`, so the read never completes.
    #[cfg(unix)]
    fn stalled_fifo(dir: &Path) -> PathBuf {
        let path = dir.join("layout.fifo");
        let status = std::process::Command::new("mkfifo")
            .arg(&path)
            .status()
            .expect("run mkfifo");
        assert!(status.success());
        path
    }

    #[cfg(unix)]
    #[test]
    fn stalled_read_times_out() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = stalled_fifo(dir.path());
        let timeout = Duration::from_millis(100);
        assert!(matches!(
            read_with_timeout(&path, timeout),
            Err(SettingsError::TimedOut { timeout: waited }) if waited == timeout
        ));
    }
}
