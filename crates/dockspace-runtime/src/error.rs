//! Error types for the workspace orchestrator.

use std::time::Duration;

use dockspace_core::DockError;
use dockspace_layout::CodecError;
use thiserror::Error;

use crate::settings::SettingsError;

/// Why a persisted layout could not be restored.
///
/// Every variant leaves the live tree untouched; the caller falls back to
/// the default layout.
#[derive(Debug, Error)]
pub enum RestoreError {
    #[error("persisted layout could not be decoded: {0}")]
    Deserialization(#[from] CodecError),
    #[error("reading the persisted layout timed out after {timeout:?}")]
    TimedOut { timeout: Duration },
    #[error("reading the persisted layout failed: {0}")]
    Io(#[source] SettingsError),
    #[error("restored layout is structurally invalid: {0}")]
    Structure(#[source] DockError),
    #[error("restored layout has no {id:?} container")]
    MissingContainer { id: String },
}

impl RestoreError {
    /// Whether the failure counts as a deserialization failure. Timeouts
    /// are treated the same as malformed input.
    #[must_use]
    pub const fn is_deserialization_failure(&self) -> bool {
        matches!(self, Self::Deserialization(_) | Self::TimedOut { .. })
    }
}

impl From<SettingsError> for RestoreError {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::TimedOut { timeout } => Self::TimedOut { timeout },
            other => Self::Io(other),
        }
    }
}

impl From<DockError> for RestoreError {
    fn from(err: DockError) -> Self {
        Self::Structure(err)
    }
}

/// Errors from document and close operations on a workspace.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("layout has no {id:?} container")]
    MissingContainer { id: String },
    #[error("no open dockable {id:?}")]
    UnknownDockable { id: String },
    #[error(transparent)]
    Tree(#[from] DockError),
}

/// Why the current layout could not be saved.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("snapshot failed: {0}")]
    Snapshot(#[source] DockError),
    #[error("encoding failed: {0}")]
    Encode(#[source] CodecError),
}
