#![forbid(unsafe_code)]

//! Dockspace public facade crate.
//!
//! Re-exports the types most hosts need from the tree, layout and runtime
//! crates, plus a single [`Error`] covering all of them and a prelude.

use std::fmt;

// --- Tree re-exports -------------------------------------------------------

pub use dockspace_core::{
    Alignment, Capabilities, ContentHandle, DockError, DockTree, Dockable, DockableClosed,
    DockableKey, DockableKind, Factory, InvariantReport, Membership, NavigationHistory,
    Orientation, RenderHandle, RenderSurface,
};

// --- Layout re-exports -----------------------------------------------------

pub use dockspace_layout::{
    CodecError, DecodeIssue, DecodedLayout, LayoutCodec, LayoutDocument, Snapshot,
    SnapshotReport, build_snapshot,
};

// --- Runtime re-exports ----------------------------------------------------

pub use dockspace_runtime::{
    ActivationOutcome, DockWorkspace, DocumentTab, EventSender, FallbackReason, HostView,
    LayoutPolicy, LayoutSettings, LayoutSource, LogFormat, PolicyError, Registry, RestoreError,
    RestoreReport, SaveError, SettingsError, ToolRegistration, WorkspaceError, WorkspaceEvent,
    WorkspaceSettings, init_tracing,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for Dockspace hosts.
#[derive(Debug)]
pub enum Error {
    /// Tree operation refused.
    Tree(DockError),
    /// Layout text could not be encoded or decoded.
    Codec(CodecError),
    /// Persisted layout could not be restored.
    Restore(RestoreError),
    /// Live layout could not be saved.
    Save(SaveError),
    /// Layout policy failed to load or validate.
    Policy(PolicyError),
    /// Settings storage failure.
    Settings(SettingsError),
    /// Workspace operation failed.
    Workspace(WorkspaceError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tree(err) => write!(f, "{err}"),
            Self::Codec(err) => write!(f, "{err}"),
            Self::Restore(err) => write!(f, "{err}"),
            Self::Save(err) => write!(f, "{err}"),
            Self::Policy(err) => write!(f, "{err}"),
            Self::Settings(err) => write!(f, "{err}"),
            Self::Workspace(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Tree(err) => Some(err),
            Self::Codec(err) => Some(err),
            Self::Restore(err) => Some(err),
            Self::Save(err) => Some(err),
            Self::Policy(err) => Some(err),
            Self::Settings(err) => Some(err),
            Self::Workspace(err) => Some(err),
        }
    }
}

macro_rules! impl_from {
    ($($source:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$source> for Error {
                fn from(err: $source) -> Self {
                    Self::$variant(err)
                }
            }
        )*
    };
}

impl_from! {
    DockError => Tree,
    CodecError => Codec,
    RestoreError => Restore,
    SaveError => Save,
    PolicyError => Policy,
    SettingsError => Settings,
    WorkspaceError => Workspace,
}

/// Standard result type for Dockspace APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        ActivationOutcome, DockTree, DockWorkspace, DockableKey, Error, Factory, LayoutPolicy,
        LayoutSettings, LayoutSource, Registry, Result, ToolRegistration, WorkspaceEvent,
        WorkspaceSettings,
    };

    pub use crate::{core, layout, runtime};
}

pub use dockspace_core as core;
pub use dockspace_layout as layout;
pub use dockspace_runtime as runtime;
