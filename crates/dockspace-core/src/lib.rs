#![forbid(unsafe_code)]

//! Docking layout tree primitives.
//!
//! - [`node`]: the closed set of dockable kinds and their per-kind settings.
//! - [`tree`]: an arena-backed [`DockTree`] whose operations keep the
//!   ownership and pointer invariants intact.
//! - [`factory`]: node construction, render-handle registries and
//!   close notifications.
//! - [`navigation`]: per-dock back/forward history.

pub mod error;
pub mod factory;
pub mod navigation;
pub mod node;
pub mod tree;

pub use error::{DockError, InvalidOperationReason};
pub use factory::{Factory, RenderHandle, RenderSurface};
pub use navigation::NavigationHistory;
pub use node::{
    Alignment, Capabilities, ContentHandle, DockState, DockWindow, Dockable, DockableKey,
    DockableKind, DocumentTabLayout, GridPlacement, GripMode, Orientation, Persistence,
    PinnedEdge, RootState, WindowGeometry,
};
pub use tree::{
    DockPointer, DockTree, DockableClosed, InvariantCode, InvariantIssue, InvariantReport,
    InvariantSeverity, Membership,
};
