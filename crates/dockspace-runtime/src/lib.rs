#![forbid(unsafe_code)]

//! Workspace orchestration for Dockspace.
//!
//! - [`workspace`]: [`DockWorkspace`], the owner of the live layout.
//! - [`default_layout`]: the stock layout built when nothing was saved.
//! - [`restore`]: rebuilding a live layout from persisted text.
//! - [`activation`]: showing tools, inserting latent panes on demand.
//! - [`policy`]: ids, placement and repair thresholds as data.
//! - [`registry`]: live tool singletons and dockable templates.
//! - [`settings`]: where the persisted layout is stored.
//! - [`events`]: cross-thread notifications.
//! - [`logging`]: tracing subscriber setup.

pub mod activation;
pub mod default_layout;
pub mod error;
pub mod events;
pub mod logging;
pub mod policy;
pub mod registry;
pub mod restore;
pub mod settings;
pub mod workspace;

pub use activation::{ActivationOutcome, activate_tool};
pub use default_layout::{DefaultLayout, build_default_layout};
pub use error::{RestoreError, SaveError, WorkspaceError};
pub use events::{EventSender, WorkspaceEvent};
pub use logging::{LOG_ENV, LogFormat, init_tracing};
pub use policy::{
    LatentPanePolicy, LayoutPolicy, PlacementPolicy, PolicyError, ProportionPolicy, RepairPolicy,
    WellKnownIds,
};
pub use registry::{Registry, ToolRegistration};
pub use restore::{
    GeometryRepair, RestoreReport, RestoredLayout, latent_container, register_latent_panes,
    restore_layout,
};
pub use settings::{LayoutSettings, SettingsError, WorkspaceSettings, read_with_timeout};
pub use workspace::{DockWorkspace, DocumentTab, FallbackReason, HostView, LayoutSource};
