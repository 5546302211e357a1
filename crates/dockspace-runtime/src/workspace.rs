//! The workspace orchestrator.
//!
//! [`DockWorkspace`] owns the live tree, the factory, the registry and the
//! settings store. It is driven from one thread; other threads talk to it
//! through an [`EventSender`] and [`DockWorkspace::pump_events`].
//!
//! # Example
//!
//! ```
//! use dockspace_core::ContentHandle;
//! use dockspace_runtime::{
//!     DockWorkspace, LayoutPolicy, LayoutSource, Registry, ToolRegistration, WorkspaceSettings,
//! };
//!
//! let mut registry = Registry::new();
//! registry.register_tool(ToolRegistration::new("Assembly", "Assemblies", ContentHandle(1)));
//! let mut workspace =
//!     DockWorkspace::new(LayoutPolicy::default(), WorkspaceSettings::default(), registry);
//! assert!(matches!(workspace.initialize_layout(), LayoutSource::Default { .. }));
//! assert!(workspace.tree().find_by_id("Assembly").is_some());
//! ```

use std::path::Path;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use dockspace_core::{
    Capabilities, ContentHandle, DockTree, Dockable, DockableClosed, DockableKey, DockableKind,
    Factory, Membership,
};
use dockspace_layout::{LayoutCodec, SnapshotReport, build_snapshot};

use crate::activation::{self, ActivationOutcome, focus};
use crate::default_layout;
use crate::error::{RestoreError, SaveError, WorkspaceError};
use crate::events::{EventQueue, EventSender, WorkspaceEvent};
use crate::policy::LayoutPolicy;
use crate::registry::{Registry, ToolRegistration};
use crate::restore::{RestoreReport, register_latent_panes, restore_layout};
use crate::settings::{LayoutSettings, WorkspaceSettings, read_with_timeout};

/// An open document tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentTab {
    pub id: String,
    pub title: String,
    pub content: ContentHandle,
    pub closeable: bool,
}

/// Why the default layout was built instead of a restored one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// Settings ask for the default layout only.
    Forced,
    NothingSaved,
    /// Restore failed with this error.
    RestoreFailed(String),
}

/// Where the current layout came from.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutSource {
    Restored { report: RestoreReport },
    Default { reason: FallbackReason },
}

/// The two handles the rendering host consumes.
#[derive(Debug, Clone, Copy)]
pub struct HostView<'a> {
    pub tree: &'a DockTree,
    pub factory: &'a Factory,
}

#[derive(Debug)]
pub struct DockWorkspace<S: LayoutSettings = WorkspaceSettings> {
    policy: LayoutPolicy,
    settings: S,
    registry: Registry,
    factory: Factory,
    codec: LayoutCodec,
    tree: DockTree,
    closed: Receiver<DockableClosed>,
    events: EventQueue,
    documents: Vec<DocumentTab>,
}

impl<S: LayoutSettings> DockWorkspace<S> {
    /// Workspace with a root-only tree; call
    /// [`initialize_layout`](Self::initialize_layout) before showing it.
    pub fn new(policy: LayoutPolicy, settings: S, registry: Registry) -> Self {
        let mut factory = Factory::new();
        let closed = factory.subscribe_closed();
        let tree = factory.create_layout(policy.ids.root.clone());
        Self {
            policy,
            settings,
            registry,
            factory,
            codec: LayoutCodec::new(),
            tree,
            closed,
            events: EventQueue::new(),
            documents: Vec::new(),
        }
    }

    // --- Layout lifecycle ---------------------------------------------------

    /// Restore the persisted layout, or build the default one.
    ///
    /// Never fails: every restore failure degrades to the default layout.
    pub fn initialize_layout(&mut self) -> LayoutSource {
        if self.settings.use_default_dock_layout_only() {
            self.build_default_layout();
            return LayoutSource::Default {
                reason: FallbackReason::Forced,
            };
        }
        let Some(text) = self.settings.dock_layout().map(str::to_owned) else {
            self.build_default_layout();
            return LayoutSource::Default {
                reason: FallbackReason::NothingSaved,
            };
        };
        match self.try_restore_layout(&text) {
            Ok(report) => LayoutSource::Restored { report },
            Err(err) => {
                tracing::warn!(
                    target: "dockspace.workspace",
                    error = %err,
                    deserialization = err.is_deserialization_failure(),
                    "restore failed; building default layout"
                );
                self.build_default_layout();
                LayoutSource::Default {
                    reason: FallbackReason::RestoreFailed(err.to_string()),
                }
            }
        }
    }

    /// Restore `text` into a new tree and swap it in.
    ///
    /// On error the current tree is left as it was.
    pub fn try_restore_layout(&mut self, text: &str) -> Result<RestoreReport, RestoreError> {
        let restored = restore_layout(
            text,
            &self.policy,
            &mut self.registry,
            &self.factory,
            &self.codec,
        )?;
        self.replace_tree(restored.tree);
        Ok(restored.report)
    }

    /// Read a persisted layout file with a timeout, then restore it.
    pub fn restore_from_path(
        &mut self,
        path: impl AsRef<Path>,
        timeout: Duration,
    ) -> Result<RestoreReport, RestoreError> {
        let text = read_with_timeout(path, timeout)?;
        self.try_restore_layout(&text)
    }

    /// Replace the tree with the default layout.
    pub fn build_default_layout(&mut self) {
        let tree = match default_layout::build_default_layout(
            &self.factory,
            &self.policy,
            &self.registry,
        ) {
            Ok(layout) => layout.tree,
            Err(err) => {
                tracing::error!(
                    target: "dockspace.workspace",
                    error = %err,
                    "default layout build failed; using an empty root"
                );
                self.factory.create_layout(self.policy.ids.root.clone())
            }
        };
        register_latent_panes(&mut self.registry, &self.factory, &self.policy);
        self.replace_tree(tree);
    }

    /// Snapshot the live tree and store the encoded text in the settings.
    pub fn save_layout(&mut self) -> Result<SnapshotReport, SaveError> {
        let span = tracing::debug_span!(target: "dockspace.workspace", "save_layout");
        let _guard = span.enter();
        let snapshot = build_snapshot(&self.tree).map_err(SaveError::Snapshot)?;
        let text = self
            .codec
            .serialize(&snapshot.tree)
            .map_err(SaveError::Encode)?;
        tracing::info!(
            target: "dockspace.workspace",
            bytes = text.len(),
            stubbed = snapshot.report.stubbed.len(),
            dropped = snapshot.report.dropped.len(),
            "layout saved"
        );
        self.settings.set_dock_layout(Some(text));
        Ok(snapshot.report)
    }

    /// Forget the persisted layout and rebuild the default one.
    ///
    /// Dockable templates are dropped and only the policy's latent panes are
    /// registered again.
    pub fn reset_layout(&mut self) {
        self.settings.set_dock_layout(None);
        self.registry.clear_dockables();
        self.build_default_layout();
    }

    fn replace_tree(&mut self, tree: DockTree) {
        let old = std::mem::replace(&mut self.tree, tree);
        for (key, _) in old.nodes() {
            self.factory.forget_handles(key);
        }
        self.reattach_documents();
        self.sync_tool_visibility();
        tracing::debug!(
            target: "dockspace.workspace",
            nodes = self.tree.node_count(),
            documents = self.documents.len(),
            "layout swapped in"
        );
    }

    /// Put the open document tabs back into a freshly swapped-in tree.
    fn reattach_documents(&mut self) {
        if self.documents.is_empty() {
            return;
        }
        let Some(dock) = self.tree.find_dock_by_id(&self.policy.ids.document_dock) else {
            tracing::warn!(
                target: "dockspace.workspace",
                documents = self.documents.len(),
                "no document dock; open documents dropped"
            );
            self.documents.clear();
            return;
        };
        let tabs = std::mem::take(&mut self.documents);
        for tab in tabs {
            let node = document_node(&self.factory, &tab);
            match self.tree.attach(dock, node) {
                Ok(key) => {
                    if let Err(err) = focus(&mut self.tree, key) {
                        tracing::warn!(target: "dockspace.workspace", id = %tab.id, error = %err, "document not focused");
                    }
                    self.documents.push(tab);
                }
                Err(err) => {
                    tracing::warn!(target: "dockspace.workspace", id = %tab.id, error = %err, "document dropped");
                }
            }
        }
    }

    /// Record in the registry which tools are currently shown.
    fn sync_tool_visibility(&mut self) {
        let shown: Vec<(String, bool)> = self
            .registry
            .tools()
            .iter()
            .map(|tool| {
                let visible = self.tree.find_by_id(&tool.id).is_some_and(|key| {
                    !matches!(self.tree.membership(key), Some((_, Membership::Hidden(_))))
                });
                (tool.id.clone(), visible)
            })
            .collect();
        for (id, visible) in shown {
            self.registry.set_visible(&id, visible);
        }
    }

    // --- Tools --------------------------------------------------------------

    pub fn register_tool(&mut self, tool: ToolRegistration) -> Option<ToolRegistration> {
        self.registry.register_tool(tool)
    }

    /// Show and focus a tool, inserting it and its container when needed.
    pub fn activate_tool(&mut self, id: &str) -> ActivationOutcome {
        let outcome = match activation::activate_tool(
            &mut self.tree,
            &self.registry,
            &self.factory,
            &self.policy,
            id,
        ) {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(
                    target: "dockspace.workspace",
                    tool = id,
                    error = %err,
                    "tool activation failed"
                );
                ActivationOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        };
        if matches!(
            outcome,
            ActivationOutcome::Focused { .. } | ActivationOutcome::Attached { .. }
        ) {
            self.registry.set_visible(id, true);
        }
        outcome
    }

    /// Move a tool to the root's hidden list.
    pub fn hide_tool(&mut self, id: &str) -> Result<(), WorkspaceError> {
        let key = self.find_leaf(id, |kind| matches!(kind, DockableKind::Tool { .. }))?;
        self.tree.hide_dockable(key)?;
        self.registry.set_visible(id, false);
        tracing::debug!(target: "dockspace.workspace", tool = id, "tool hidden");
        Ok(())
    }

    /// Close the dockable with `id` and apply the resulting notification.
    pub fn close_dockable(&mut self, id: &str) -> Result<DockableClosed, WorkspaceError> {
        let key = self
            .tree
            .find_by_id(id)
            .ok_or_else(|| WorkspaceError::UnknownDockable { id: id.to_owned() })?;
        let closed = self.factory.close_dockable(&mut self.tree, key)?;
        self.drain_closed();
        Ok(closed)
    }

    // --- Events ---------------------------------------------------------------

    #[must_use]
    pub fn event_sender(&self) -> EventSender {
        self.events.sender()
    }

    /// Apply every queued event and close notification; returns how many
    /// events were applied.
    pub fn pump_events(&mut self) -> usize {
        let events = self.events.drain();
        let applied = events.len();
        for event in events {
            tracing::trace!(target: "dockspace.workspace", ?event, "applying event");
            match event {
                WorkspaceEvent::ActivateTool(id) => {
                    self.activate_tool(&id);
                }
                WorkspaceEvent::CloseDockable(id) => {
                    if let Err(err) = self.close_dockable(&id) {
                        tracing::warn!(target: "dockspace.workspace", id = %id, error = %err, "close refused");
                    }
                }
                WorkspaceEvent::ToolVisibility { id, visible: true } => {
                    self.activate_tool(&id);
                }
                WorkspaceEvent::ToolVisibility { id, visible: false } => {
                    if let Err(err) = self.hide_tool(&id) {
                        tracing::warn!(target: "dockspace.workspace", id = %id, error = %err, "hide refused");
                    }
                }
            }
        }
        self.drain_closed();
        applied
    }

    fn drain_closed(&mut self) {
        while let Ok(closed) = self.closed.try_recv() {
            match closed.kind {
                DockableKind::Tool { .. } => {
                    self.registry.set_visible(&closed.id, false);
                }
                DockableKind::Document { .. } => {
                    self.documents.retain(|tab| tab.id != closed.id);
                }
                _ => {}
            }
            tracing::debug!(
                target: "dockspace.workspace",
                id = %closed.id,
                kind = closed.kind.name(),
                "dockable closed"
            );
        }
    }

    // --- Documents --------------------------------------------------------------

    /// Open a document tab, or focus it if one with `id` is already open.
    pub fn open_document(
        &mut self,
        id: &str,
        title: &str,
        content: ContentHandle,
        closeable: bool,
    ) -> Result<DockableKey, WorkspaceError> {
        if self.documents.iter().any(|tab| tab.id == id) {
            return self.set_active_document(id);
        }
        let dock = self
            .tree
            .find_dock_by_id(&self.policy.ids.document_dock)
            .ok_or_else(|| WorkspaceError::MissingContainer {
                id: self.policy.ids.document_dock.clone(),
            })?;
        let tab = DocumentTab {
            id: id.to_owned(),
            title: title.to_owned(),
            content,
            closeable,
        };
        let node = document_node(&self.factory, &tab);
        let key = self.tree.apply_atomic(|tree| {
            let key = tree.attach(dock, node)?;
            tree.navigate(dock, key)?;
            focus(tree, key)?;
            Ok(key)
        })?;
        tracing::debug!(target: "dockspace.workspace", id, "document opened");
        self.documents.push(tab);
        Ok(key)
    }

    /// Activate an open document and record it in its dock's history.
    pub fn set_active_document(&mut self, id: &str) -> Result<DockableKey, WorkspaceError> {
        let key = self.find_leaf(id, |kind| matches!(kind, DockableKind::Document { .. }))?;
        let owner = self
            .tree
            .get(key)
            .and_then(Dockable::owner)
            .ok_or_else(|| WorkspaceError::UnknownDockable { id: id.to_owned() })?;
        self.tree.apply_atomic(|tree| {
            tree.navigate(owner, key)?;
            focus(tree, key)
        })?;
        Ok(key)
    }

    /// Close a document tab. The previous entry in its history becomes
    /// active.
    pub fn close_document(&mut self, id: &str) -> Result<(), WorkspaceError> {
        let key = self.find_leaf(id, |kind| matches!(kind, DockableKind::Document { .. }))?;
        let closed = self.factory.close_dockable(&mut self.tree, key)?;
        self.drain_closed();
        if let Some(owner) = closed.owner
            && let Some(dock) = self.tree.dock(owner)
            && dock.active().is_none()
            && let Some(previous) = dock.navigation().current()
        {
            focus(&mut self.tree, previous)?;
        }
        Ok(())
    }

    /// Step back in the document dock's history; returns the newly active id.
    pub fn document_back(&mut self) -> Result<Option<String>, WorkspaceError> {
        let dock = self.document_dock()?;
        let target = self.tree.go_back(dock)?;
        self.focus_history_target(target)
    }

    /// Step forward in the document dock's history.
    pub fn document_forward(&mut self) -> Result<Option<String>, WorkspaceError> {
        let dock = self.document_dock()?;
        let target = self.tree.go_forward(dock)?;
        self.focus_history_target(target)
    }

    fn focus_history_target(
        &mut self,
        target: Option<DockableKey>,
    ) -> Result<Option<String>, WorkspaceError> {
        let Some(key) = target else {
            return Ok(None);
        };
        focus(&mut self.tree, key)?;
        Ok(self.tree.get(key).map(|node| node.id.clone()))
    }

    /// The tab shown in the document dock.
    #[must_use]
    pub fn active_document(&self) -> Option<&DocumentTab> {
        let dock = self.tree.find_dock_by_id(&self.policy.ids.document_dock)?;
        let active = self.tree.dock(dock)?.active()?;
        let id = &self.tree.get(active)?.id;
        self.documents.iter().find(|tab| &tab.id == id)
    }

    #[must_use]
    pub fn documents(&self) -> &[DocumentTab] {
        &self.documents
    }

    fn document_dock(&self) -> Result<DockableKey, WorkspaceError> {
        self.tree
            .find_dock_by_id(&self.policy.ids.document_dock)
            .ok_or_else(|| WorkspaceError::MissingContainer {
                id: self.policy.ids.document_dock.clone(),
            })
    }

    fn find_leaf(
        &self,
        id: &str,
        accept: impl Fn(&DockableKind) -> bool,
    ) -> Result<DockableKey, WorkspaceError> {
        self.tree
            .walk()
            .into_iter()
            .find(|&key| {
                self.tree
                    .get(key)
                    .is_some_and(|node| node.id == id && accept(&node.kind()))
            })
            .ok_or_else(|| WorkspaceError::UnknownDockable { id: id.to_owned() })
    }

    // --- Accessors --------------------------------------------------------------

    /// Handles for the rendering host.
    #[must_use]
    pub fn host_view(&self) -> HostView<'_> {
        HostView {
            tree: &self.tree,
            factory: &self.factory,
        }
    }

    #[must_use]
    pub fn tree(&self) -> &DockTree {
        &self.tree
    }

    #[must_use]
    pub fn factory(&self) -> &Factory {
        &self.factory
    }

    pub fn factory_mut(&mut self) -> &mut Factory {
        &mut self.factory
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub fn policy(&self) -> &LayoutPolicy {
        &self.policy
    }

    #[must_use]
    pub fn settings(&self) -> &S {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut S {
        &mut self.settings
    }

    /// Give up the workspace and keep its settings, e.g. to write them out.
    pub fn into_settings(self) -> S {
        self.settings
    }
}

fn document_node(factory: &Factory, tab: &DocumentTab) -> Dockable {
    let mut capabilities = Factory::fixed_capabilities();
    if tab.closeable {
        capabilities |= Capabilities::CAN_CLOSE;
    }
    factory
        .create_document(tab.id.clone(), tab.title.clone(), Some(tab.content))
        .with_capabilities(capabilities)
}
