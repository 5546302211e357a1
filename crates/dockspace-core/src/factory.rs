//! Node construction, render-handle registries and close notifications.
//!
//! The factory is the only place concrete node kinds are assembled with
//! their default settings. It also keeps the opaque handles the rendering
//! host associates with dockables; the core never interprets them.

use std::sync::mpsc::{self, Receiver, Sender};

use rustc_hash::FxHashMap;

use crate::error::DockError;
use crate::node::{
    Alignment, Capabilities, ContentHandle, DockWindow, Dockable, DockableKey, DockableKind,
    DocumentTabLayout, GripMode, Orientation, WindowGeometry,
};
use crate::tree::{DockTree, DockableClosed};

/// Opaque value supplied by the rendering host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderHandle(pub u64);

/// Which rendering surface a handle belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderSurface {
    VisibleDockable,
    VisibleRoot,
    PinnedDockable,
    PinnedRoot,
    TabDockable,
    TabRoot,
    Tool,
    Document,
}

/// Builds nodes and broadcasts [`DockableClosed`] notifications.
#[derive(Debug, Default)]
pub struct Factory {
    handles: FxHashMap<(RenderSurface, DockableKey), RenderHandle>,
    closed_subscribers: Vec<Sender<DockableClosed>>,
}

impl Factory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- Node construction --------------------------------------------------

    /// Root dock with empty visible, hidden and pinned lists.
    #[must_use]
    pub fn create_root_dock(&self, id: impl Into<String>) -> Dockable {
        Dockable::new(id, DockableKind::RootDock {
            is_focusable_root: true,
        })
    }

    /// Tree consisting of a fresh root dock.
    #[must_use]
    pub fn create_layout(&self, root_id: impl Into<String>) -> DockTree {
        DockTree::with_root_id(root_id)
    }

    #[must_use]
    pub fn create_proportional_dock(
        &self,
        id: impl Into<String>,
        orientation: Orientation,
    ) -> Dockable {
        Dockable::new(id, DockableKind::ProportionalDock { orientation })
    }

    #[must_use]
    pub fn create_tool_dock(&self, id: impl Into<String>, alignment: Alignment) -> Dockable {
        Dockable::new(id, DockableKind::ToolDock {
            alignment,
            auto_hide: false,
            grip_mode: GripMode::Visible,
        })
    }

    #[must_use]
    pub fn create_document_dock(&self, id: impl Into<String>) -> Dockable {
        Dockable::new(id, DockableKind::DocumentDock {
            can_create_document: false,
            tabs_layout: DocumentTabLayout::Top,
        })
    }

    /// Resizable splitter. Splitters may be anonymous (empty id).
    #[must_use]
    pub fn create_proportional_dock_splitter(&self, id: impl Into<String>) -> Dockable {
        let mut splitter = Dockable::new(id, DockableKind::Splitter { can_resize: true });
        splitter.title.clear();
        splitter
    }

    #[must_use]
    pub fn create_tool(
        &self,
        id: impl Into<String>,
        title: impl Into<String>,
        content: Option<ContentHandle>,
    ) -> Dockable {
        Dockable::new(id, DockableKind::Tool { content }).with_title(title)
    }

    #[must_use]
    pub fn create_document(
        &self,
        id: impl Into<String>,
        title: impl Into<String>,
        content: Option<ContentHandle>,
    ) -> Dockable {
        Dockable::new(id, DockableKind::Document { content }).with_title(title)
    }

    /// Floating window with no layout; attach one via
    /// [`DockTree::add_window`] or [`DockTree::float_dockable`].
    #[must_use]
    pub fn create_dock_window(&self, id: impl Into<String>, geometry: WindowGeometry) -> DockWindow {
        let id = id.into();
        DockWindow {
            title: id.clone(),
            id,
            geometry,
            topmost: false,
            layout: None,
        }
    }

    // --- Render handles -----------------------------------------------------

    /// Associate a host handle with `key`; returns the handle it replaced.
    pub fn register_handle(
        &mut self,
        surface: RenderSurface,
        key: DockableKey,
        handle: RenderHandle,
    ) -> Option<RenderHandle> {
        self.handles.insert((surface, key), handle)
    }

    #[must_use]
    pub fn handle(&self, surface: RenderSurface, key: DockableKey) -> Option<RenderHandle> {
        self.handles.get(&(surface, key)).copied()
    }

    /// Drop every handle registered for `key`; returns how many were removed.
    pub fn forget_handles(&mut self, key: DockableKey) -> usize {
        let before = self.handles.len();
        self.handles.retain(|&(_, owner), _| owner != key);
        before - self.handles.len()
    }

    #[must_use]
    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }

    // --- Close notifications ------------------------------------------------

    /// New receiver for [`DockableClosed`] notifications.
    pub fn subscribe_closed(&mut self) -> Receiver<DockableClosed> {
        let (tx, rx) = mpsc::channel();
        self.closed_subscribers.push(tx);
        rx
    }

    /// Close `key` in `tree`, forget its handles and notify subscribers.
    ///
    /// Fails without side effects if the dockable may not be closed.
    pub fn close_dockable(
        &mut self,
        tree: &mut DockTree,
        key: DockableKey,
    ) -> Result<DockableClosed, DockError> {
        let closed = tree.close(key)?;
        for &discarded in &closed.discarded {
            self.forget_handles(discarded);
        }
        self.notify_closed(&closed);
        Ok(closed)
    }

    fn notify_closed(&mut self, closed: &DockableClosed) {
        let before = self.closed_subscribers.len();
        self.closed_subscribers
            .retain(|subscriber| subscriber.send(closed.clone()).is_ok());
        let pruned = before - self.closed_subscribers.len();
        if pruned > 0 {
            tracing::trace!(target: "dockspace.factory", pruned, "dropped closed-event subscribers");
        }
    }

    /// Capability set for content that must stay docked (not closable,
    /// pinnable or floatable).
    #[must_use]
    pub fn fixed_capabilities() -> Capabilities {
        Capabilities::CAN_DRAG | Capabilities::CAN_DROP
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InvalidOperationReason;

    fn layout(factory: &Factory) -> (DockTree, DockableKey, DockableKey) {
        let mut tree = factory.create_layout("Root");
        let root = tree.root();
        let left = tree
            .attach(root, factory.create_tool_dock("LeftDock", Alignment::Left))
            .expect("left");
        let tool = tree
            .attach(
                left,
                factory.create_tool("Assembly", "Assemblies", Some(ContentHandle(1))),
            )
            .expect("tool");
        (tree, left, tool)
    }

    #[test]
    fn constructors_produce_empty_containers() {
        let factory = Factory::new();
        let root = factory.create_root_dock("Root");
        assert!(root.root_state().is_some_and(|state| state.hidden().is_empty()));
        let documents = factory.create_document_dock("DocumentDock");
        assert!(documents.dock().is_some_and(|dock| dock.visible().is_empty()));
        let splitter = factory.create_proportional_dock_splitter("");
        assert_eq!(splitter.kind(), DockableKind::Splitter { can_resize: true });
        let window = factory.create_dock_window("W", WindowGeometry::default());
        assert_eq!(window.layout(), None);
    }

    #[test]
    fn close_notifies_every_live_subscriber() {
        let mut factory = Factory::new();
        let (mut tree, left, tool) = layout(&factory);
        let first = factory.subscribe_closed();
        let second = factory.subscribe_closed();
        let dropped = factory.subscribe_closed();
        drop(dropped);

        factory.register_handle(RenderSurface::Tool, tool, RenderHandle(11));
        factory.register_handle(RenderSurface::TabDockable, tool, RenderHandle(12));
        factory.register_handle(RenderSurface::VisibleDockable, left, RenderHandle(13));

        let closed = factory.close_dockable(&mut tree, tool).expect("close");
        assert_eq!(closed.id, "Assembly");
        assert_eq!(first.try_recv().map(|event| event.key), Ok(tool));
        assert_eq!(second.try_recv().map(|event| event.owner), Ok(Some(left)));
        assert_eq!(factory.closed_subscribers.len(), 2);
        assert_eq!(factory.handle(RenderSurface::Tool, tool), None);
        assert_eq!(factory.handle_count(), 1);
    }

    #[test]
    fn refused_close_emits_nothing() {
        let mut factory = Factory::new();
        let (mut tree, _, tool) = layout(&factory);
        tree.get_mut(tool).expect("tool").capabilities = Factory::fixed_capabilities();
        let events = factory.subscribe_closed();

        let err = factory.close_dockable(&mut tree, tool).expect_err("fixed");
        assert_eq!(err.reason(), Some(&InvalidOperationReason::CannotClose));
        assert!(events.try_recv().is_err());
        assert!(tree.contains(tool));
    }

    #[test]
    fn register_handle_replaces_previous() {
        let mut factory = Factory::new();
        let key = DockableKey::MIN;
        assert_eq!(
            factory.register_handle(RenderSurface::VisibleRoot, key, RenderHandle(1)),
            None
        );
        assert_eq!(
            factory.register_handle(RenderSurface::VisibleRoot, key, RenderHandle(2)),
            Some(RenderHandle(1))
        );
        assert_eq!(factory.forget_handles(key), 1);
    }
}
