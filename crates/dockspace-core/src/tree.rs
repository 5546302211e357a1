//! Arena-backed dock tree.
//!
//! Nodes live in a `BTreeMap` keyed by [`DockableKey`]. Containment is
//! expressed only by the ordered lists on each [`DockState`] (and the root's
//! hidden/pinned/window lists); `owner` is a back-reference kept in sync by
//! every mutating operation here. Operations that touch several nodes either
//! validate all preconditions before mutating or run through
//! [`DockTree::apply_atomic`], so a failed call leaves the tree unchanged.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{DockError, InvalidOperationReason as Reason};
use crate::node::{
    Alignment, Capabilities, DockState, DockWindow, Dockable, DockableKey, DockableKind,
    DocumentTabLayout, GripMode, Orientation, PinnedEdge, RootState,
};

/// Slot a dockable occupies inside its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    Visible(usize),
    Hidden(usize),
    Pinned(PinnedEdge, usize),
    Window(usize),
}

/// Pointer field of a dock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DockPointer {
    Active,
    Default,
    Focused,
}

/// Summary of a dockable removed by [`DockTree::close`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockableClosed {
    pub key: DockableKey,
    pub id: String,
    pub title: String,
    pub kind: DockableKind,
    pub owner: Option<DockableKey>,
    /// Every key freed by the close, the closed node first.
    pub discarded: Vec<DockableKey>,
}

/// Severity for one invariant finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvariantSeverity {
    Error,
    Warning,
}

/// Stable code for invariant findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvariantCode {
    MissingRoot,
    RootNotRootDock,
    RootHasOwner,
    ExtraRootDock,
    DockStateMismatch,
    MissingChild,
    MultipleContainers,
    OwnerMismatch,
    DanglingActive,
    DanglingDefault,
    DanglingFocused,
    DanglingPinnedPreview,
    DuplicateId,
    UnreachableNode,
    InvalidProportion,
    NextKeyNotGreater,
}

/// One invariant finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvariantIssue {
    pub code: InvariantCode,
    pub severity: InvariantSeverity,
    pub node: Option<DockableKey>,
    pub related: Option<DockableKey>,
    pub message: String,
}

/// Structured invariant report over a dock tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvariantReport {
    pub state_hash: u64,
    pub issues: Vec<InvariantIssue>,
}

impl InvariantReport {
    /// Return true if any error-level finding exists.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.issues
            .iter()
            .any(|issue| issue.severity == InvariantSeverity::Error)
    }

    #[must_use]
    pub fn codes(&self) -> BTreeSet<InvariantCode> {
        self.issues.iter().map(|issue| issue.code).collect()
    }
}

/// Layout tree with a single root dock.
#[derive(Debug, Clone)]
pub struct DockTree {
    root: DockableKey,
    next_key: DockableKey,
    nodes: BTreeMap<DockableKey, Dockable>,
}

impl DockTree {
    /// Create a tree around `root`, which must be a root dock.
    ///
    /// Any membership carried by `root` is dropped.
    pub fn new(root: Dockable) -> Result<Self, DockError> {
        if !root.kind.is_root() {
            return Err(DockError::invalid(DockableKey::MIN, Reason::NotARoot));
        }
        let key = DockableKey::MIN;
        let mut nodes = BTreeMap::new();
        nodes.insert(key, root.detached_copy());
        Ok(Self {
            root: key,
            next_key: key.checked_next()?,
            nodes,
        })
    }

    /// Tree holding only an empty root dock.
    #[must_use]
    pub fn with_root_id(id: impl Into<String>) -> Self {
        let root = DockableKey::MIN;
        let mut nodes = BTreeMap::new();
        nodes.insert(
            root,
            Dockable::new(id, DockableKind::RootDock {
                is_focusable_root: true,
            }),
        );
        Self {
            root,
            next_key: root.checked_next().unwrap_or(root),
            nodes,
        }
    }

    #[must_use]
    pub const fn root(&self) -> DockableKey {
        self.root
    }

    #[must_use]
    pub const fn next_key(&self) -> DockableKey {
        self.next_key
    }

    #[must_use]
    pub fn get(&self, key: DockableKey) -> Option<&Dockable> {
        self.nodes.get(&key)
    }

    /// Mutable access to scalar fields; membership is only changed through
    /// tree operations.
    pub fn get_mut(&mut self, key: DockableKey) -> Option<&mut Dockable> {
        self.nodes.get_mut(&key)
    }

    #[must_use]
    pub fn contains(&self, key: DockableKey) -> bool {
        self.nodes.contains_key(&key)
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Iterate every node in key order, attached or not.
    pub fn nodes(&self) -> impl Iterator<Item = (DockableKey, &Dockable)> {
        self.nodes.iter().map(|(&key, node)| (key, node))
    }

    #[must_use]
    pub fn root_state(&self) -> &RootState {
        static EMPTY: RootState = RootState {
            hidden: Vec::new(),
            left_pinned: Vec::new(),
            right_pinned: Vec::new(),
            top_pinned: Vec::new(),
            bottom_pinned: Vec::new(),
            pinned_preview: None,
            windows: Vec::new(),
        };
        self.nodes
            .get(&self.root)
            .and_then(Dockable::root_state)
            .unwrap_or(&EMPTY)
    }

    #[must_use]
    pub fn dock(&self, key: DockableKey) -> Option<&DockState> {
        self.nodes.get(&key).and_then(Dockable::dock)
    }

    /// Run `op` against a scratch copy and keep the result only on success.
    pub fn apply_atomic<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> Result<T, DockError>,
    ) -> Result<T, DockError> {
        let mut working = self.clone();
        let output = op(&mut working)?;
        *self = working;
        Ok(output)
    }

    // --- Allocation -------------------------------------------------------

    /// Add `dockable` to the arena as a detached node.
    pub fn insert(&mut self, dockable: Dockable) -> Result<DockableKey, DockError> {
        let key = self.next_key;
        if dockable.kind.is_root() {
            return Err(DockError::invalid(key, Reason::SecondRoot));
        }
        self.next_key = key.checked_next()?;
        self.nodes.insert(key, dockable.detached_copy());
        Ok(key)
    }

    /// Insert `dockable` and append it to `container`.
    pub fn attach(
        &mut self,
        container: DockableKey,
        dockable: Dockable,
    ) -> Result<DockableKey, DockError> {
        let key = self.insert(dockable)?;
        if let Err(err) = self.add_dockable(container, key) {
            self.nodes.remove(&key);
            return Err(err);
        }
        Ok(key)
    }

    /// Free a detached node and everything it contains.
    pub fn discard(&mut self, key: DockableKey) -> Result<Vec<DockableKey>, DockError> {
        if key == self.root {
            return Err(DockError::invalid(key, Reason::RootImmovable));
        }
        if let Some(owner) = self.node(key)?.owner {
            return Err(DockError::invalid(key, Reason::StillAttached { owner }));
        }
        let mut removed = Vec::new();
        let mut stack = vec![key];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.remove(&next) {
                removed.push(next);
                stack.extend(child_keys(&node).into_iter().rev());
            }
        }
        Ok(removed)
    }

    // --- Visible membership -----------------------------------------------

    /// Append `key` to `container`'s visible dockables.
    pub fn add_dockable(
        &mut self,
        container: DockableKey,
        key: DockableKey,
    ) -> Result<(), DockError> {
        let len = self.dock_state(container)?.visible.len();
        self.insert_dockable(container, len, key)
    }

    /// Insert `key` at `index` of `container`'s visible dockables.
    pub fn insert_dockable(
        &mut self,
        container: DockableKey,
        index: usize,
        key: DockableKey,
    ) -> Result<(), DockError> {
        self.check_attachable(container, key)?;
        let dock = self.dock_state_mut(container)?;
        if index > dock.visible.len() {
            return Err(DockError::invalid(
                key,
                Reason::IndexOutOfRange {
                    index,
                    len: dock.visible.len(),
                },
            ));
        }
        dock.visible.insert(index, key);
        self.node_mut(key)?.owner = Some(container);
        Ok(())
    }

    /// Remove `key` from `container`, clearing its owner and any pointer or
    /// history entry that referenced it. The node stays in the arena.
    pub fn remove_dockable(
        &mut self,
        container: DockableKey,
        key: DockableKey,
    ) -> Result<(), DockError> {
        let dock = self.dock_state_mut(container)?;
        let Some(index) = dock.position(key) else {
            return Err(DockError::invalid(key, Reason::NotAMember { container }));
        };
        dock.visible.remove(index);
        clear_pointers_to(dock, key);
        let node = self.node_mut(key)?;
        node.owner = None;
        node.is_active = false;
        Ok(())
    }

    /// Relocate an attached dockable to `index` of `target`.
    pub fn move_dockable(
        &mut self,
        key: DockableKey,
        target: DockableKey,
        index: usize,
    ) -> Result<(), DockError> {
        self.apply_atomic(|tree| {
            tree.detach(key)?;
            tree.insert_dockable(target, index, key)
        })
    }

    /// Put detached `new` into the slot held by `old`, redirecting every
    /// pointer that referenced `old`. `old` is left detached.
    pub fn replace_dockable(
        &mut self,
        old: DockableKey,
        new: DockableKey,
    ) -> Result<(), DockError> {
        let Some((owner, membership)) = self.membership(old) else {
            return Err(DockError::invalid(
                old,
                Reason::NotAMember {
                    container: self.node(old)?.owner.unwrap_or(self.root),
                },
            ));
        };
        self.check_container(owner, new)?;
        if let Some(current) = self.node(new)?.owner {
            return Err(DockError::invalid(new, Reason::AlreadyOwned { owner: current }));
        }

        let node = self.node_mut(owner)?;
        match membership {
            Membership::Visible(index) => {
                if let Some(dock) = node.dock.as_mut() {
                    dock.visible[index] = new;
                    for pointer in [&mut dock.active, &mut dock.default, &mut dock.focused] {
                        if *pointer == Some(old) {
                            *pointer = Some(new);
                        }
                    }
                    dock.navigation.remove(old);
                }
            }
            Membership::Hidden(index) => {
                if let Some(root) = node.root.as_mut() {
                    root.hidden[index] = new;
                }
            }
            Membership::Pinned(edge, index) => {
                if let Some(root) = node.root.as_mut() {
                    root.pinned_mut(edge)[index] = new;
                    if root.pinned_preview == Some(old) {
                        root.pinned_preview = Some(new);
                    }
                }
            }
            Membership::Window(index) => {
                if let Some(root) = node.root.as_mut() {
                    root.windows[index].layout = Some(new);
                }
            }
        }
        self.node_mut(old)?.owner = None;
        self.node_mut(new)?.owner = Some(owner);
        Ok(())
    }

    /// Remove `key` from whichever list holds it. Detached nodes are a no-op.
    ///
    /// Detaching the layout of a floating window closes that window.
    pub fn detach(&mut self, key: DockableKey) -> Result<(), DockError> {
        if key == self.root {
            return Err(DockError::invalid(key, Reason::RootImmovable));
        }
        let owner_key = self.node(key)?.owner;
        let Some((owner, membership)) = self.membership(key) else {
            if let Some(owner) = owner_key {
                return Err(DockError::invalid(key, Reason::NotAMember { container: owner }));
            }
            return Ok(());
        };
        if let Membership::Visible(_) = membership {
            return self.remove_dockable(owner, key);
        }
        let root = self.root_state_mut()?;
        match membership {
            Membership::Hidden(index) => {
                root.hidden.remove(index);
            }
            Membership::Pinned(edge, index) => {
                root.pinned_mut(edge).remove(index);
                if root.pinned_preview == Some(key) {
                    root.pinned_preview = None;
                }
            }
            Membership::Window(index) => {
                root.windows.remove(index);
            }
            Membership::Visible(_) => {}
        }
        let node = self.node_mut(key)?;
        node.owner = None;
        node.is_active = false;
        Ok(())
    }

    // --- Pointers -----------------------------------------------------------

    /// Set a dock pointer; `Some` targets must be visible members of `dock`.
    pub fn set_pointer(
        &mut self,
        dock: DockableKey,
        pointer: DockPointer,
        target: Option<DockableKey>,
    ) -> Result<(), DockError> {
        let state = self.dock_state_mut(dock)?;
        if let Some(target) = target
            && !state.contains(target)
        {
            return Err(DockError::invalid(target, Reason::NotAMember { container: dock }));
        }
        let slot = match pointer {
            DockPointer::Active => &mut state.active,
            DockPointer::Default => &mut state.default,
            DockPointer::Focused => &mut state.focused,
        };
        *slot = target;
        Ok(())
    }

    pub fn set_active_dockable(
        &mut self,
        dock: DockableKey,
        target: Option<DockableKey>,
    ) -> Result<(), DockError> {
        self.set_pointer(dock, DockPointer::Active, target)
    }

    pub fn set_default_dockable(
        &mut self,
        dock: DockableKey,
        target: Option<DockableKey>,
    ) -> Result<(), DockError> {
        self.set_pointer(dock, DockPointer::Default, target)
    }

    pub fn set_focused_dockable(
        &mut self,
        dock: DockableKey,
        target: Option<DockableKey>,
    ) -> Result<(), DockError> {
        self.set_pointer(dock, DockPointer::Focused, target)
    }

    /// Make `key` the active child of its owner, mark it active and mark
    /// every container up to the root visible and active along the path.
    pub fn activate_path(&mut self, key: DockableKey) -> Result<(), DockError> {
        let mut child = key;
        {
            let node = self.node_mut(key)?;
            node.is_visible = true;
        }
        while let Some(owner) = self.node(child)?.owner {
            let state = self.dock_state_mut(owner)?;
            if state.contains(child) {
                let previous = state.active.replace(child);
                if child == key
                    && let Some(previous) = previous.filter(|&previous| previous != key)
                    && let Some(node) = self.nodes.get_mut(&previous)
                {
                    node.is_active = false;
                }
            }
            self.node_mut(owner)?.is_visible = true;
            child = owner;
        }
        self.node_mut(key)?.is_active = true;
        Ok(())
    }

    // --- Root lists -------------------------------------------------------

    /// Append detached `key` to the root's hidden dockables.
    pub fn add_hidden(&mut self, key: DockableKey) -> Result<(), DockError> {
        let root = self.root;
        self.check_attachable(root, key)?;
        self.root_state_mut()?.hidden.push(key);
        self.node_mut(key)?.owner = Some(root);
        Ok(())
    }

    /// Append detached `key` to one of the root's pinned edges.
    pub fn add_pinned(&mut self, edge: PinnedEdge, key: DockableKey) -> Result<(), DockError> {
        let root = self.root;
        self.check_attachable(root, key)?;
        self.root_state_mut()?.pinned_mut(edge).push(key);
        self.node_mut(key)?.owner = Some(root);
        Ok(())
    }

    /// Move a dockable out of its owner into the root's hidden list.
    pub fn hide_dockable(&mut self, key: DockableKey) -> Result<(), DockError> {
        self.apply_atomic(|tree| {
            tree.detach(key)?;
            tree.add_hidden(key)
        })
    }

    /// Move a tool out of its tool dock onto the edge matching the dock's
    /// alignment.
    pub fn pin_dockable(&mut self, key: DockableKey) -> Result<PinnedEdge, DockError> {
        let node = self.node(key)?;
        if !node.capabilities.contains(Capabilities::CAN_PIN) {
            return Err(DockError::invalid(key, Reason::CannotPin));
        }
        let Some(owner) = node.owner else {
            return Err(DockError::invalid(key, Reason::CannotPin));
        };
        let DockableKind::ToolDock { alignment, .. } = self.node(owner)?.kind else {
            return Err(DockError::invalid(owner, Reason::CannotPin));
        };
        let edge = PinnedEdge::for_alignment(alignment);
        self.apply_atomic(|tree| {
            tree.detach(key)?;
            tree.add_pinned(edge, key)?;
            Ok(edge)
        })
    }

    /// Return a pinned dockable to `target`.
    pub fn unpin_dockable(&mut self, key: DockableKey, target: DockableKey) -> Result<(), DockError> {
        if self.root_state().pinned_edge_of(key).is_none() {
            return Err(DockError::invalid(key, Reason::NotPinned));
        }
        self.apply_atomic(|tree| {
            tree.detach(key)?;
            tree.add_dockable(target, key)?;
            tree.set_active_dockable(target, Some(key))
        })
    }

    /// Show a pinned dockable in the edge flyout, or close the flyout.
    pub fn set_pinned_preview(&mut self, key: Option<DockableKey>) -> Result<(), DockError> {
        if let Some(key) = key
            && self.root_state().pinned_edge_of(key).is_none()
        {
            return Err(DockError::invalid(key, Reason::NotPinned));
        }
        self.root_state_mut()?.pinned_preview = key;
        Ok(())
    }

    // --- Floating windows -------------------------------------------------

    /// Host detached dock `layout` in a new floating window owned by the root.
    pub fn add_window(
        &mut self,
        mut window: DockWindow,
        layout: Option<DockableKey>,
    ) -> Result<(), DockError> {
        let root = self.root;
        if let Some(layout) = layout {
            self.check_attachable(root, layout)?;
            if !self.node(layout)?.is_dock() {
                return Err(DockError::invalid(layout, Reason::NotADock));
            }
        }
        window.layout = layout;
        self.root_state_mut()?.windows.push(window);
        if let Some(layout) = layout {
            self.node_mut(layout)?.owner = Some(root);
        }
        Ok(())
    }

    /// Detach `key` into a new floating window and return the window's dock.
    pub fn float_dockable(
        &mut self,
        key: DockableKey,
        window: DockWindow,
    ) -> Result<DockableKey, DockError> {
        let node = self.node(key)?;
        if key == self.root || !node.capabilities.contains(Capabilities::CAN_FLOAT) {
            return Err(DockError::invalid(key, Reason::CannotFloat));
        }
        let host_kind = match node.kind {
            DockableKind::Tool { .. } => DockableKind::ToolDock {
                alignment: Alignment::Unset,
                auto_hide: false,
                grip_mode: GripMode::Visible,
            },
            DockableKind::Document { .. } => DockableKind::DocumentDock {
                can_create_document: false,
                tabs_layout: DocumentTabLayout::Top,
            },
            _ => DockableKind::ProportionalDock {
                orientation: Orientation::Horizontal,
            },
        };
        self.apply_atomic(|tree| {
            tree.detach(key)?;
            let host = tree.insert(Dockable::new(String::new(), host_kind))?;
            tree.add_dockable(host, key)?;
            tree.set_active_dockable(host, Some(key))?;
            tree.add_window(window, Some(host))?;
            Ok(host)
        })
    }

    /// Close the floating window hosting `layout`, discarding its content.
    pub fn close_window(&mut self, layout: DockableKey) -> Result<Vec<DockableKey>, DockError> {
        let hosted = self
            .root_state()
            .windows
            .iter()
            .any(|window| window.layout == Some(layout));
        if !hosted {
            return Err(DockError::invalid(layout, Reason::WindowNotFound));
        }
        self.detach(layout)?;
        self.discard(layout)
    }

    // --- Close ------------------------------------------------------------

    /// Remove and free `key`, honouring `CAN_CLOSE` and the owner's
    /// close-last policy.
    pub fn close(&mut self, key: DockableKey) -> Result<DockableClosed, DockError> {
        if key == self.root {
            return Err(DockError::invalid(key, Reason::RootImmovable));
        }
        let node = self.node(key)?;
        if !node.capabilities.contains(Capabilities::CAN_CLOSE) {
            return Err(DockError::invalid(key, Reason::CannotClose));
        }
        let owner = node.owner;
        if let Some(owner) = owner {
            let owner_node = self.node(owner)?;
            if let Some(dock) = owner_node.dock()
                && dock.visible == [key]
                && !dock.can_close_last
            {
                return Err(DockError::invalid(key, Reason::LastDockableProtected));
            }
        }
        let (id, title, kind) = (node.id.clone(), node.title.clone(), node.kind);
        self.detach(key)?;
        let discarded = self.discard(key)?;
        tracing::debug!(
            target: "dockspace.tree",
            key = %key,
            id = %id,
            discarded = discarded.len(),
            "dockable closed"
        );
        Ok(DockableClosed {
            key,
            id,
            title,
            kind,
            owner,
            discarded,
        })
    }

    // --- Navigation -------------------------------------------------------

    /// Activate `target` in `dock` and record it in the dock's history.
    pub fn navigate(&mut self, dock: DockableKey, target: DockableKey) -> Result<bool, DockError> {
        let state = self.dock_state_mut(dock)?;
        if !state.contains(target) {
            return Err(DockError::invalid(target, Reason::NotAMember { container: dock }));
        }
        let recorded = state.navigation.navigate(target);
        state.active = Some(target);
        Ok(recorded)
    }

    pub fn go_back(&mut self, dock: DockableKey) -> Result<Option<DockableKey>, DockError> {
        let state = self.dock_state_mut(dock)?;
        let target = state.navigation.go_back();
        if target.is_some() {
            state.active = target;
        }
        Ok(target)
    }

    pub fn go_forward(&mut self, dock: DockableKey) -> Result<Option<DockableKey>, DockError> {
        let state = self.dock_state_mut(dock)?;
        let target = state.navigation.go_forward();
        if target.is_some() {
            state.active = target;
        }
        Ok(target)
    }

    /// Drop the current history entry; the previous entry becomes active.
    pub fn close_navigation(&mut self, dock: DockableKey) -> Result<Option<DockableKey>, DockError> {
        let state = self.dock_state_mut(dock)?;
        let removed = state.navigation.close();
        if let Some(current) = state.navigation.current() {
            state.active = Some(current);
        }
        Ok(removed)
    }

    // --- Queries ----------------------------------------------------------

    /// Owner and slot of `key`, if it is attached somewhere.
    #[must_use]
    pub fn membership(&self, key: DockableKey) -> Option<(DockableKey, Membership)> {
        let owner = self.nodes.get(&key)?.owner?;
        let owner_node = self.nodes.get(&owner)?;
        if let Some(index) = owner_node.dock().and_then(|dock| dock.position(key)) {
            return Some((owner, Membership::Visible(index)));
        }
        let root = owner_node.root_state()?;
        if let Some(index) = root.hidden.iter().position(|&k| k == key) {
            return Some((owner, Membership::Hidden(index)));
        }
        for edge in PinnedEdge::ALL {
            if let Some(index) = root.pinned(edge).iter().position(|&k| k == key) {
                return Some((owner, Membership::Pinned(edge, index)));
            }
        }
        root.windows
            .iter()
            .position(|window| window.layout == Some(key))
            .map(|index| (owner, Membership::Window(index)))
    }

    /// Owner chain of `key`, nearest first.
    #[must_use]
    pub fn ancestors(&self, key: DockableKey) -> Vec<DockableKey> {
        let mut chain = Vec::new();
        let mut current = self.nodes.get(&key).and_then(|node| node.owner);
        while let Some(owner) = current {
            if chain.contains(&owner) || chain.len() > self.nodes.len() {
                break;
            }
            chain.push(owner);
            current = self.nodes.get(&owner).and_then(|node| node.owner);
        }
        chain
    }

    /// Whether `key` is reachable from the root.
    #[must_use]
    pub fn is_attached(&self, key: DockableKey) -> bool {
        key == self.root || self.ancestors(key).last() == Some(&self.root)
    }

    /// Children of `key` in traversal order: visible first, then (for the
    /// root) hidden, pinned edges and window layouts.
    #[must_use]
    pub fn children(&self, key: DockableKey) -> Vec<DockableKey> {
        self.nodes.get(&key).map(child_keys).unwrap_or_default()
    }

    /// Preorder traversal of everything reachable from `start`.
    #[must_use]
    pub fn walk_from(&self, start: DockableKey) -> Vec<DockableKey> {
        let mut order = Vec::new();
        let mut seen = BTreeSet::new();
        let mut stack = vec![start];
        while let Some(key) = stack.pop() {
            if !seen.insert(key) {
                continue;
            }
            let Some(node) = self.nodes.get(&key) else {
                continue;
            };
            order.push(key);
            stack.extend(child_keys(node).into_iter().rev());
        }
        order
    }

    /// Preorder traversal of the attached tree.
    #[must_use]
    pub fn walk(&self) -> Vec<DockableKey> {
        self.walk_from(self.root)
    }

    /// First attached node with `id`, in traversal order.
    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<DockableKey> {
        if id.is_empty() {
            return None;
        }
        self.walk()
            .into_iter()
            .find(|key| self.nodes.get(key).is_some_and(|node| node.id == id))
    }

    /// First attached dock with `id`.
    #[must_use]
    pub fn find_dock_by_id(&self, id: &str) -> Option<DockableKey> {
        self.find_by_id(id)
            .filter(|key| self.nodes.get(key).is_some_and(Dockable::is_dock))
    }

    /// Nodes present in the arena but not reachable from the root.
    #[must_use]
    pub fn detached(&self) -> Vec<DockableKey> {
        let reachable: BTreeSet<_> = self.walk().into_iter().collect();
        self.nodes
            .keys()
            .copied()
            .filter(|key| !reachable.contains(key))
            .collect()
    }

    // --- Diagnostics ------------------------------------------------------

    /// Validate internal invariants, failing on the first error.
    pub fn validate(&self) -> Result<(), DockError> {
        let report = self.invariant_report();
        match report
            .issues
            .into_iter()
            .find(|issue| issue.severity == InvariantSeverity::Error)
        {
            Some(issue) => Err(DockError::Invariant {
                code: issue.code,
                node: issue.node,
                message: issue.message,
            }),
            None => Ok(()),
        }
    }

    /// Structured invariant diagnostics for the current tree.
    #[must_use]
    pub fn invariant_report(&self) -> InvariantReport {
        let mut issues = Vec::new();
        let mut push = |code, severity, node, related, message: String| {
            issues.push(InvariantIssue {
                code,
                severity,
                node,
                related,
                message,
            });
        };
        use InvariantCode as Code;
        use InvariantSeverity::{Error, Warning};

        match self.nodes.get(&self.root) {
            None => push(
                Code::MissingRoot,
                Error,
                Some(self.root),
                None,
                "root key has no node".into(),
            ),
            Some(root) => {
                if !root.kind.is_root() {
                    push(
                        Code::RootNotRootDock,
                        Error,
                        Some(self.root),
                        None,
                        format!("root is a {}", root.kind.name()),
                    );
                }
                if let Some(owner) = root.owner {
                    push(
                        Code::RootHasOwner,
                        Error,
                        Some(self.root),
                        Some(owner),
                        "root must not have an owner".into(),
                    );
                }
            }
        }

        let mut containers: BTreeMap<DockableKey, Vec<DockableKey>> = BTreeMap::new();
        for (&key, node) in &self.nodes {
            if node.kind.is_dock() != node.dock.is_some()
                || node.kind.is_root() != node.root.is_some()
            {
                push(
                    Code::DockStateMismatch,
                    Error,
                    Some(key),
                    None,
                    format!("{} carries mismatched container state", node.kind.name()),
                );
            }
            if node.kind.is_root() && key != self.root {
                push(
                    Code::ExtraRootDock,
                    Error,
                    Some(key),
                    Some(self.root),
                    "only one root dock may exist".into(),
                );
            }
            if key >= self.next_key {
                push(
                    Code::NextKeyNotGreater,
                    Error,
                    Some(key),
                    None,
                    format!("next key {} is not above {key}", self.next_key),
                );
            }
            if !node.proportion.is_nan() && !(node.proportion > 0.0 && node.proportion < 1.0) {
                push(
                    Code::InvalidProportion,
                    Warning,
                    Some(key),
                    None,
                    format!("proportion {} outside (0, 1)", node.proportion),
                );
            }
            for child in child_keys(node) {
                if self.nodes.contains_key(&child) {
                    containers.entry(child).or_default().push(key);
                } else {
                    push(
                        Code::MissingChild,
                        Error,
                        Some(key),
                        Some(child),
                        format!("list references missing node {child}"),
                    );
                }
            }
            if let Some(dock) = node.dock() {
                for (code, pointer) in [
                    (Code::DanglingActive, dock.active),
                    (Code::DanglingDefault, dock.default),
                    (Code::DanglingFocused, dock.focused),
                ] {
                    if let Some(target) = pointer
                        && !dock.contains(target)
                    {
                        push(
                            code,
                            Error,
                            Some(key),
                            Some(target),
                            format!("pointer targets non-member {target}"),
                        );
                    }
                }
            }
            if let Some(root) = node.root_state()
                && let Some(preview) = root.pinned_preview
                && root.pinned_edge_of(preview).is_none()
            {
                push(
                    Code::DanglingPinnedPreview,
                    Error,
                    Some(key),
                    Some(preview),
                    "pinned preview is not pinned".into(),
                );
            }
        }

        for (&key, node) in &self.nodes {
            let listed_by = containers.get(&key).map(Vec::as_slice).unwrap_or_default();
            if listed_by.len() > 1 {
                push(
                    Code::MultipleContainers,
                    Error,
                    Some(key),
                    Some(listed_by[1]),
                    format!("listed by {} containers", listed_by.len()),
                );
            }
            if key == self.root {
                if let Some(&container) = listed_by.first() {
                    push(
                        Code::RootHasOwner,
                        Error,
                        Some(key),
                        Some(container),
                        "root is listed as a child".into(),
                    );
                }
                continue;
            }
            if node.owner != listed_by.first().copied() {
                push(
                    Code::OwnerMismatch,
                    Error,
                    Some(key),
                    node.owner,
                    format!(
                        "owner {:?} but listed by {:?}",
                        node.owner,
                        listed_by.first()
                    ),
                );
            }
        }

        let reachable = self.walk();
        let reachable_set: BTreeSet<_> = reachable.iter().copied().collect();
        for &key in self.nodes.keys() {
            if !reachable_set.contains(&key) {
                push(
                    Code::UnreachableNode,
                    Warning,
                    Some(key),
                    None,
                    "node is not reachable from the root".into(),
                );
            }
        }

        let mut seen_ids: BTreeMap<&str, DockableKey> = BTreeMap::new();
        for key in reachable {
            let Some(node) = self.nodes.get(&key) else {
                continue;
            };
            if node.id.is_empty() {
                continue;
            }
            if let Some(&first) = seen_ids.get(node.id.as_str()) {
                push(
                    Code::DuplicateId,
                    Error,
                    Some(key),
                    Some(first),
                    format!("id {:?} is already used", node.id),
                );
            } else {
                seen_ids.insert(node.id.as_str(), key);
            }
        }

        InvariantReport {
            state_hash: self.state_hash(),
            issues,
        }
    }

    /// Deterministic hash of the full arena state, keys included.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hash = Fnv64::new();
        hash.u64(self.root.get());
        hash.u64(self.next_key.get());
        hash.u64(self.nodes.len() as u64);
        for (&key, node) in &self.nodes {
            hash.u64(key.get());
            hash.opt_u64(node.owner.map(DockableKey::get));
            hash_scalars(&mut hash, node);
            if let Some(dock) = node.dock() {
                hash.keys(&dock.visible, |key| Some(key.get()));
                for pointer in [dock.active, dock.default, dock.focused] {
                    hash.opt_u64(pointer.map(DockableKey::get));
                }
            }
            if let Some(root) = node.root_state() {
                hash_root_lists(&mut hash, root, &|key: DockableKey| Some(key.get()));
            }
        }
        hash.finish()
    }

    /// Key-independent structural hash of the attached tree.
    ///
    /// Two trees with the same ids, order, flags, geometry and pointer
    /// targets fingerprint equal regardless of how their keys were allocated.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let order = self.walk();
        let ordinals: BTreeMap<DockableKey, u64> = order
            .iter()
            .enumerate()
            .map(|(index, &key)| (key, index as u64))
            .collect();
        let ordinal = |key: DockableKey| ordinals.get(&key).copied();

        let mut hash = Fnv64::new();
        hash.u64(order.len() as u64);
        for key in order {
            let Some(node) = self.nodes.get(&key) else {
                continue;
            };
            hash_scalars(&mut hash, node);
            if let Some(dock) = node.dock() {
                hash.keys(&dock.visible, ordinal);
                for pointer in [dock.active, dock.default, dock.focused] {
                    hash.opt_u64(pointer.and_then(ordinal));
                }
            }
            if let Some(root) = node.root_state() {
                hash_root_lists(&mut hash, root, &ordinal);
            }
        }
        hash.finish()
    }

    // --- Internals --------------------------------------------------------

    fn node(&self, key: DockableKey) -> Result<&Dockable, DockError> {
        self.nodes
            .get(&key)
            .ok_or(DockError::UnknownDockable { key })
    }

    fn node_mut(&mut self, key: DockableKey) -> Result<&mut Dockable, DockError> {
        self.nodes
            .get_mut(&key)
            .ok_or(DockError::UnknownDockable { key })
    }

    fn dock_state(&self, key: DockableKey) -> Result<&DockState, DockError> {
        self.node(key)?
            .dock
            .as_ref()
            .ok_or(DockError::invalid(key, Reason::NotADock))
    }

    fn dock_state_mut(&mut self, key: DockableKey) -> Result<&mut DockState, DockError> {
        self.node_mut(key)?
            .dock
            .as_mut()
            .ok_or(DockError::invalid(key, Reason::NotADock))
    }

    fn root_state_mut(&mut self) -> Result<&mut RootState, DockError> {
        let root = self.root;
        self.node_mut(root)?
            .root
            .as_mut()
            .ok_or(DockError::invalid(root, Reason::NotARoot))
    }

    fn check_attachable(&self, container: DockableKey, key: DockableKey) -> Result<(), DockError> {
        if let Some(owner) = self.node(key)?.owner {
            return Err(DockError::invalid(key, Reason::AlreadyOwned { owner }));
        }
        self.check_container(container, key)
    }

    fn check_container(&self, container: DockableKey, key: DockableKey) -> Result<(), DockError> {
        if key == self.root {
            return Err(DockError::invalid(key, Reason::RootImmovable));
        }
        self.node(key)?;
        if !self.node(container)?.is_dock() {
            return Err(DockError::invalid(container, Reason::NotADock));
        }
        if container == key || self.ancestors(container).contains(&key) {
            return Err(DockError::invalid(key, Reason::WouldCreateCycle));
        }
        Ok(())
    }
}

fn clear_pointers_to(dock: &mut DockState, key: DockableKey) {
    for pointer in [&mut dock.active, &mut dock.default, &mut dock.focused] {
        if *pointer == Some(key) {
            *pointer = None;
        }
    }
    dock.navigation.remove(key);
}

fn child_keys(node: &Dockable) -> Vec<DockableKey> {
    let mut children = node
        .dock()
        .map(|dock| dock.visible.clone())
        .unwrap_or_default();
    if let Some(root) = node.root_state() {
        children.extend_from_slice(&root.hidden);
        for edge in PinnedEdge::ALL {
            children.extend_from_slice(root.pinned(edge));
        }
        children.extend(root.windows.iter().filter_map(|window| window.layout));
    }
    children
}

/// FNV-1a accumulator.
struct Fnv64(u64);

impl Fnv64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0001_0000_01b3;

    const fn new() -> Self {
        Self(Self::OFFSET_BASIS)
    }

    fn byte(&mut self, byte: u8) {
        self.0 ^= u64::from(byte);
        self.0 = self.0.wrapping_mul(Self::PRIME);
    }

    fn bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.byte(byte);
        }
    }

    fn u64(&mut self, value: u64) {
        self.bytes(&value.to_le_bytes());
    }

    fn bool(&mut self, value: bool) {
        self.byte(u8::from(value));
    }

    fn f64(&mut self, value: f64) {
        let bits = if value.is_nan() {
            f64::NAN.to_bits()
        } else {
            value.to_bits()
        };
        self.u64(bits);
    }

    fn str(&mut self, value: &str) {
        self.u64(value.len() as u64);
        self.bytes(value.as_bytes());
    }

    fn opt_u64(&mut self, value: Option<u64>) {
        match value {
            Some(value) => {
                self.byte(1);
                self.u64(value);
            }
            None => self.byte(0),
        }
    }

    fn keys(&mut self, keys: &[DockableKey], map: impl Fn(DockableKey) -> Option<u64>) {
        self.u64(keys.len() as u64);
        for &key in keys {
            self.opt_u64(map(key));
        }
    }

    const fn finish(&self) -> u64 {
        self.0
    }
}

fn hash_scalars(hash: &mut Fnv64, node: &Dockable) {
    hash.str(&node.id);
    hash.str(&node.title);
    hash.str(node.kind.name());
    match node.kind {
        DockableKind::Tool { content } | DockableKind::Document { content } => {
            hash.opt_u64(content.map(|content| content.0));
        }
        DockableKind::Splitter { can_resize } => hash.bool(can_resize),
        DockableKind::RootDock { is_focusable_root } => hash.bool(is_focusable_root),
        DockableKind::ProportionalDock { orientation } => hash.byte(orientation as u8),
        DockableKind::ToolDock {
            alignment,
            auto_hide,
            grip_mode,
        } => {
            hash.byte(alignment as u8);
            hash.bool(auto_hide);
            hash.byte(grip_mode as u8);
        }
        DockableKind::DocumentDock {
            can_create_document,
            tabs_layout,
        } => {
            hash.bool(can_create_document);
            hash.byte(tabs_layout as u8);
        }
    }
    hash.f64(node.proportion);
    hash.f64(node.collapsed_proportion);
    hash.bool(node.is_collapsable);
    hash.u64(u64::from(node.grid.column));
    hash.u64(u64::from(node.grid.row));
    hash.u64(u64::from(node.grid.column_span));
    hash.u64(u64::from(node.grid.row_span));
    hash.byte(node.capabilities.bits());
    hash.bool(node.is_visible);
    hash.bool(node.is_active);
    if let Some(dock) = node.dock() {
        hash.bool(dock.can_close_last);
    }
}

fn hash_root_lists(
    hash: &mut Fnv64,
    root: &RootState,
    map: &dyn Fn(DockableKey) -> Option<u64>,
) {
    hash.keys(&root.hidden, map);
    for edge in PinnedEdge::ALL {
        hash.keys(root.pinned(edge), map);
    }
    hash.opt_u64(root.pinned_preview.and_then(map));
    hash.u64(root.windows.len() as u64);
    for window in &root.windows {
        hash.str(&window.id);
        hash.str(&window.title);
        hash.f64(window.geometry.x);
        hash.f64(window.geometry.y);
        hash.f64(window.geometry.width);
        hash.f64(window.geometry.height);
        hash.bool(window.topmost);
        hash.opt_u64(window.layout.and_then(map));
    }
}
