//! Persistence snapshots of a live layout.
//!
//! A snapshot is an independent tree safe to encode: structural nodes are
//! copied one-to-one, tools become identity-only stubs and documents are
//! dropped. The live tree is never mutated. Every clone is recorded in an
//! identity map keyed by the live node, so a pointer is remapped to the
//! same clone its target list entry produced.

use dockspace_core::{DockError, DockPointer, DockTree, DockableKey, Persistence, PinnedEdge};
use rustc_hash::FxHashMap;

/// What a snapshot kept, stubbed and dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotReport {
    /// Structural nodes copied, root included.
    pub cloned: usize,
    /// Ids of tools written as stubs.
    pub stubbed: Vec<String>,
    /// Ids of dropped documents.
    pub dropped: Vec<String>,
    /// Pointers that referenced a dropped node and were nulled.
    pub nulled_pointers: usize,
}

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub tree: DockTree,
    pub report: SnapshotReport,
}

/// Builds [`Snapshot`]s; one builder per snapshot.
#[derive(Debug)]
pub struct SnapshotBuilder<'a> {
    live: &'a DockTree,
    clones: FxHashMap<DockableKey, DockableKey>,
    report: SnapshotReport,
}

/// Snapshot `live` for persistence.
pub fn build_snapshot(live: &DockTree) -> Result<Snapshot, DockError> {
    SnapshotBuilder::new(live).build()
}

impl<'a> SnapshotBuilder<'a> {
    #[must_use]
    pub fn new(live: &'a DockTree) -> Self {
        Self {
            live,
            clones: FxHashMap::default(),
            report: SnapshotReport::default(),
        }
    }

    pub fn build(mut self) -> Result<Snapshot, DockError> {
        let live = self.live;
        let live_root = live.root();
        let root = live
            .get(live_root)
            .ok_or(DockError::UnknownDockable { key: live_root })?;
        let mut tree = DockTree::new(root.detached_copy())?;
        let snapshot_root = tree.root();
        self.clones.insert(live_root, snapshot_root);
        self.report.cloned += 1;

        self.clone_visible(&mut tree, live_root, snapshot_root)?;

        let state = live.root_state();
        for &key in state.hidden() {
            if let Some(copy) = self.clone_subtree(&mut tree, key)? {
                tree.add_hidden(copy)?;
            }
        }
        for edge in PinnedEdge::ALL {
            for &key in state.pinned(edge) {
                if let Some(copy) = self.clone_subtree(&mut tree, key)? {
                    tree.add_pinned(edge, copy)?;
                }
            }
        }
        for window in state.windows() {
            let layout = match window.layout() {
                Some(key) => self.clone_subtree(&mut tree, key)?,
                None => None,
            };
            tree.add_window(window.clone(), layout)?;
        }

        self.remap_pointers(&mut tree)?;

        tracing::debug!(
            target: "dockspace.snapshot",
            cloned = self.report.cloned,
            stubbed = self.report.stubbed.len(),
            dropped = self.report.dropped.len(),
            nulled = self.report.nulled_pointers,
            "layout snapshot built"
        );
        Ok(Snapshot {
            tree,
            report: self.report,
        })
    }

    /// Clone `key` and its visible descendants as a detached subtree.
    fn clone_subtree(
        &mut self,
        tree: &mut DockTree,
        key: DockableKey,
    ) -> Result<Option<DockableKey>, DockError> {
        if self.clones.contains_key(&key) {
            return Ok(None);
        }
        let live = self.live;
        let Some(node) = live.get(key) else {
            return Ok(None);
        };
        let copy = match node.kind().persistence() {
            Persistence::Transient => {
                self.report.dropped.push(node.id.clone());
                return Ok(None);
            }
            Persistence::Stub => {
                self.report.stubbed.push(node.id.clone());
                tree.insert(node.stub())?
            }
            Persistence::Structural => {
                self.report.cloned += 1;
                tree.insert(node.detached_copy())?
            }
        };
        self.clones.insert(key, copy);
        self.clone_visible(tree, key, copy)?;
        Ok(Some(copy))
    }

    fn clone_visible(
        &mut self,
        tree: &mut DockTree,
        original: DockableKey,
        copy: DockableKey,
    ) -> Result<(), DockError> {
        let live = self.live;
        let Some(dock) = live.dock(original) else {
            return Ok(());
        };
        for &child in dock.visible() {
            if let Some(child_copy) = self.clone_subtree(tree, child)? {
                tree.add_dockable(copy, child_copy)?;
            }
        }
        Ok(())
    }

    fn remap_pointers(&mut self, tree: &mut DockTree) -> Result<(), DockError> {
        let live = self.live;
        for (&original, &copy) in &self.clones {
            let Some(dock) = live.dock(original) else {
                continue;
            };
            for (pointer, target) in [
                (DockPointer::Active, dock.active()),
                (DockPointer::Default, dock.default_dockable()),
                (DockPointer::Focused, dock.focused()),
            ] {
                let Some(target) = target else {
                    continue;
                };
                match self.clones.get(&target) {
                    Some(&mapped) => tree.set_pointer(copy, pointer, Some(mapped))?,
                    None => self.report.nulled_pointers += 1,
                }
            }
        }
        if let Some(preview) = live.root_state().pinned_preview() {
            match self.clones.get(&preview) {
                Some(&mapped) => tree.set_pinned_preview(Some(mapped))?,
                None => self.report.nulled_pointers += 1,
            }
        }
        Ok(())
    }
}
