//! Layout text codec.
//!
//! Encoding walks the tree from the root, giving each node a
//! serialization-local `$id` the first time it is reached and writing a
//! `{"$ref"}` on every later visit. Lists are emitted before pointers, so
//! active/default/focused pointers always come out as references.
//!
//! Decoding runs in fixed phases:
//! 1. parse and check the format version,
//! 2. normalize list shapes ([`crate::normalize_lists`]),
//! 3. materialize every `$id` exactly once as a detached node,
//! 4. link list memberships through [`DockTree`] operations,
//! 5. restore pointers, nulling any that no longer name a member,
//! 6. discard nodes that nothing attached.
//!
//! Recoverable defects are collected as [`DecodeIssue`]s; only malformed
//! text and structural impossibilities fail the decode.

use dockspace_core::{
    DockError, DockPointer, DockTree, DockableKey, Factory, PinnedEdge, WindowGeometry,
};
use rustc_hash::FxHashMap;
use serde::Serialize;
use thiserror::Error;

use crate::document::{
    LAYOUT_FORMAT_VERSION, LayoutDocument, NodeDef, NodeKindName, NodeRef, NodeSlot, WindowDef,
    WireList,
};
use crate::normalize::normalize_lists;

/// Errors that abort a decode or encode.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("layout text is malformed: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("layout format version {found} is not supported (max {supported})")]
    UnsupportedVersion { found: u16, supported: u16 },
    #[error("layout root must be an inline RootDock definition")]
    InvalidRoot,
    #[error("reference id {ref_id:?} is defined more than once")]
    DuplicateReference { ref_id: String },
    #[error("node {ref_id:?} is a second RootDock")]
    MultipleRoots { ref_id: String },
    #[error("failed to encode layout: {0}")]
    Encode(#[source] serde_json::Error),
    #[error(transparent)]
    Tree(#[from] DockError),
}

/// Recoverable defect found while decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum DecodeIssue {
    /// A list or pointer named a `$ref` that was never defined.
    DanglingReference {
        owner: String,
        field: &'static str,
        target: String,
    },
    /// A list entry could not be linked (already owned, wrong container kind).
    RejectedMembership {
        owner: String,
        child: String,
        reason: String,
    },
    /// A pointer named a node that is not a visible member of its dock.
    NonMemberPointer {
        owner: String,
        field: &'static str,
        target: String,
    },
    /// A defined node that no list attached; it was discarded.
    Unattached { node: String },
}

/// Result of a successful decode.
#[derive(Debug, Clone)]
pub struct DecodedLayout {
    pub tree: DockTree,
    pub issues: Vec<DecodeIssue>,
}

/// JSON layout codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutCodec {
    pretty: bool,
}

impl LayoutCodec {
    #[must_use]
    pub const fn new() -> Self {
        Self { pretty: false }
    }

    /// Emit indented JSON.
    #[must_use]
    pub const fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Encode `tree` as layout text.
    pub fn serialize(&self, tree: &DockTree) -> Result<String, CodecError> {
        let document = self.encode(tree);
        let text = if self.pretty {
            serde_json::to_string_pretty(&document)
        } else {
            serde_json::to_string(&document)
        };
        text.map_err(CodecError::Encode)
    }

    /// Build the persisted document for `tree`'s attached nodes.
    #[must_use]
    pub fn encode(&self, tree: &DockTree) -> LayoutDocument {
        let mut encoder = Encoder {
            tree,
            ids: FxHashMap::default(),
        };
        // The root key is always present in the arena.
        let root = encoder.slot(tree.root()).unwrap_or_else(|| {
            NodeSlot::Def(Box::new(NodeDef::from_dockable(
                "1".to_owned(),
                &Factory::new().create_root_dock(String::new()),
            )))
        });
        LayoutDocument {
            format_version: LAYOUT_FORMAT_VERSION,
            root,
            extensions: Default::default(),
        }
    }

    /// Decode layout text into a fresh tree.
    pub fn deserialize(&self, text: &str) -> Result<DecodedLayout, CodecError> {
        let document: LayoutDocument =
            serde_json::from_str(text).map_err(CodecError::Malformed)?;
        self.decode(document)
    }

    /// Decode an already-parsed document.
    pub fn decode(&self, mut document: LayoutDocument) -> Result<DecodedLayout, CodecError> {
        if document.format_version == 0 || document.format_version > LAYOUT_FORMAT_VERSION {
            return Err(CodecError::UnsupportedVersion {
                found: document.format_version,
                supported: LAYOUT_FORMAT_VERSION,
            });
        }
        let rewritten = normalize_lists(&mut document);
        if rewritten > 0 {
            tracing::trace!(target: "dockspace.codec", rewritten, "normalized list shapes");
        }

        let NodeSlot::Def(root_def) = &document.root else {
            return Err(CodecError::InvalidRoot);
        };
        if root_def.kind != NodeKindName::RootDock {
            return Err(CodecError::InvalidRoot);
        }

        let mut decoder = Decoder {
            tree: DockTree::new(root_def.to_dockable())?,
            keys: FxHashMap::default(),
            issues: Vec::new(),
        };
        let defs = document.definitions();
        decoder.materialize(&defs)?;
        for def in &defs {
            decoder.link(def);
        }
        for def in &defs {
            decoder.restore_pointers(def);
        }
        decoder.discard_unattached();

        if !decoder.issues.is_empty() {
            tracing::debug!(
                target: "dockspace.codec",
                issues = decoder.issues.len(),
                "layout decoded with recoverable issues"
            );
        }
        Ok(DecodedLayout {
            tree: decoder.tree,
            issues: decoder.issues,
        })
    }
}

struct Encoder<'t> {
    tree: &'t DockTree,
    ids: FxHashMap<DockableKey, String>,
}

impl Encoder<'_> {
    fn slot(&mut self, key: DockableKey) -> Option<NodeSlot> {
        if let Some(target) = self.ids.get(&key) {
            return Some(NodeSlot::Ref(NodeRef {
                target: target.clone(),
            }));
        }
        let tree = self.tree;
        let node = tree.get(key)?;
        let ref_id = (self.ids.len() + 1).to_string();
        self.ids.insert(key, ref_id.clone());
        let mut def = NodeDef::from_dockable(ref_id, node);

        if let Some(dock) = node.dock() {
            def.visible_dockables = Some(self.list(dock.visible()));
        }
        if let Some(root) = node.root_state() {
            def.hidden_dockables = Some(self.list(root.hidden()));
            def.left_pinned_dockables = Some(self.list(root.pinned(PinnedEdge::Left)));
            def.right_pinned_dockables = Some(self.list(root.pinned(PinnedEdge::Right)));
            def.top_pinned_dockables = Some(self.list(root.pinned(PinnedEdge::Top)));
            def.bottom_pinned_dockables = Some(self.list(root.pinned(PinnedEdge::Bottom)));
            let windows = root
                .windows()
                .iter()
                .map(|window| WindowDef {
                    id: window.id.clone(),
                    title: window.title.clone(),
                    x: window.geometry.x,
                    y: window.geometry.y,
                    width: window.geometry.width,
                    height: window.geometry.height,
                    topmost: window.topmost,
                    layout: window.layout().and_then(|layout| self.slot(layout)),
                })
                .collect();
            def.windows = Some(WireList::Items(windows));
            def.pinned_dockable = root.pinned_preview().and_then(|key| self.slot(key));
        }
        if let Some(dock) = node.dock() {
            def.active_dockable = dock.active().and_then(|key| self.slot(key));
            def.default_dockable = dock.default_dockable().and_then(|key| self.slot(key));
            def.focused_dockable = dock.focused().and_then(|key| self.slot(key));
        }
        Some(NodeSlot::Def(Box::new(def)))
    }

    fn list(&mut self, keys: &[DockableKey]) -> WireList<NodeSlot> {
        WireList::Items(keys.iter().filter_map(|&key| self.slot(key)).collect())
    }
}

struct Decoder {
    tree: DockTree,
    keys: FxHashMap<String, DockableKey>,
    issues: Vec<DecodeIssue>,
}

impl Decoder {
    fn materialize(&mut self, defs: &[&NodeDef]) -> Result<(), CodecError> {
        for (index, def) in defs.iter().enumerate() {
            if self.keys.contains_key(&def.ref_id) {
                return Err(CodecError::DuplicateReference {
                    ref_id: def.ref_id.clone(),
                });
            }
            let key = if index == 0 {
                self.tree.root()
            } else {
                if def.kind == NodeKindName::RootDock {
                    return Err(CodecError::MultipleRoots {
                        ref_id: def.ref_id.clone(),
                    });
                }
                self.tree.insert(def.to_dockable())?
            };
            self.keys.insert(def.ref_id.clone(), key);
        }
        Ok(())
    }

    fn resolve(&self, slot: &NodeSlot) -> Option<DockableKey> {
        self.keys.get(slot.ref_id()).copied()
    }

    fn owner_key(&self, def: &NodeDef) -> Option<DockableKey> {
        self.keys.get(&def.ref_id).copied()
    }

    fn link(&mut self, def: &NodeDef) {
        let Some(owner) = self.owner_key(def) else {
            return;
        };
        if def.kind.is_dock() {
            let children = list_items(def.visible_dockables.as_ref());
            self.link_list(def, "visible_dockables", children, |tree, child| {
                tree.add_dockable(owner, child)
            });
        }
        if def.kind != NodeKindName::RootDock || owner != self.tree.root() {
            return;
        }
        self.link_list(
            def,
            "hidden_dockables",
            list_items(def.hidden_dockables.as_ref()),
            DockTree::add_hidden,
        );
        for (edge, field, list) in [
            (PinnedEdge::Left, "left_pinned_dockables", &def.left_pinned_dockables),
            (PinnedEdge::Right, "right_pinned_dockables", &def.right_pinned_dockables),
            (PinnedEdge::Top, "top_pinned_dockables", &def.top_pinned_dockables),
            (PinnedEdge::Bottom, "bottom_pinned_dockables", &def.bottom_pinned_dockables),
        ] {
            self.link_list(def, field, list_items(list.as_ref()), |tree, child| {
                tree.add_pinned(edge, child)
            });
        }

        let windows = def.windows.as_ref().map(WireList::items).unwrap_or_default();
        let factory = Factory::new();
        for window in windows {
            let layout = match window.layout.as_ref() {
                Some(slot) => match self.resolve(slot) {
                    Some(key) => Some((key, slot)),
                    None => {
                        self.dangling(def, "windows", slot);
                        None
                    }
                },
                None => None,
            };
            let mut host = factory.create_dock_window(window.id.clone(), WindowGeometry {
                x: window.x,
                y: window.y,
                width: window.width,
                height: window.height,
            });
            host.title.clone_from(&window.title);
            host.topmost = window.topmost;
            if let Err(err) = self.tree.add_window(host, layout.map(|(key, _)| key)) {
                let child = layout.map_or_else(String::new, |(_, slot)| slot.ref_id().to_owned());
                self.issues.push(DecodeIssue::RejectedMembership {
                    owner: def.id.clone(),
                    child,
                    reason: err.to_string(),
                });
            }
        }
    }

    fn link_list(
        &mut self,
        def: &NodeDef,
        field: &'static str,
        slots: &[NodeSlot],
        mut attach: impl FnMut(&mut DockTree, DockableKey) -> Result<(), DockError>,
    ) {
        for slot in slots {
            let Some(child) = self.resolve(slot) else {
                self.dangling(def, field, slot);
                continue;
            };
            if let Err(err) = attach(&mut self.tree, child) {
                self.issues.push(DecodeIssue::RejectedMembership {
                    owner: def.id.clone(),
                    child: slot.ref_id().to_owned(),
                    reason: err.to_string(),
                });
            }
        }
    }

    fn restore_pointers(&mut self, def: &NodeDef) {
        let Some(owner) = self.owner_key(def) else {
            return;
        };
        if def.kind.is_dock() {
            for (pointer, field, slot) in [
                (DockPointer::Active, "active_dockable", &def.active_dockable),
                (DockPointer::Default, "default_dockable", &def.default_dockable),
                (DockPointer::Focused, "focused_dockable", &def.focused_dockable),
            ] {
                let Some(slot) = slot else {
                    continue;
                };
                let Some(target) = self.resolve(slot) else {
                    self.dangling(def, field, slot);
                    continue;
                };
                if self.tree.set_pointer(owner, pointer, Some(target)).is_err() {
                    self.non_member(def, field, slot);
                }
            }
        }
        if owner == self.tree.root()
            && let Some(slot) = def.pinned_dockable.as_ref()
        {
            let Some(target) = self.resolve(slot) else {
                self.dangling(def, "pinned_dockable", slot);
                return;
            };
            if self.tree.set_pinned_preview(Some(target)).is_err() {
                self.non_member(def, "pinned_dockable", slot);
            }
        }
    }

    fn discard_unattached(&mut self) {
        for key in self.tree.detached() {
            let Some(node) = self.tree.get(key) else {
                continue;
            };
            if node.owner().is_some() {
                continue;
            }
            let id = node.id.clone();
            if let Ok(removed) = self.tree.discard(key) {
                tracing::trace!(target: "dockspace.codec", node = %id, removed = removed.len(), "discarded unattached node");
                self.issues.push(DecodeIssue::Unattached { node: id });
            }
        }
    }

    fn dangling(&mut self, def: &NodeDef, field: &'static str, slot: &NodeSlot) {
        self.issues.push(DecodeIssue::DanglingReference {
            owner: def.id.clone(),
            field,
            target: slot.ref_id().to_owned(),
        });
    }

    fn non_member(&mut self, def: &NodeDef, field: &'static str, slot: &NodeSlot) {
        self.issues.push(DecodeIssue::NonMemberPointer {
            owner: def.id.clone(),
            field,
            target: slot.ref_id().to_owned(),
        });
    }
}

fn list_items(list: Option<&WireList<NodeSlot>>) -> &[NodeSlot] {
    list.map(WireList::items).unwrap_or_default()
}
