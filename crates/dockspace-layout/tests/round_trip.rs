//! Encode/decode behaviour over generated layouts and hand-written documents.

use dockspace_core::{
    Alignment, DockTree, Dockable, DockableKey, DockableKind, Factory, Orientation, PinnedEdge,
};
use dockspace_layout::{
    DecodeIssue, LayoutCodec, LayoutDocument, NodeSlot, WireList, build_snapshot, normalize_lists,
};
use proptest::prelude::*;

fn proportion(seed: u16) -> f64 {
    if seed % 3 == 0 {
        f64::NAN
    } else {
        f64::from(seed % 90 + 5) / 100.0
    }
}

/// Grow a layout from `(kind, seed)` steps. Every generated id is unique.
fn grow(steps: &[(u8, u16)]) -> DockTree {
    let factory = Factory::new();
    let mut tree = factory.create_layout("Root");
    let mut docks = vec![tree.root()];
    for (serial, &(kind, seed)) in steps.iter().enumerate() {
        let container = docks[usize::from(seed) % docks.len()];
        let node = match kind % 7 {
            0 => factory.create_tool(format!("tool-{serial}"), "Tool", None),
            1 => factory.create_document(format!("doc-{serial}"), "Doc", None),
            2 => factory.create_tool_dock(format!("tools-{serial}"), Alignment::Right),
            3 => factory.create_document_dock(format!("docs-{serial}")),
            4 => factory.create_proportional_dock(format!("split-{serial}"), Orientation::Vertical),
            5 => factory.create_proportional_dock_splitter(""),
            _ => {
                let key = tree
                    .insert(factory.create_tool(format!("hidden-{serial}"), "Hidden", None))
                    .expect("insert");
                tree.add_hidden(key).expect("hide");
                continue;
            }
        }
        .with_proportion(proportion(seed));
        let is_dock = node.is_dock();
        let key = tree.attach(container, node).expect("attach");
        if is_dock {
            docks.push(key);
        }
        if seed % 4 == 0 {
            tree.activate_path(key).expect("activate");
        }
        if seed % 5 == 0
            && let Some(owner) = tree.get(key).and_then(Dockable::owner)
        {
            tree.set_focused_dockable(owner, Some(key)).expect("focus");
        }
    }
    tree
}

fn id_of(tree: &DockTree, key: Option<DockableKey>) -> Option<String> {
    key.and_then(|key| tree.get(key)).map(|node| node.id.clone())
}

fn pointer_ids(tree: &DockTree) -> Vec<(String, Option<String>, Option<String>)> {
    tree.walk()
        .into_iter()
        .filter_map(|key| {
            let node = tree.get(key)?;
            let dock = node.dock()?;
            Some((
                node.id.clone(),
                id_of(tree, dock.active()),
                id_of(tree, dock.focused()),
            ))
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn decode_of_encode_is_structurally_identical(
        steps in prop::collection::vec((any::<u8>(), any::<u16>()), 0..40)
    ) {
        let tree = grow(&steps);
        let codec = LayoutCodec::new();
        let text = codec.serialize(&tree).expect("encode");
        let decoded = codec.deserialize(&text).expect("decode");

        prop_assert!(decoded.issues.is_empty(), "{:?}", decoded.issues);
        prop_assert!(decoded.tree.validate().is_ok());
        prop_assert_eq!(decoded.tree.fingerprint(), tree.fingerprint());
        prop_assert_eq!(pointer_ids(&decoded.tree), pointer_ids(&tree));
    }

    #[test]
    fn snapshots_survive_the_codec(
        steps in prop::collection::vec((any::<u8>(), any::<u16>()), 0..40)
    ) {
        let tree = grow(&steps);
        let snapshot = build_snapshot(&tree).expect("snapshot");
        prop_assert!(snapshot.tree.validate().is_ok());
        let no_documents = snapshot.tree.walk().into_iter().all(|key| {
            snapshot.tree.get(key).is_some_and(|node| {
                !matches!(node.kind(), DockableKind::Document { .. })
            })
        });
        prop_assert!(no_documents);

        let codec = LayoutCodec::new().pretty(true);
        let decoded = codec
            .deserialize(&codec.serialize(&snapshot.tree).expect("encode"))
            .expect("decode");
        prop_assert_eq!(decoded.tree.fingerprint(), snapshot.tree.fingerprint());
    }

    #[test]
    fn normalization_is_idempotent(
        steps in prop::collection::vec((any::<u8>(), any::<u16>()), 0..24)
    ) {
        let mut document = LayoutCodec::new().encode(&grow(&steps));
        normalize_lists(&mut document);
        let once = document.clone();
        prop_assert_eq!(normalize_lists(&mut document), 0);
        prop_assert_eq!(document, once);
    }
}

#[test]
fn wrapped_lists_decode_like_plain_arrays() {
    let wrapped = r#"{
        "format_version": 1,
        "root": {
            "$id": "1", "$type": "RootDock", "id": "Root",
            "visible_dockables": {"$values": [
                {"$id": "2", "$type": "ToolDock", "id": "LeftDock", "alignment": "left",
                 "proportion": 0.3,
                 "visible_dockables": {"$values": [
                    {"$id": "3", "$type": "Tool", "id": "Assembly", "title": "Assemblies"}
                 ]},
                 "active_dockable": {"$ref": "3"}}
            ]},
            "left_pinned_dockables": {"$values": [
                {"$id": "4", "$type": "Tool", "id": "Analyzer"}
            ]},
            "pinned_dockable": {"$ref": "4"},
            "active_dockable": {"$ref": "2"}
        }
    }"#;
    let codec = LayoutCodec::new();
    let decoded = codec.deserialize(wrapped).expect("decode");
    assert!(decoded.issues.is_empty(), "{:?}", decoded.issues);
    let tree = decoded.tree;
    let left = tree.find_by_id("LeftDock").expect("left");
    let tool = tree.find_by_id("Assembly").expect("tool");
    let pinned = tree.find_by_id("Analyzer").expect("pinned");
    assert_eq!(tree.dock(left).and_then(|dock| dock.active()), Some(tool));
    assert_eq!(tree.root_state().pinned(PinnedEdge::Left), [pinned]);
    assert_eq!(tree.root_state().pinned_preview(), Some(pinned));
    assert_eq!(tree.get(left).map(|node| node.proportion), Some(0.3));

    // Re-encoding always writes plain arrays.
    let text = codec.serialize(&tree).expect("encode");
    assert!(!text.contains("$values"));
}

#[test]
fn unknown_attributes_are_ignored() {
    let text = r#"{
        "format_version": 1,
        "theme": "dark",
        "root": {"$id": "1", "$type": "RootDock", "id": "Root", "legacy_flag": 7,
                 "visible_dockables": [{"$id": "2", "$type": "DocumentDock", "id": "DocumentDock",
                                        "tab_strip_color": "blue"}]}
    }"#;
    let decoded = LayoutCodec::new().deserialize(text).expect("decode");
    assert!(decoded.tree.find_dock_by_id("DocumentDock").is_some());
}

#[test]
fn shared_definition_is_linked_once() {
    // The same node listed by two containers keeps its first owner.
    let text = r#"{
        "format_version": 1,
        "root": {"$id": "1", "$type": "RootDock", "id": "Root",
                 "visible_dockables": [
                    {"$id": "2", "$type": "ToolDock", "id": "A",
                     "visible_dockables": [{"$id": "4", "$type": "Tool", "id": "Shared"}]},
                    {"$id": "3", "$type": "ToolDock", "id": "B",
                     "visible_dockables": [{"$ref": "4"}]}
                 ]}
    }"#;
    let decoded = LayoutCodec::new().deserialize(text).expect("decode");
    let tree = &decoded.tree;
    let a = tree.find_by_id("A").expect("a");
    let b = tree.find_by_id("B").expect("b");
    let shared = tree.find_by_id("Shared").expect("shared");
    assert_eq!(tree.children(a), [shared]);
    assert!(tree.children(b).is_empty());
    assert!(matches!(
        decoded.issues.as_slice(),
        [DecodeIssue::RejectedMembership { owner, child, .. }] if owner == "B" && child == "4"
    ));
}

#[test]
fn encoded_document_uses_one_definition_per_node() {
    let factory = Factory::new();
    let mut tree = factory.create_layout("Root");
    let root = tree.root();
    let dock = tree
        .attach(root, factory.create_tool_dock("LeftDock", Alignment::Left))
        .expect("dock");
    let tool = tree
        .attach(dock, factory.create_tool("Assembly", "Assemblies", None))
        .expect("tool");
    tree.activate_path(tool).expect("activate");
    tree.set_default_dockable(dock, Some(tool)).expect("default");
    tree.set_focused_dockable(dock, Some(tool)).expect("focus");

    let document: LayoutDocument = LayoutCodec::new().encode(&tree);
    let definitions = document.definitions();
    assert_eq!(definitions.len(), 3);
    let NodeSlot::Def(root_def) = &document.root else {
        panic!("root inline");
    };
    let Some(WireList::Items(children)) = &root_def.visible_dockables else {
        panic!("plain list");
    };
    let NodeSlot::Def(dock_def) = &children[0] else {
        panic!("dock inline");
    };
    for pointer in [
        &dock_def.active_dockable,
        &dock_def.default_dockable,
        &dock_def.focused_dockable,
    ] {
        assert!(matches!(pointer, Some(NodeSlot::Ref(reference)) if reference.target == "3"));
    }
}
