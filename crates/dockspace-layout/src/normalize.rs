//! List-shape normalization for decoded layout documents.
//!
//! Older writers emitted collections wrapped as `{"$values": [...]}`, and
//! some omitted empty collections entirely. After this pass every list on a
//! container is a present, plain array. Running it twice changes nothing.

use crate::document::{LayoutDocument, NodeDef, NodeKindName, NodeSlot, WireList};

/// Rewrite every list in `document` into canonical form.
///
/// Returns the number of lists that were rewritten or materialized; a second
/// pass over the same document always returns `0`.
pub fn normalize_lists(document: &mut LayoutDocument) -> usize {
    let mut rewritten = 0;
    normalize_slot(&mut document.root, &mut rewritten);
    rewritten
}

fn normalize_slot(slot: &mut NodeSlot, rewritten: &mut usize) {
    if let NodeSlot::Def(def) = slot {
        normalize_def(def, rewritten);
    }
}

fn normalize_def(def: &mut NodeDef, rewritten: &mut usize) {
    let is_dock = def.kind.is_dock();
    let is_root = def.kind == NodeKindName::RootDock;

    canonical(&mut def.visible_dockables, is_dock, rewritten);
    for list in [
        &mut def.hidden_dockables,
        &mut def.left_pinned_dockables,
        &mut def.right_pinned_dockables,
        &mut def.top_pinned_dockables,
        &mut def.bottom_pinned_dockables,
    ] {
        canonical(list, is_root, rewritten);
    }
    canonical(&mut def.windows, is_root, rewritten);

    for list in [
        &mut def.visible_dockables,
        &mut def.hidden_dockables,
        &mut def.left_pinned_dockables,
        &mut def.right_pinned_dockables,
        &mut def.top_pinned_dockables,
        &mut def.bottom_pinned_dockables,
    ]
    .into_iter()
    .flatten()
    {
        if let WireList::Items(items) = list {
            for child in items {
                normalize_slot(child, rewritten);
            }
        }
    }
    if let Some(WireList::Items(windows)) = def.windows.as_mut() {
        for layout in windows.iter_mut().filter_map(|window| window.layout.as_mut()) {
            normalize_slot(layout, rewritten);
        }
    }
    for pointer in [
        &mut def.active_dockable,
        &mut def.default_dockable,
        &mut def.focused_dockable,
        &mut def.pinned_dockable,
    ]
    .into_iter()
    .flatten()
    {
        normalize_slot(pointer, rewritten);
    }
}

/// Unwrap `$values` and, when `required`, materialize a missing list.
fn canonical<T>(list: &mut Option<WireList<T>>, required: bool, rewritten: &mut usize) {
    match list.take() {
        Some(WireList::Wrapped { values }) => {
            *rewritten += 1;
            *list = Some(WireList::Items(values));
        }
        None if required => {
            *rewritten += 1;
            *list = Some(WireList::Items(Vec::new()));
        }
        other => *list = other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::LAYOUT_FORMAT_VERSION;

    fn parse(text: &str) -> LayoutDocument {
        serde_json::from_str(text).expect("document")
    }

    #[test]
    fn wrapped_and_missing_lists_become_plain_arrays() {
        let mut document = parse(
            r#"{
                "format_version": 1,
                "root": {
                    "$id": "1", "$type": "RootDock", "id": "Root",
                    "visible_dockables": {"$values": [
                        {"$id": "2", "$type": "ToolDock", "id": "LeftDock",
                         "visible_dockables": {"$values": [
                            {"$id": "3", "$type": "Tool", "id": "Assembly"}
                         ]}}
                    ]}
                }
            }"#,
        );
        assert_eq!(document.format_version, LAYOUT_FORMAT_VERSION);

        // root: visible unwrapped + 4 pinned + hidden + windows materialized;
        // LeftDock: visible unwrapped.
        assert_eq!(normalize_lists(&mut document), 8);

        let NodeSlot::Def(root) = &document.root else {
            panic!("root must be inline");
        };
        assert!(root.visible_dockables.as_ref().is_some_and(WireList::is_plain));
        assert!(root.hidden_dockables.as_ref().is_some_and(|l| l.items().is_empty()));
        assert!(root.windows.as_ref().is_some_and(WireList::is_plain));
        let NodeSlot::Def(left) = &root.visible_dockables.as_ref().expect("visible").items()[0]
        else {
            panic!("left dock must be inline");
        };
        assert!(left.visible_dockables.as_ref().is_some_and(WireList::is_plain));
        assert!(left.hidden_dockables.is_none());
        let NodeSlot::Def(tool) = &left.visible_dockables.as_ref().expect("tools").items()[0]
        else {
            panic!("tool must be inline");
        };
        assert!(tool.visible_dockables.is_none());
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let mut document = parse(
            r#"{
                "format_version": 1,
                "root": {"$id": "1", "$type": "RootDock", "id": "Root",
                         "windows": {"$values": [{"id": "W", "layout":
                            {"$id": "2", "$type": "DocumentDock", "id": "Floating"}}]}}
            }"#,
        );
        assert!(normalize_lists(&mut document) > 0);
        let once = document.clone();
        assert_eq!(normalize_lists(&mut document), 0);
        assert_eq!(document, once);
    }
}
