//! Restoring a persisted layout.
//!
//! All work happens on a private tree decoded from the persisted text.
//! The live tree is never touched here; callers swap the result in only
//! when [`restore_layout`] returns `Ok`.
//!
//! Phases:
//! 1. decode through [`LayoutCodec`],
//! 2. substitute tool stubs with live registered singletons,
//! 3. drop any persisted document leaves,
//! 4. reset the document dock,
//! 5. repair pathological geometry,
//! 6. validate,
//! 7. register latent pane templates.

use dockspace_core::{Alignment, DockTree, Dockable, DockableKey, DockableKind, Factory};
use dockspace_layout::{DecodeIssue, LayoutCodec};
use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::error::RestoreError;
use crate::policy::{LatentPanePolicy, LayoutPolicy};
use crate::registry::Registry;

/// A proportion rewritten by geometry repair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeometryRepair {
    pub id: String,
    /// Restored value; `None` when it was NaN.
    pub from: Option<f64>,
    pub to: f64,
}

/// Every anomaly recovered during a restore.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RestoreReport {
    pub decode_issues: Vec<DecodeIssue>,
    /// Ids of stubs replaced by live tools.
    pub substituted: Vec<String>,
    /// Ids of stubs with no live registration; they were removed.
    pub orphaned: Vec<String>,
    /// Document leaves removed from the restored tree.
    pub cleared_documents: usize,
    pub repairs: Vec<GeometryRepair>,
    /// Latent pane templates registered after the restore.
    pub latent_registered: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RestoredLayout {
    pub tree: DockTree,
    pub report: RestoreReport,
}

/// Decode `text` and rebuild a live layout from it.
///
/// `registry` is only modified once every other phase has succeeded.
pub fn restore_layout(
    text: &str,
    policy: &LayoutPolicy,
    registry: &mut Registry,
    factory: &Factory,
    codec: &LayoutCodec,
) -> Result<RestoredLayout, RestoreError> {
    let span = tracing::debug_span!(target: "dockspace.restore", "restore_layout", bytes = text.len());
    let _guard = span.enter();

    let decoded = codec.deserialize(text)?;
    let mut report = RestoreReport {
        decode_issues: decoded.issues,
        ..RestoreReport::default()
    };
    let mut tree = decoded.tree;

    substitute_stubs(&mut tree, registry, factory, &mut report)?;
    report.cleared_documents += remove_documents(&mut tree)?;
    let document_dock = reset_document_dock(&mut tree, policy, &mut report)?;
    repair_geometry(&mut tree, policy, document_dock, &mut report);
    tree.validate()?;

    report.latent_registered = register_latent_panes(registry, factory, policy);

    tracing::info!(
        target: "dockspace.restore",
        substituted = report.substituted.len(),
        orphaned = report.orphaned.len(),
        decode_issues = report.decode_issues.len(),
        repairs = report.repairs.len(),
        "layout restored"
    );
    Ok(RestoredLayout { tree, report })
}

/// Replace every tool stub with its live registration, or drop it.
///
/// Each registered id is spliced in once; later stubs with the same id are
/// treated as orphans.
fn substitute_stubs(
    tree: &mut DockTree,
    registry: &Registry,
    factory: &Factory,
    report: &mut RestoreReport,
) -> Result<(), RestoreError> {
    let stubs: Vec<DockableKey> = tree
        .walk()
        .into_iter()
        .filter(|&key| tree.get(key).is_some_and(Dockable::is_stub))
        .collect();
    let mut placed = FxHashSet::default();

    for stub in stubs {
        let Some(node) = tree.get(stub) else {
            continue;
        };
        let id = node.id.clone();
        let registration = registry
            .lookup(&id)
            .filter(|_| !placed.contains(id.as_str()));
        match registration {
            Some(registration) => {
                let mut live = registration.instantiate(factory);
                live.is_visible = node.is_visible;
                live.is_active = node.is_active;
                live.proportion = node.proportion;
                live.collapsed_proportion = node.collapsed_proportion;
                live.grid = node.grid;
                let key = tree.insert(live)?;
                tree.replace_dockable(stub, key)?;
                tree.discard(stub)?;
                tracing::debug!(target: "dockspace.restore", id = %id, "stub replaced by live tool");
                placed.insert(id.clone());
                report.substituted.push(id);
            }
            None => {
                tree.detach(stub)?;
                tree.discard(stub)?;
                tracing::debug!(target: "dockspace.restore", id = %id, "orphan tool stub removed");
                report.orphaned.push(id);
            }
        }
    }
    Ok(())
}

fn remove_documents(tree: &mut DockTree) -> Result<usize, RestoreError> {
    let documents: Vec<DockableKey> = tree
        .walk()
        .into_iter()
        .filter(|&key| {
            tree.get(key)
                .is_some_and(|node| matches!(node.kind(), DockableKind::Document { .. }))
        })
        .collect();
    for &key in &documents {
        tree.detach(key)?;
        tree.discard(key)?;
    }
    Ok(documents.len())
}

fn reset_document_dock(
    tree: &mut DockTree,
    policy: &LayoutPolicy,
    report: &mut RestoreReport,
) -> Result<DockableKey, RestoreError> {
    let id = &policy.ids.document_dock;
    let Some(dock) = tree
        .find_dock_by_id(id)
        .filter(|&key| {
            tree.get(key)
                .is_some_and(|node| matches!(node.kind(), DockableKind::DocumentDock { .. }))
        })
    else {
        return Err(RestoreError::MissingContainer { id: id.clone() });
    };

    for child in tree.children(dock) {
        tree.remove_dockable(dock, child)?;
        report.cleared_documents += tree.discard(child)?.len();
    }
    tree.set_active_dockable(dock, None)?;
    tree.set_default_dockable(dock, None)?;
    tree.set_focused_dockable(dock, None)?;
    if let Some(node) = tree.get_mut(dock) {
        node.proportion = f64::NAN;
    }
    Ok(dock)
}

fn repair_geometry(
    tree: &mut DockTree,
    policy: &LayoutPolicy,
    document_dock: DockableKey,
    report: &mut RestoreReport,
) {
    let repair = &policy.repair;
    for key in tree.walk() {
        let Some(node) = tree.get_mut(key) else {
            continue;
        };
        let from = node.proportion;
        let to = if key == document_dock {
            node.is_collapsable = false;
            (from.is_nan() || from < repair.document_min).then_some(repair.document_default)
        } else if matches!(node.kind(), DockableKind::ToolDock { .. }) {
            (from > repair.auxiliary_max).then_some(repair.auxiliary_default)
        } else {
            None
        };
        if let Some(to) = to {
            node.proportion = to;
            tracing::debug!(
                target: "dockspace.restore",
                id = %node.id,
                from,
                to,
                "proportion repaired"
            );
            report.repairs.push(GeometryRepair {
                id: node.id.clone(),
                from: (!from.is_nan()).then_some(from),
                to,
            });
        }
    }
}

/// Detached container for a latent pane, as described by `pane`.
#[must_use]
pub fn latent_container(factory: &Factory, pane: &LatentPanePolicy) -> Dockable {
    let alignment = match pane.alignment {
        Alignment::Unset => Alignment::Top,
        other => other,
    };
    factory
        .create_tool_dock(pane.container_id.clone(), alignment)
        .with_title(pane.title.clone())
        .with_proportion(pane.proportion)
}

/// Register a container and splitter template for every latent pane.
///
/// Returns the ids registered, containers and splitters interleaved.
pub fn register_latent_panes(
    registry: &mut Registry,
    factory: &Factory,
    policy: &LayoutPolicy,
) -> Vec<String> {
    let mut registered = Vec::with_capacity(policy.latent_panes.len() * 2);
    for pane in &policy.latent_panes {
        registry.register_dockable(latent_container(factory, pane));
        registry.register_dockable(factory.create_proportional_dock_splitter(pane.splitter_id.clone()));
        registered.push(pane.container_id.clone());
        registered.push(pane.splitter_id.clone());
    }
    registered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::default_layout::build_default_layout;
    use crate::registry::ToolRegistration;
    use dockspace_core::ContentHandle;

    fn registry_with(ids: &[&str]) -> Registry {
        let mut registry = Registry::new();
        for (n, id) in ids.iter().enumerate() {
            registry.register_tool(ToolRegistration::new(*id, *id, ContentHandle(n as u64 + 1)));
        }
        registry
    }

    /// Default layout with an extra tool and an open document, saved.
    fn saved_layout(extra_tool: &str) -> String {
        let factory = Factory::new();
        let policy = LayoutPolicy::default();
        let layout =
            build_default_layout(&factory, &policy, &registry_with(&["Assembly"])).expect("layout");
        let mut tree = layout.tree;
        tree.attach(layout.left_dock, factory.create_tool(extra_tool, extra_tool, Some(ContentHandle(9))))
            .expect("extra tool");
        let document = tree
            .attach(layout.document_dock, factory.create_document("Doc1", "Doc1", Some(ContentHandle(10))))
            .expect("document");
        tree.activate_path(document).expect("activate document");
        let snapshot = dockspace_layout::build_snapshot(&tree).expect("snapshot");
        LayoutCodec::new().serialize(&snapshot.tree).expect("encode")
    }

    #[test]
    fn stubs_become_live_tools_and_orphans_disappear() {
        let text = saved_layout("Analyzer");
        let mut registry = registry_with(&["Assembly"]);
        let restored = restore_layout(
            &text,
            &LayoutPolicy::default(),
            &mut registry,
            &Factory::new(),
            &LayoutCodec::new(),
        )
        .expect("restore");

        let tree = &restored.tree;
        assert!(tree.validate().is_ok());
        let tool = tree.find_by_id("Assembly").expect("assembly");
        assert_eq!(tree.get(tool).and_then(Dockable::content), Some(ContentHandle(1)));
        assert!(tree.find_by_id("Analyzer").is_none());
        assert_eq!(restored.report.substituted, ["Assembly"]);
        assert_eq!(restored.report.orphaned, ["Analyzer"]);

        let left = tree.find_dock_by_id("LeftDock").expect("left");
        assert_eq!(tree.dock(left).and_then(|dock| dock.active()), Some(tool));
        assert_eq!(tree.dock(left).and_then(|dock| dock.default_dockable()), Some(tool));
    }

    #[test]
    fn document_dock_is_reset_and_repaired() {
        let text = saved_layout("Analyzer");
        let mut registry = registry_with(&["Assembly"]);
        let restored = restore_layout(
            &text,
            &LayoutPolicy::default(),
            &mut registry,
            &Factory::new(),
            &LayoutCodec::new(),
        )
        .expect("restore");

        let tree = &restored.tree;
        let docs = tree.find_dock_by_id("DocumentDock").expect("documents");
        let state = tree.dock(docs).expect("dock state");
        assert!(state.visible().is_empty());
        assert_eq!(state.active(), None);
        let node = tree.get(docs).expect("node");
        assert_eq!(node.proportion, 0.7);
        assert!(!node.is_collapsable);
        assert!(restored
            .report
            .repairs
            .iter()
            .any(|repair| repair.id == "DocumentDock" && repair.from.is_none()));
    }

    #[test]
    fn oversized_tool_dock_is_clamped() {
        let text = r#"{
            "format_version": 1,
            "root": {"$id": "1", "$type": "RootDock", "id": "Root", "visible_dockables": [
                {"$id": "2", "$type": "ProportionalDock", "id": "MainLayout", "orientation": "horizontal",
                 "visible_dockables": [
                    {"$id": "3", "$type": "ToolDock", "id": "LeftDock", "alignment": "left", "proportion": 0.95},
                    {"$id": "4", "$type": "DocumentDock", "id": "DocumentDock", "proportion": 0.05}
                 ]}
            ]}
        }"#;
        let mut registry = Registry::new();
        let restored = restore_layout(
            text,
            &LayoutPolicy::default(),
            &mut registry,
            &Factory::new(),
            &LayoutCodec::new(),
        )
        .expect("restore");
        let tree = &restored.tree;
        let left = tree.find_by_id("LeftDock").expect("left");
        assert_eq!(tree.get(left).map(|node| node.proportion), Some(0.25));
        assert_eq!(restored.report.repairs.len(), 2);
        assert_eq!(restored.report.repairs[0], GeometryRepair {
            id: "LeftDock".into(),
            from: Some(0.95),
            to: 0.25,
        });
    }

    #[test]
    fn duplicate_stub_ids_keep_only_the_first() {
        let text = r#"{
            "format_version": 1,
            "root": {"$id": "1", "$type": "RootDock", "id": "Root", "visible_dockables": [
                {"$id": "2", "$type": "ToolDock", "id": "LeftDock", "visible_dockables": [
                    {"$id": "3", "$type": "Tool", "id": "Assembly"}
                ]},
                {"$id": "4", "$type": "ToolDock", "id": "RightTools", "visible_dockables": [
                    {"$id": "5", "$type": "Tool", "id": "Assembly"}
                ]},
                {"$id": "6", "$type": "DocumentDock", "id": "DocumentDock"}
            ]}
        }"#;
        let mut registry = registry_with(&["Assembly"]);
        let restored = restore_layout(
            text,
            &LayoutPolicy::default(),
            &mut registry,
            &Factory::new(),
            &LayoutCodec::new(),
        )
        .expect("restore");
        assert_eq!(restored.report.substituted, ["Assembly"]);
        assert_eq!(restored.report.orphaned, ["Assembly"]);
        let right = restored.tree.find_by_id("RightTools").expect("right");
        assert!(restored.tree.children(right).is_empty());
    }

    #[test]
    fn failures_leave_the_registry_untouched() {
        let mut registry = registry_with(&["Assembly"]);
        let policy = LayoutPolicy::default();
        let factory = Factory::new();
        let codec = LayoutCodec::new();

        let err = restore_layout("{ nope", &policy, &mut registry, &factory, &codec)
            .expect_err("malformed");
        assert!(err.is_deserialization_failure());

        let no_documents = r#"{"format_version": 1,
            "root": {"$id": "1", "$type": "RootDock", "id": "Root"}}"#;
        let err = restore_layout(no_documents, &policy, &mut registry, &factory, &codec)
            .expect_err("missing container");
        assert!(matches!(err, RestoreError::MissingContainer { ref id } if id == "DocumentDock"));
        assert!(registry.dockable_template("SearchDock").is_none());
    }

    #[test]
    fn latent_templates_follow_the_policy() {
        let mut registry = Registry::new();
        let factory = Factory::new();
        let registered = register_latent_panes(&mut registry, &factory, &LayoutPolicy::default());
        assert_eq!(registered, ["SearchDock", "SearchSplitter"]);
        let container = registry.dockable_template("SearchDock").expect("container");
        assert_eq!(container.title, "Search");
        assert_eq!(container.proportion, 0.25);
        assert!(matches!(
            container.kind(),
            DockableKind::ToolDock {
                alignment: Alignment::Top,
                ..
            }
        ));
        assert!(matches!(
            registry.dockable_template("SearchSplitter").map(|node| node.kind()),
            Some(DockableKind::Splitter { .. })
        ));
    }
}
