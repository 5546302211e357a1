//! Showing a tool, inserting it (and its container) when needed.
//!
//! Every mutation runs inside [`DockTree::apply_atomic`], so a failed
//! activation leaves the tree exactly as it was. Activating the same tool
//! twice yields the same tree as activating it once.

use dockspace_core::{
    DockError, DockTree, Dockable, DockableKey, DockableKind, Factory, Membership,
};

use crate::policy::{LatentPanePolicy, LayoutPolicy};
use crate::registry::{Registry, ToolRegistration};
use crate::restore::latent_container;

/// What [`activate_tool`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// The tool was already in the layout and is now active and focused.
    Focused { key: DockableKey },
    /// The tool was inserted into `container`.
    Attached {
        key: DockableKey,
        container: DockableKey,
        /// The container itself was inserted as a latent pane.
        container_inserted: bool,
        /// The document dock was wrapped to get the pane's arrangement.
        wrapper_inserted: bool,
    },
    /// No registration and no node carries this id.
    NotRegistered,
    /// The target container is absent and cannot be created, or is not a
    /// tool dock.
    TargetUnavailable { target: String },
    /// The tree refused the change; nothing was modified.
    Failed { reason: String },
}

/// Where an activated tool comes from.
#[derive(Clone, Copy)]
enum ToolSource<'a> {
    /// Already in the tree, but hidden or floating.
    Parked(DockableKey),
    Registered(&'a ToolRegistration),
}

/// Make tool `id` visible, active and focused.
pub fn activate_tool(
    tree: &mut DockTree,
    registry: &Registry,
    factory: &Factory,
    policy: &LayoutPolicy,
    id: &str,
) -> Result<ActivationOutcome, DockError> {
    let span = tracing::debug_span!(target: "dockspace.activation", "activate_tool", tool = id);
    let _guard = span.enter();

    let existing = find_leaf(tree, id)
        .and_then(|key| tree.membership(key).map(|(_, membership)| (key, membership)));
    let hidden = match existing {
        Some((key, Membership::Visible(_))) => {
            tree.apply_atomic(|tree| focus(tree, key))?;
            tracing::debug!(target: "dockspace.activation", tool = id, "tool focused");
            return Ok(ActivationOutcome::Focused { key });
        }
        Some((key, Membership::Pinned(..))) => {
            tree.apply_atomic(|tree| {
                tree.set_pinned_preview(Some(key))?;
                if let Some(node) = tree.get_mut(key) {
                    node.is_visible = true;
                }
                Ok(())
            })?;
            tracing::debug!(target: "dockspace.activation", tool = id, "pinned tool previewed");
            return Ok(ActivationOutcome::Focused { key });
        }
        Some((key, Membership::Hidden(_) | Membership::Window(_))) => Some(key),
        None => None,
    };

    let source = match (hidden, registry.lookup(id)) {
        (Some(key), _) => ToolSource::Parked(key),
        (None, Some(registration)) => ToolSource::Registered(registration),
        (None, None) => {
            tracing::debug!(target: "dockspace.activation", tool = id, "tool not registered");
            return Ok(ActivationOutcome::NotRegistered);
        }
    };

    let target = policy.target_for(id);
    let latent = policy.latent_pane(target);
    let outcome = tree.apply_atomic(|tree| {
        let mut container_inserted = false;
        let mut wrapper_inserted = false;
        let container = match tree.find_dock_by_id(target) {
            Some(container) => container,
            None => {
                let Some(pane) = latent else {
                    return Ok(ActivationOutcome::TargetUnavailable {
                        target: target.to_owned(),
                    });
                };
                let Some(document_dock) = tree.find_dock_by_id(&policy.ids.document_dock) else {
                    return Ok(ActivationOutcome::TargetUnavailable {
                        target: target.to_owned(),
                    });
                };
                let (host, wrapped) = arrangement_host(tree, factory, pane, document_dock)?;
                wrapper_inserted = wrapped;
                let template = registry
                    .dockable_template(&pane.container_id)
                    .cloned()
                    .unwrap_or_else(|| latent_container(factory, pane));
                let container = tree.insert(template)?;
                tree.insert_dockable(host, 0, container)?;
                container_inserted = true;
                container
            }
        };
        if !matches!(
            tree.get(container).map(|node| node.kind()),
            Some(DockableKind::ToolDock { .. })
        ) {
            return Ok(ActivationOutcome::TargetUnavailable {
                target: target.to_owned(),
            });
        }
        if let Some(pane) = latent {
            ensure_splitter(tree, registry, factory, pane, container)?;
        }

        let key = match source {
            ToolSource::Parked(key) => {
                tree.detach(key)?;
                tree.add_dockable(container, key)?;
                key
            }
            ToolSource::Registered(registration) => {
                tree.attach(container, registration.instantiate(factory))?
            }
        };
        if let Some(node) = tree.get_mut(container) {
            node.is_visible = true;
        }
        focus(tree, key)?;
        Ok(ActivationOutcome::Attached {
            key,
            container,
            container_inserted,
            wrapper_inserted,
        })
    })?;

    match &outcome {
        ActivationOutcome::Attached {
            container_inserted,
            wrapper_inserted,
            ..
        } => tracing::info!(
            target: "dockspace.activation",
            tool = id,
            container = target,
            container_inserted,
            wrapper_inserted,
            "tool attached"
        ),
        ActivationOutcome::TargetUnavailable { target } => tracing::warn!(
            target: "dockspace.activation",
            tool = id,
            container = %target,
            "activation target unavailable"
        ),
        _ => {}
    }
    Ok(outcome)
}

/// First tool or document with `id`, anywhere in the tree.
fn find_leaf(tree: &DockTree, id: &str) -> Option<DockableKey> {
    if id.is_empty() {
        return None;
    }
    tree.walk().into_iter().find(|&key| {
        tree.get(key).is_some_and(|node| {
            node.id == id
                && matches!(
                    node.kind(),
                    DockableKind::Tool { .. } | DockableKind::Document { .. }
                )
        })
    })
}

/// Activate `key` up the owner chain and focus it in its owner.
pub(crate) fn focus(tree: &mut DockTree, key: DockableKey) -> Result<(), DockError> {
    tree.activate_path(key)?;
    if let Some(owner) = tree.get(key).and_then(Dockable::owner)
        && tree.dock(owner).is_some_and(|dock| dock.contains(key))
    {
        tree.set_focused_dockable(owner, Some(key))?;
    }
    Ok(())
}

/// Dock in which a latent pane is inserted next to `document_dock`.
///
/// When the document dock's owner does not already arrange its children in
/// the pane's direction, the document dock is wrapped in a new proportional
/// dock that takes over its slot and proportion.
fn arrangement_host(
    tree: &mut DockTree,
    factory: &Factory,
    pane: &LatentPanePolicy,
    document_dock: DockableKey,
) -> Result<(DockableKey, bool), DockError> {
    let node = tree
        .get(document_dock)
        .ok_or(DockError::UnknownDockable { key: document_dock })?;
    let proportion = node.proportion;
    if let Some(parent) = node.owner()
        && tree.get(parent).and_then(Dockable::orientation) == Some(pane.arrangement)
        && tree.dock(parent).is_some_and(|dock| dock.contains(document_dock))
    {
        return Ok((parent, false));
    }

    let wrapper = tree.insert(
        factory
            .create_proportional_dock(pane.wrapper_id.clone(), pane.arrangement)
            .with_proportion(proportion),
    )?;
    tree.replace_dockable(document_dock, wrapper)?;
    tree.add_dockable(wrapper, document_dock)?;
    tree.set_active_dockable(wrapper, Some(document_dock))?;
    tracing::debug!(
        target: "dockspace.activation",
        wrapper = %pane.wrapper_id,
        "document dock wrapped"
    );
    Ok((wrapper, true))
}

/// Insert the pane's splitter right after `container` unless one exists.
fn ensure_splitter(
    tree: &mut DockTree,
    registry: &Registry,
    factory: &Factory,
    pane: &LatentPanePolicy,
    container: DockableKey,
) -> Result<(), DockError> {
    if tree.find_by_id(&pane.splitter_id).is_some() {
        return Ok(());
    }
    let Some((owner, Membership::Visible(index))) = tree.membership(container) else {
        return Ok(());
    };
    let splitter = registry
        .dockable_template(&pane.splitter_id)
        .cloned()
        .unwrap_or_else(|| factory.create_proportional_dock_splitter(pane.splitter_id.clone()));
    let splitter = tree.insert(splitter)?;
    tree.insert_dockable(owner, index + 1, splitter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::default_layout::build_default_layout;
    use crate::restore::register_latent_panes;
    use dockspace_core::{Alignment, ContentHandle, Orientation};

    fn setup() -> (Factory, LayoutPolicy, Registry) {
        let factory = Factory::new();
        let policy = LayoutPolicy::default();
        let mut registry = Registry::new();
        registry.register_tool(ToolRegistration::new("Assembly", "Assemblies", ContentHandle(1)));
        registry.register_tool(ToolRegistration::new("Search", "Search", ContentHandle(2)));
        registry.register_tool(ToolRegistration::new("Analyzer", "Analyzer", ContentHandle(3)));
        register_latent_panes(&mut registry, &factory, &policy);
        (factory, policy, registry)
    }

    fn ids(tree: &DockTree, keys: &[DockableKey]) -> Vec<String> {
        keys.iter()
            .filter_map(|&key| tree.get(key).map(|node| node.id.clone()))
            .collect()
    }

    #[test]
    fn latent_pane_is_inserted_above_documents() {
        let (factory, policy, registry) = setup();
        let mut tree = build_default_layout(&factory, &policy, &registry)
            .expect("layout")
            .tree;
        let outcome =
            activate_tool(&mut tree, &registry, &factory, &policy, "Search").expect("activate");
        let ActivationOutcome::Attached {
            key,
            container,
            container_inserted: true,
            wrapper_inserted: false,
        } = outcome
        else {
            panic!("unexpected outcome {outcome:?}");
        };

        let right = tree.find_by_id("RightDock").expect("right");
        assert_eq!(ids(&tree, &tree.children(right)), [
            "SearchDock",
            "SearchSplitter",
            "DocumentDock"
        ]);
        assert_eq!(tree.children(container), [key]);
        let dock = tree.dock(container).expect("dock");
        assert_eq!(dock.active(), Some(key));
        assert_eq!(dock.focused(), Some(key));
        assert!(tree.get(key).is_some_and(|node| node.is_active && node.is_visible));
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn activating_twice_changes_nothing() {
        let (factory, policy, registry) = setup();
        let mut tree = build_default_layout(&factory, &policy, &registry)
            .expect("layout")
            .tree;
        activate_tool(&mut tree, &registry, &factory, &policy, "Search").expect("first");
        let once = tree.state_hash();
        let outcome =
            activate_tool(&mut tree, &registry, &factory, &policy, "Search").expect("second");
        assert!(matches!(outcome, ActivationOutcome::Focused { .. }));
        assert_eq!(tree.state_hash(), once);
    }

    #[test]
    fn horizontal_parent_gets_a_vertical_wrapper() {
        let (factory, policy, registry) = setup();
        let mut tree = factory.create_layout("Root");
        let root = tree.root();
        let main = tree
            .attach(root, factory.create_proportional_dock("MainLayout", Orientation::Horizontal))
            .expect("main");
        tree.attach(main, factory.create_tool_dock("LeftDock", Alignment::Left))
            .expect("left");
        let docs = tree
            .attach(main, factory.create_document_dock("DocumentDock").with_proportion(0.6))
            .expect("docs");
        tree.set_active_dockable(main, Some(docs)).expect("active");

        let outcome =
            activate_tool(&mut tree, &registry, &factory, &policy, "Search").expect("activate");
        assert!(matches!(
            outcome,
            ActivationOutcome::Attached {
                wrapper_inserted: true,
                ..
            }
        ));
        let wrapper = tree.find_by_id("DocumentArea").expect("wrapper");
        assert_eq!(ids(&tree, &tree.children(main)), ["LeftDock", "DocumentArea"]);
        assert_eq!(tree.dock(main).and_then(|dock| dock.active()), Some(wrapper));
        let node = tree.get(wrapper).expect("wrapper node");
        assert_eq!(node.orientation(), Some(Orientation::Vertical));
        assert_eq!(node.proportion, 0.6);
        assert_eq!(ids(&tree, &tree.children(wrapper)), [
            "SearchDock",
            "SearchSplitter",
            "DocumentDock"
        ]);
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn default_target_receives_other_tools() {
        let (factory, policy, registry) = setup();
        let mut tree = build_default_layout(&factory, &policy, &registry)
            .expect("layout")
            .tree;
        let outcome =
            activate_tool(&mut tree, &registry, &factory, &policy, "Analyzer").expect("activate");
        let ActivationOutcome::Attached {
            container,
            container_inserted: false,
            ..
        } = outcome
        else {
            panic!("unexpected outcome {outcome:?}");
        };
        assert_eq!(tree.find_by_id("LeftDock"), Some(container));
        assert_eq!(ids(&tree, &tree.children(container)), ["Assembly", "Analyzer"]);
        assert!(tree.find_by_id("SearchSplitter").is_none());
    }

    #[test]
    fn unknown_tools_and_unusable_targets_leave_the_tree_alone() {
        let (factory, mut policy, registry) = setup();
        let mut tree = build_default_layout(&factory, &policy, &registry)
            .expect("layout")
            .tree;
        let before = tree.state_hash();
        assert_eq!(
            activate_tool(&mut tree, &registry, &factory, &policy, "Nope").expect("activate"),
            ActivationOutcome::NotRegistered
        );
        policy
            .placement
            .targets
            .insert("Analyzer".into(), "DocumentDock".into());
        assert_eq!(
            activate_tool(&mut tree, &registry, &factory, &policy, "Analyzer").expect("activate"),
            ActivationOutcome::TargetUnavailable {
                target: "DocumentDock".into()
            }
        );
        assert_eq!(tree.state_hash(), before);
    }

    #[test]
    fn hidden_tools_are_moved_back_into_place() {
        let (factory, policy, registry) = setup();
        let mut tree = build_default_layout(&factory, &policy, &registry)
            .expect("layout")
            .tree;
        let hidden = tree
            .insert(factory.create_tool("Analyzer", "Analyzer", Some(ContentHandle(3))))
            .expect("insert");
        tree.add_hidden(hidden).expect("hide");

        let outcome =
            activate_tool(&mut tree, &registry, &factory, &policy, "Analyzer").expect("activate");
        assert!(matches!(outcome, ActivationOutcome::Attached { key, .. } if key == hidden));
        assert!(tree.root_state().hidden().is_empty());
        let left = tree.find_by_id("LeftDock").expect("left");
        assert_eq!(tree.dock(left).and_then(|dock| dock.focused()), Some(hidden));
    }

    #[test]
    fn parked_tools_return_without_a_registration() {
        let (factory, policy, registry) = setup();
        let mut tree = build_default_layout(&factory, &policy, &registry)
            .expect("layout")
            .tree;
        let parked = tree
            .insert(factory.create_tool("Scratch", "Scratch", Some(ContentHandle(9))))
            .expect("insert");
        tree.add_hidden(parked).expect("hide");
        assert!(registry.lookup("Scratch").is_none());

        let outcome =
            activate_tool(&mut tree, &registry, &factory, &policy, "Scratch").expect("activate");
        assert!(matches!(outcome, ActivationOutcome::Attached { key, .. } if key == parked));
        assert_eq!(tree.find_by_id("Scratch"), Some(parked));
        assert!(tree.validate().is_ok());
    }
}
