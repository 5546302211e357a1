//! The stock layout built when nothing usable was persisted.
//!
//! ```text
//! Root
//! └─ MainLayout (horizontal)
//!    ├─ LeftDock (tool dock, 0.3) ─ primary tool
//!    ├─ splitter
//!    └─ RightDock (vertical)
//!       └─ DocumentDock
//! ```

use dockspace_core::{Alignment, DockError, DockTree, DockableKey, Factory, Orientation};

use crate::policy::LayoutPolicy;
use crate::registry::Registry;

/// A freshly built default layout and the keys callers usually need.
#[derive(Debug, Clone)]
pub struct DefaultLayout {
    pub tree: DockTree,
    pub left_dock: DockableKey,
    pub document_dock: DockableKey,
    /// `None` when the primary tool is not registered.
    pub primary_tool: Option<DockableKey>,
}

/// Build the default layout described by `policy`.
///
/// The primary tool is taken from `registry`; when it is not registered the
/// left dock is left empty.
pub fn build_default_layout(
    factory: &Factory,
    policy: &LayoutPolicy,
    registry: &Registry,
) -> Result<DefaultLayout, DockError> {
    let ids = &policy.ids;
    let mut tree = factory.create_layout(ids.root.clone());
    let root = tree.root();
    if let Some(node) = tree.get_mut(root) {
        node.title.clone_from(&ids.root);
    }

    let main = tree.attach(
        root,
        factory.create_proportional_dock(ids.main_layout.clone(), Orientation::Horizontal),
    )?;
    let left_dock = tree.attach(
        main,
        factory
            .create_tool_dock(ids.left_dock.clone(), Alignment::Left)
            .with_proportion(policy.proportions.left_dock),
    )?;
    tree.attach(
        main,
        factory.create_proportional_dock_splitter(ids.main_splitter.clone()),
    )?;
    let right_dock = tree.attach(
        main,
        factory.create_proportional_dock(ids.right_dock.clone(), Orientation::Vertical),
    )?;
    let document_dock = tree.attach(
        right_dock,
        factory
            .create_document_dock(ids.document_dock.clone())
            .with_proportion(policy.proportions.document),
    )?;
    if let Some(node) = tree.get_mut(document_dock) {
        node.is_collapsable = false;
    }

    let primary_tool = match registry.lookup(&policy.primary_tool) {
        Some(registration) => {
            let tool = tree.attach(left_dock, registration.instantiate(factory))?;
            tree.set_default_dockable(left_dock, Some(tool))?;
            tree.activate_path(tool)?;
            Some(tool)
        }
        None => {
            tracing::warn!(
                target: "dockspace.workspace",
                tool = %policy.primary_tool,
                "primary tool not registered; left dock left empty"
            );
            None
        }
    };
    tree.activate_path(document_dock)?;
    tree.set_active_dockable(main, Some(right_dock))?;
    tree.set_active_dockable(root, Some(main))?;

    tracing::debug!(
        target: "dockspace.workspace",
        nodes = tree.node_count(),
        "default layout built"
    );
    Ok(DefaultLayout {
        tree,
        left_dock,
        document_dock,
        primary_tool,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ToolRegistration;
    use dockspace_core::{ContentHandle, DockableKind};

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.register_tool(ToolRegistration::new("Assembly", "Assemblies", ContentHandle(1)));
        registry
    }

    #[test]
    fn default_layout_has_expected_shape() {
        let factory = Factory::new();
        let policy = LayoutPolicy::default();
        let layout = build_default_layout(&factory, &policy, &registry()).expect("layout");
        let tree = &layout.tree;
        assert!(tree.validate().is_ok());

        let root = tree.root();
        assert_eq!(tree.get(root).map(|node| node.id.as_str()), Some("Root"));
        let [main] = tree.children(root)[..] else {
            panic!("root holds one child");
        };
        assert_eq!(tree.get(main).and_then(|node| node.orientation()), Some(Orientation::Horizontal));
        let children = tree.children(main);
        assert_eq!(children.len(), 3);
        assert_eq!(children[0], layout.left_dock);
        assert!(matches!(
            tree.get(children[1]).map(|node| node.kind()),
            Some(DockableKind::Splitter { can_resize: true })
        ));
        let right = children[2];
        assert_eq!(tree.get(right).and_then(|node| node.orientation()), Some(Orientation::Vertical));
        assert_eq!(tree.children(right), [layout.document_dock]);

        assert_eq!(tree.get(layout.left_dock).map(|node| node.proportion), Some(0.3));
        let documents = tree.get(layout.document_dock).expect("documents");
        assert_eq!(documents.proportion, 0.7);
        assert!(!documents.is_collapsable);
        let tool = layout.primary_tool.expect("primary tool");
        let left = tree.dock(layout.left_dock).expect("left dock");
        assert_eq!(left.active(), Some(tool));
        assert_eq!(left.default_dockable(), Some(tool));
        assert_eq!(tree.dock(right).and_then(|dock| dock.active()), Some(layout.document_dock));
        assert_eq!(tree.dock(main).and_then(|dock| dock.active()), Some(right));
        assert_eq!(tree.dock(root).and_then(|dock| dock.active()), Some(main));
    }

    #[test]
    fn missing_primary_tool_leaves_left_dock_empty() {
        let factory = Factory::new();
        let layout =
            build_default_layout(&factory, &LayoutPolicy::default(), &Registry::new()).expect("layout");
        assert!(layout.primary_tool.is_none());
        assert!(layout.tree.children(layout.left_dock).is_empty());
        assert!(layout.tree.validate().is_ok());
    }
}
