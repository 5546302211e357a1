//! Persisted layout schema.
//!
//! A layout is a JSON document whose nodes carry a serialization-local
//! `$id`; any later occurrence of the same node is written as
//! `{"$ref": "<id>"}`. `$type` names the concrete kind from a closed set.
//! Unknown attributes are ignored on read so newer writers stay readable.
//!
//! Lists may arrive either as plain arrays or wrapped as
//! `{"$values": [...]}`; see [`crate::normalize`].

use std::collections::BTreeMap;

use dockspace_core::{
    Alignment, Capabilities, Dockable, DockableKind, DocumentTabLayout, GridPlacement, GripMode,
    Orientation,
};
use serde::{Deserialize, Serialize};

/// Current persisted layout format version.
///
/// Versioning policy:
/// - Additive attributes can be introduced without a version bump.
/// - Breaking field/semantic changes must bump this version.
pub const LAYOUT_FORMAT_VERSION: u16 = 1;

/// Top-level persisted layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutDocument {
    pub format_version: u16,
    pub root: NodeSlot,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, String>,
}

/// Either a full node definition or a back-reference to one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeSlot {
    Ref(NodeRef),
    Def(Box<NodeDef>),
}

impl NodeSlot {
    /// Serialization-local id this slot defines or refers to.
    #[must_use]
    pub fn ref_id(&self) -> &str {
        match self {
            Self::Ref(reference) => &reference.target,
            Self::Def(def) => &def.ref_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRef {
    #[serde(rename = "$ref")]
    pub target: String,
}

/// A list in either accepted shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireList<T> {
    Items(Vec<T>),
    Wrapped {
        #[serde(rename = "$values")]
        values: Vec<T>,
    },
}

impl<T> WireList<T> {
    #[must_use]
    pub fn items(&self) -> &[T] {
        match self {
            Self::Items(items) | Self::Wrapped { values: items } => items,
        }
    }

    #[must_use]
    pub const fn is_plain(&self) -> bool {
        matches!(self, Self::Items(_))
    }
}

impl<T> Default for WireList<T> {
    fn default() -> Self {
        Self::Items(Vec::new())
    }
}

/// Closed set of node kind names accepted by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKindName {
    Tool,
    Document,
    ProportionalDockSplitter,
    RootDock,
    ProportionalDock,
    ToolDock,
    DocumentDock,
}

impl NodeKindName {
    #[must_use]
    pub const fn of(kind: &DockableKind) -> Self {
        match kind {
            DockableKind::Tool { .. } => Self::Tool,
            DockableKind::Document { .. } => Self::Document,
            DockableKind::Splitter { .. } => Self::ProportionalDockSplitter,
            DockableKind::RootDock { .. } => Self::RootDock,
            DockableKind::ProportionalDock { .. } => Self::ProportionalDock,
            DockableKind::ToolDock { .. } => Self::ToolDock,
            DockableKind::DocumentDock { .. } => Self::DocumentDock,
        }
    }

    #[must_use]
    pub const fn is_dock(self) -> bool {
        matches!(
            self,
            Self::RootDock | Self::ProportionalDock | Self::ToolDock | Self::DocumentDock
        )
    }
}

const fn yes() -> bool {
    true
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_true(value: &bool) -> bool {
    *value
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(value: &bool) -> bool {
    !*value
}

fn is_default_grid(grid: &GridPlacement) -> bool {
    *grid == GridPlacement::default()
}

/// One node definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDef {
    #[serde(rename = "$id")]
    pub ref_id: String,
    #[serde(rename = "$type")]
    pub kind: NodeKindName,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// `None` means unconstrained.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proportion: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collapsed_proportion: Option<f64>,
    #[serde(default = "yes", skip_serializing_if = "is_true")]
    pub is_collapsable: bool,
    #[serde(default, skip_serializing_if = "is_default_grid")]
    pub grid: GridPlacement,
    #[serde(default = "yes")]
    pub can_close: bool,
    #[serde(default = "yes")]
    pub can_pin: bool,
    #[serde(default = "yes")]
    pub can_float: bool,
    #[serde(default = "yes")]
    pub can_drag: bool,
    #[serde(default = "yes")]
    pub can_drop: bool,
    #[serde(default = "yes")]
    pub is_visible: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_active: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Orientation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<Alignment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_hide: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grip_mode: Option<GripMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_create_document: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tabs_layout: Option<DocumentTabLayout>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_resize: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_focusable_root: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_close_last_dockable: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_dockables: Option<WireList<NodeSlot>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden_dockables: Option<WireList<NodeSlot>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_pinned_dockables: Option<WireList<NodeSlot>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_pinned_dockables: Option<WireList<NodeSlot>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_pinned_dockables: Option<WireList<NodeSlot>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottom_pinned_dockables: Option<WireList<NodeSlot>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub windows: Option<WireList<WindowDef>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_dockable: Option<NodeSlot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_dockable: Option<NodeSlot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focused_dockable: Option<NodeSlot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned_dockable: Option<NodeSlot>,
}

/// Persisted floating window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowDef {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
    #[serde(default, skip_serializing_if = "is_false")]
    pub topmost: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<NodeSlot>,
}

impl NodeDef {
    /// Definition carrying `node`'s scalar fields and kind settings; lists
    /// and pointers are left empty for the encoder to fill.
    #[must_use]
    pub fn from_dockable(ref_id: String, node: &Dockable) -> Self {
        let finite = |value: f64| (!value.is_nan()).then_some(value);
        let mut def = Self {
            ref_id,
            kind: NodeKindName::of(&node.kind()),
            id: node.id.clone(),
            title: node.title.clone(),
            proportion: finite(node.proportion),
            collapsed_proportion: finite(node.collapsed_proportion),
            is_collapsable: node.is_collapsable,
            grid: node.grid,
            can_close: node.capabilities.contains(Capabilities::CAN_CLOSE),
            can_pin: node.capabilities.contains(Capabilities::CAN_PIN),
            can_float: node.capabilities.contains(Capabilities::CAN_FLOAT),
            can_drag: node.capabilities.contains(Capabilities::CAN_DRAG),
            can_drop: node.capabilities.contains(Capabilities::CAN_DROP),
            is_visible: node.is_visible,
            is_active: node.is_active,
            orientation: None,
            alignment: None,
            auto_hide: None,
            grip_mode: None,
            can_create_document: None,
            tabs_layout: None,
            can_resize: None,
            is_focusable_root: None,
            can_close_last_dockable: node.dock().map(|dock| dock.can_close_last),
            visible_dockables: None,
            hidden_dockables: None,
            left_pinned_dockables: None,
            right_pinned_dockables: None,
            top_pinned_dockables: None,
            bottom_pinned_dockables: None,
            windows: None,
            active_dockable: None,
            default_dockable: None,
            focused_dockable: None,
            pinned_dockable: None,
        };
        match node.kind() {
            DockableKind::Tool { .. } | DockableKind::Document { .. } => {}
            DockableKind::Splitter { can_resize } => def.can_resize = Some(can_resize),
            DockableKind::RootDock { is_focusable_root } => {
                def.is_focusable_root = Some(is_focusable_root);
            }
            DockableKind::ProportionalDock { orientation } => def.orientation = Some(orientation),
            DockableKind::ToolDock {
                alignment,
                auto_hide,
                grip_mode,
            } => {
                def.alignment = Some(alignment);
                def.auto_hide = Some(auto_hide);
                def.grip_mode = Some(grip_mode);
            }
            DockableKind::DocumentDock {
                can_create_document,
                tabs_layout,
            } => {
                def.can_create_document = Some(can_create_document);
                def.tabs_layout = Some(tabs_layout);
            }
        }
        def
    }

    /// Detached node built from this definition. Content is never restored.
    #[must_use]
    pub fn to_dockable(&self) -> Dockable {
        let kind = match self.kind {
            NodeKindName::Tool => DockableKind::Tool { content: None },
            NodeKindName::Document => DockableKind::Document { content: None },
            NodeKindName::ProportionalDockSplitter => DockableKind::Splitter {
                can_resize: self.can_resize.unwrap_or(true),
            },
            NodeKindName::RootDock => DockableKind::RootDock {
                is_focusable_root: self.is_focusable_root.unwrap_or(true),
            },
            NodeKindName::ProportionalDock => DockableKind::ProportionalDock {
                orientation: self.orientation.unwrap_or_default(),
            },
            NodeKindName::ToolDock => DockableKind::ToolDock {
                alignment: self.alignment.unwrap_or_default(),
                auto_hide: self.auto_hide.unwrap_or(false),
                grip_mode: self.grip_mode.unwrap_or_default(),
            },
            NodeKindName::DocumentDock => DockableKind::DocumentDock {
                can_create_document: self.can_create_document.unwrap_or(false),
                tabs_layout: self.tabs_layout.unwrap_or_default(),
            },
        };

        let mut capabilities = Capabilities::empty();
        capabilities.set(Capabilities::CAN_CLOSE, self.can_close);
        capabilities.set(Capabilities::CAN_PIN, self.can_pin);
        capabilities.set(Capabilities::CAN_FLOAT, self.can_float);
        capabilities.set(Capabilities::CAN_DRAG, self.can_drag);
        capabilities.set(Capabilities::CAN_DROP, self.can_drop);

        let mut node = Dockable::new(self.id.clone(), kind)
            .with_title(self.title.clone())
            .with_proportion(self.proportion.unwrap_or(f64::NAN))
            .with_capabilities(capabilities);
        node.collapsed_proportion = self.collapsed_proportion.unwrap_or(f64::NAN);
        node.is_collapsable = self.is_collapsable;
        node.grid = self.grid;
        node.is_visible = self.is_visible;
        node.is_active = self.is_active;
        if let Some(allowed) = self.can_close_last_dockable {
            node.set_can_close_last_dockable(allowed);
        }
        node
    }

    /// Every nested slot in document order: lists first, then pointers.
    pub fn slots(&self) -> impl Iterator<Item = &NodeSlot> {
        let lists = [
            &self.visible_dockables,
            &self.hidden_dockables,
            &self.left_pinned_dockables,
            &self.right_pinned_dockables,
            &self.top_pinned_dockables,
            &self.bottom_pinned_dockables,
        ];
        let windows = self
            .windows
            .iter()
            .flat_map(|list| list.items().iter().filter_map(|window| window.layout.as_ref()));
        let pointers = [
            &self.active_dockable,
            &self.default_dockable,
            &self.focused_dockable,
            &self.pinned_dockable,
        ];
        lists
            .into_iter()
            .flatten()
            .flat_map(WireList::items)
            .chain(windows)
            .chain(pointers.into_iter().flatten())
    }
}

impl LayoutDocument {
    /// Every inline definition, preorder.
    #[must_use]
    pub fn definitions(&self) -> Vec<&NodeDef> {
        let mut defs = Vec::new();
        let mut stack = vec![&self.root];
        while let Some(slot) = stack.pop() {
            if let NodeSlot::Def(def) = slot {
                defs.push(def.as_ref());
                let children: Vec<_> = def.slots().collect();
                stack.extend(children.into_iter().rev());
            }
        }
        defs
    }
}
