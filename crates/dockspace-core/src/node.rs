//! Dockable node schema.
//!
//! Every participant in a layout tree is a [`Dockable`]. Containers carry a
//! [`DockState`] (ordered children plus active/default/focused pointers) and
//! the single root additionally carries a [`RootState`] with hidden, pinned
//! and floating-window membership. Structural edges live only in those
//! lists; `owner` is a back-reference maintained by [`crate::DockTree`].

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::DockError;
use crate::navigation::NavigationHistory;

/// Arena handle for a dockable inside one [`crate::DockTree`].
///
/// `0` is reserved/invalid so keys are always non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DockableKey(u64);

impl DockableKey {
    /// Lowest valid key.
    pub const MIN: Self = Self(1);

    /// Create a key, rejecting 0.
    pub fn new(raw: u64) -> Result<Self, DockError> {
        if raw == 0 {
            return Err(DockError::ZeroKey);
        }
        Ok(Self(raw))
    }

    /// Get the raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Return the next key, or an error on overflow.
    pub fn checked_next(self) -> Result<Self, DockError> {
        let Some(next) = self.0.checked_add(1) else {
            return Err(DockError::KeyOverflow { current: self });
        };
        Self::new(next)
    }
}

impl Default for DockableKey {
    fn default() -> Self {
        Self::MIN
    }
}

impl fmt::Display for DockableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque handle to live content owned by the host (a tool view model, an
/// open editor). Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHandle(pub u64);

/// Arrangement axis of a proportional dock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

/// Edge a tool dock is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    #[default]
    Unset,
    Left,
    Right,
    Top,
    Bottom,
}

/// Visibility of a tool dock's drag grip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GripMode {
    #[default]
    Visible,
    AutoHide,
    Hidden,
}

/// Placement of a document dock's tab strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentTabLayout {
    #[default]
    Top,
    Left,
    Right,
}

/// One of the root dock's four pinned edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinnedEdge {
    Left,
    Right,
    Top,
    Bottom,
}

impl PinnedEdge {
    pub const ALL: [Self; 4] = [Self::Left, Self::Right, Self::Top, Self::Bottom];

    /// Edge a tool lands on when pinned out of a dock with `alignment`.
    #[must_use]
    pub const fn for_alignment(alignment: Alignment) -> Self {
        match alignment {
            Alignment::Unset | Alignment::Left => Self::Left,
            Alignment::Right => Self::Right,
            Alignment::Top => Self::Top,
            Alignment::Bottom => Self::Bottom,
        }
    }

    /// Alignment of a tool dock that accepts dockables unpinned from this edge.
    #[must_use]
    pub const fn alignment(self) -> Alignment {
        match self {
            Self::Left => Alignment::Left,
            Self::Right => Alignment::Right,
            Self::Top => Alignment::Top,
            Self::Bottom => Alignment::Bottom,
        }
    }
}

bitflags! {
    /// User-facing capability switches of a dockable.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        const CAN_CLOSE = 1 << 0;
        const CAN_PIN = 1 << 1;
        const CAN_FLOAT = 1 << 2;
        const CAN_DRAG = 1 << 3;
        const CAN_DROP = 1 << 4;
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::all()
    }
}

/// Grid cell occupied by a dockable inside a grid-arranged host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPlacement {
    pub column: u32,
    pub row: u32,
    pub column_span: u32,
    pub row_span: u32,
}

impl Default for GridPlacement {
    fn default() -> Self {
        Self {
            column: 0,
            row: 0,
            column_span: 1,
            row_span: 1,
        }
    }
}

/// How a dockable is treated when building a persistence snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    /// Cloned one-to-one.
    Structural,
    /// Cloned as an identity-only placeholder.
    Stub,
    /// Dropped entirely.
    Transient,
}

/// Closed set of concrete node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DockableKind {
    Tool {
        content: Option<ContentHandle>,
    },
    Document {
        content: Option<ContentHandle>,
    },
    Splitter {
        can_resize: bool,
    },
    RootDock {
        is_focusable_root: bool,
    },
    ProportionalDock {
        orientation: Orientation,
    },
    ToolDock {
        alignment: Alignment,
        auto_hide: bool,
        grip_mode: GripMode,
    },
    DocumentDock {
        can_create_document: bool,
        tabs_layout: DocumentTabLayout,
    },
}

impl DockableKind {
    /// Whether nodes of this kind hold children.
    #[must_use]
    pub const fn is_dock(&self) -> bool {
        matches!(
            self,
            Self::RootDock { .. }
                | Self::ProportionalDock { .. }
                | Self::ToolDock { .. }
                | Self::DocumentDock { .. }
        )
    }

    #[must_use]
    pub const fn is_root(&self) -> bool {
        matches!(self, Self::RootDock { .. })
    }

    /// Stable kind name used by the persisted layout format.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Tool { .. } => "Tool",
            Self::Document { .. } => "Document",
            Self::Splitter { .. } => "ProportionalDockSplitter",
            Self::RootDock { .. } => "RootDock",
            Self::ProportionalDock { .. } => "ProportionalDock",
            Self::ToolDock { .. } => "ToolDock",
            Self::DocumentDock { .. } => "DocumentDock",
        }
    }

    #[must_use]
    pub const fn persistence(&self) -> Persistence {
        match self {
            Self::Tool { .. } => Persistence::Stub,
            Self::Document { .. } => Persistence::Transient,
            _ => Persistence::Structural,
        }
    }
}

/// Container state shared by every dock kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockState {
    pub(crate) visible: Vec<DockableKey>,
    pub(crate) active: Option<DockableKey>,
    pub(crate) default: Option<DockableKey>,
    pub(crate) focused: Option<DockableKey>,
    pub(crate) navigation: NavigationHistory<DockableKey>,
    /// Whether closing the last visible child is allowed.
    pub can_close_last: bool,
}

impl Default for DockState {
    fn default() -> Self {
        Self {
            visible: Vec::new(),
            active: None,
            default: None,
            focused: None,
            navigation: NavigationHistory::new(),
            can_close_last: true,
        }
    }
}

impl DockState {
    /// Ordered visible children.
    #[must_use]
    pub fn visible(&self) -> &[DockableKey] {
        &self.visible
    }

    #[must_use]
    pub const fn active(&self) -> Option<DockableKey> {
        self.active
    }

    #[must_use]
    pub const fn default_dockable(&self) -> Option<DockableKey> {
        self.default
    }

    #[must_use]
    pub const fn focused(&self) -> Option<DockableKey> {
        self.focused
    }

    /// Back/forward history of previously active children.
    #[must_use]
    pub const fn navigation(&self) -> &NavigationHistory<DockableKey> {
        &self.navigation
    }

    #[must_use]
    pub fn contains(&self, key: DockableKey) -> bool {
        self.visible.contains(&key)
    }

    #[must_use]
    pub fn position(&self, key: DockableKey) -> Option<usize> {
        self.visible.iter().position(|&child| child == key)
    }
}

/// Position and size of a floating window.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WindowGeometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Floating window hosted by the root dock.
#[derive(Debug, Clone, PartialEq)]
pub struct DockWindow {
    pub id: String,
    pub title: String,
    pub geometry: WindowGeometry,
    pub topmost: bool,
    pub(crate) layout: Option<DockableKey>,
}

impl DockWindow {
    /// Dock shown inside the window, owned by the root.
    #[must_use]
    pub const fn layout(&self) -> Option<DockableKey> {
        self.layout
    }
}

/// Extra membership lists carried only by the root dock.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RootState {
    pub(crate) hidden: Vec<DockableKey>,
    pub(crate) left_pinned: Vec<DockableKey>,
    pub(crate) right_pinned: Vec<DockableKey>,
    pub(crate) top_pinned: Vec<DockableKey>,
    pub(crate) bottom_pinned: Vec<DockableKey>,
    pub(crate) pinned_preview: Option<DockableKey>,
    pub(crate) windows: Vec<DockWindow>,
}

impl RootState {
    #[must_use]
    pub fn hidden(&self) -> &[DockableKey] {
        &self.hidden
    }

    #[must_use]
    pub fn pinned(&self, edge: PinnedEdge) -> &[DockableKey] {
        match edge {
            PinnedEdge::Left => &self.left_pinned,
            PinnedEdge::Right => &self.right_pinned,
            PinnedEdge::Top => &self.top_pinned,
            PinnedEdge::Bottom => &self.bottom_pinned,
        }
    }

    pub(crate) fn pinned_mut(&mut self, edge: PinnedEdge) -> &mut Vec<DockableKey> {
        match edge {
            PinnedEdge::Left => &mut self.left_pinned,
            PinnedEdge::Right => &mut self.right_pinned,
            PinnedEdge::Top => &mut self.top_pinned,
            PinnedEdge::Bottom => &mut self.bottom_pinned,
        }
    }

    /// Edge currently holding `key`, if any.
    #[must_use]
    pub fn pinned_edge_of(&self, key: DockableKey) -> Option<PinnedEdge> {
        PinnedEdge::ALL
            .into_iter()
            .find(|&edge| self.pinned(edge).contains(&key))
    }

    /// Pinned dockable currently shown in the edge flyout.
    #[must_use]
    pub const fn pinned_preview(&self) -> Option<DockableKey> {
        self.pinned_preview
    }

    #[must_use]
    pub fn windows(&self) -> &[DockWindow] {
        &self.windows
    }
}

/// A node in the layout tree.
///
/// The kind is read through [`Dockable::kind`]. [`Dockable::set_kind`] only
/// retunes settings within the same kind, so a populated dock can never be
/// turned into a leaf behind the tree's back.
#[derive(Debug, Clone)]
pub struct Dockable {
    pub id: String,
    pub title: String,
    pub(crate) owner: Option<DockableKey>,
    /// Share of the parent's space in (0, 1); NaN fills the remainder.
    pub proportion: f64,
    pub collapsed_proportion: f64,
    pub is_collapsable: bool,
    pub grid: GridPlacement,
    pub capabilities: Capabilities,
    pub is_visible: bool,
    pub is_active: bool,
    pub(crate) kind: DockableKind,
    pub(crate) dock: Option<DockState>,
    pub(crate) root: Option<RootState>,
}

impl Dockable {
    /// Detached node of `kind` with default geometry and empty collections.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: DockableKind) -> Self {
        let id = id.into();
        Self {
            title: id.clone(),
            id,
            owner: None,
            proportion: f64::NAN,
            collapsed_proportion: f64::NAN,
            is_collapsable: true,
            grid: GridPlacement::default(),
            capabilities: Capabilities::default(),
            is_visible: true,
            is_active: false,
            dock: kind.is_dock().then(DockState::default),
            root: kind.is_root().then(RootState::default),
            kind,
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn with_proportion(mut self, proportion: f64) -> Self {
        self.proportion = proportion;
        self
    }

    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    #[must_use]
    pub const fn kind(&self) -> DockableKind {
        self.kind
    }

    /// Replace the per-kind settings, e.g. a tool's content or a tool dock's
    /// grip mode. Returns false and changes nothing when `kind` is a
    /// different kind.
    pub fn set_kind(&mut self, kind: DockableKind) -> bool {
        if kind.name() != self.kind.name() {
            return false;
        }
        self.kind = kind;
        true
    }

    /// Containing dock, or `None` for the root and detached nodes.
    #[must_use]
    pub const fn owner(&self) -> Option<DockableKey> {
        self.owner
    }

    #[must_use]
    pub const fn dock(&self) -> Option<&DockState> {
        self.dock.as_ref()
    }

    #[must_use]
    pub const fn root_state(&self) -> Option<&RootState> {
        self.root.as_ref()
    }

    #[must_use]
    pub const fn is_dock(&self) -> bool {
        self.dock.is_some()
    }

    #[must_use]
    pub const fn content(&self) -> Option<ContentHandle> {
        match self.kind {
            DockableKind::Tool { content } | DockableKind::Document { content } => content,
            _ => None,
        }
    }

    /// Tool without live content, as produced by snapshots and decoding.
    #[must_use]
    pub const fn is_stub(&self) -> bool {
        matches!(self.kind, DockableKind::Tool { content: None })
    }

    #[must_use]
    pub const fn orientation(&self) -> Option<Orientation> {
        match self.kind {
            DockableKind::ProportionalDock { orientation } => Some(orientation),
            _ => None,
        }
    }

    #[must_use]
    pub fn can_close_last_dockable(&self) -> bool {
        self.dock.as_ref().is_none_or(|dock| dock.can_close_last)
    }

    /// Set the close-last policy; ignored for leaves.
    pub fn set_can_close_last_dockable(&mut self, allowed: bool) {
        if let Some(dock) = self.dock.as_mut() {
            dock.can_close_last = allowed;
        }
    }

    /// Copy geometry, flags and kind settings onto a fresh detached node.
    ///
    /// Membership, pointers and history are not carried over.
    #[must_use]
    pub fn detached_copy(&self) -> Self {
        let mut copy = Self::new(self.id.clone(), self.kind);
        copy.title.clone_from(&self.title);
        copy.proportion = self.proportion;
        copy.collapsed_proportion = self.collapsed_proportion;
        copy.is_collapsable = self.is_collapsable;
        copy.grid = self.grid;
        copy.capabilities = self.capabilities;
        copy.is_visible = self.is_visible;
        copy.is_active = self.is_active;
        if let (Some(source), Some(target)) = (self.dock.as_ref(), copy.dock.as_mut()) {
            target.can_close_last = source.can_close_last;
        }
        copy
    }

    /// Identity-only placeholder for a tool: same id, title and geometry,
    /// no content.
    #[must_use]
    pub fn stub(&self) -> Self {
        let mut stub = self.detached_copy();
        stub.kind = DockableKind::Tool { content: None };
        stub.dock = None;
        stub.root = None;
        stub
    }
}
