//! Tool and dockable registry owned by one workspace.
//!
//! Tools are live singletons: one registration per id, instantiated into
//! the tree on demand. Dockable templates are detached nodes (latent panes,
//! their splitters) kept so activation can insert them without rebuilding
//! the layout.

use dockspace_core::{Capabilities, ContentHandle, Dockable, Factory};
use rustc_hash::FxHashMap;

/// A live tool singleton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRegistration {
    pub id: String,
    pub title: String,
    pub content: ContentHandle,
    pub capabilities: Capabilities,
    /// Whether the tool is currently shown somewhere in the layout.
    pub is_visible: bool,
}

impl ToolRegistration {
    #[must_use]
    pub fn new(id: impl Into<String>, title: impl Into<String>, content: ContentHandle) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content,
            capabilities: Capabilities::default(),
            is_visible: false,
        }
    }

    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Detached tool node carrying the live content.
    #[must_use]
    pub fn instantiate(&self, factory: &Factory) -> Dockable {
        factory
            .create_tool(self.id.clone(), self.title.clone(), Some(self.content))
            .with_capabilities(self.capabilities)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    tools: Vec<ToolRegistration>,
    index: FxHashMap<String, usize>,
    dockables: FxHashMap<String, Dockable>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool; a registration with the same id is replaced.
    pub fn register_tool(&mut self, tool: ToolRegistration) -> Option<ToolRegistration> {
        match self.index.get(&tool.id) {
            Some(&slot) => Some(std::mem::replace(&mut self.tools[slot], tool)),
            None => {
                self.index.insert(tool.id.clone(), self.tools.len());
                self.tools.push(tool);
                None
            }
        }
    }

    #[must_use]
    pub fn lookup(&self, id: &str) -> Option<&ToolRegistration> {
        self.index.get(id).map(|&slot| &self.tools[slot])
    }

    /// Record whether a tool is shown; returns false for unknown ids.
    pub fn set_visible(&mut self, id: &str, visible: bool) -> bool {
        match self.index.get(id) {
            Some(&slot) => {
                self.tools[slot].is_visible = visible;
                true
            }
            None => false,
        }
    }

    /// Registered tools in registration order.
    #[must_use]
    pub fn tools(&self) -> &[ToolRegistration] {
        &self.tools
    }

    /// Keep a detached node template under its id.
    pub fn register_dockable(&mut self, template: Dockable) {
        self.dockables.insert(template.id.clone(), template);
    }

    #[must_use]
    pub fn dockable_template(&self, id: &str) -> Option<&Dockable> {
        self.dockables.get(id)
    }

    pub fn clear_dockables(&mut self) {
        self.dockables.clear();
    }
}
