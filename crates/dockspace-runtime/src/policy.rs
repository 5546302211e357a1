//! Policy-as-data configuration for the workspace orchestrator.
//!
//! Captures the well-known container ids, default proportions, the
//! tool → container placement table, the latent (on-demand) pane
//! descriptors and the geometry-repair thresholds as a single
//! [`LayoutPolicy`] that can be loaded from TOML or JSON.
//!
//! ```toml
//! [placement]
//! default_target = "LeftDock"
//!
//! [placement.targets]
//! Search = "SearchDock"
//!
//! [repair]
//! document_min = 0.1
//! ```
//!
//! Every field has a default, so a partial file only overrides what it
//! names. `LayoutPolicy::default()` reproduces the stock layout.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use dockspace_core::{Alignment, Orientation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level LayoutPolicy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutPolicy {
    /// Ids of the containers the orchestrator looks up by name.
    pub ids: WellKnownIds,

    /// Tool placed in the left dock of the default layout.
    pub primary_tool: String,

    /// Proportions used when building the default layout.
    pub proportions: ProportionPolicy,

    /// Tool → container placement.
    pub placement: PlacementPolicy,

    /// Containers inserted next to the document area on demand.
    pub latent_panes: Vec<LatentPanePolicy>,

    /// Clamp thresholds applied to restored geometry.
    pub repair: RepairPolicy,
}

impl Default for LayoutPolicy {
    fn default() -> Self {
        Self {
            ids: WellKnownIds::default(),
            primary_tool: "Assembly".into(),
            proportions: ProportionPolicy::default(),
            placement: PlacementPolicy::default(),
            latent_panes: vec![LatentPanePolicy::default()],
            repair: RepairPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WellKnownIds {
    pub root: String,
    pub main_layout: String,
    pub left_dock: String,
    pub right_dock: String,
    pub document_dock: String,
    /// Splitter between the left and right halves; empty means anonymous.
    pub main_splitter: String,
}

impl Default for WellKnownIds {
    fn default() -> Self {
        Self {
            root: "Root".into(),
            main_layout: "MainLayout".into(),
            left_dock: "LeftDock".into(),
            right_dock: "RightDock".into(),
            document_dock: "DocumentDock".into(),
            main_splitter: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProportionPolicy {
    pub left_dock: f64,
    pub document: f64,
}

impl Default for ProportionPolicy {
    fn default() -> Self {
        Self {
            left_dock: 0.3,
            document: 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementPolicy {
    /// Container for tools with no explicit entry.
    pub default_target: String,
    /// Explicit tool id → container id entries.
    pub targets: BTreeMap<String, String>,
}

impl Default for PlacementPolicy {
    fn default() -> Self {
        Self {
            default_target: "LeftDock".into(),
            targets: BTreeMap::from([("Search".to_owned(), "SearchDock".to_owned())]),
        }
    }
}

/// An auxiliary tool container that is registered but only attached when a
/// tool targeting it is activated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatentPanePolicy {
    pub container_id: String,
    pub title: String,
    pub alignment: Alignment,
    pub proportion: f64,
    pub splitter_id: String,
    /// Arrangement the pane must share with the document dock.
    pub arrangement: Orientation,
    /// Id given to a wrapper created when the document dock's parent has
    /// the wrong arrangement.
    pub wrapper_id: String,
}

impl Default for LatentPanePolicy {
    fn default() -> Self {
        Self {
            container_id: "SearchDock".into(),
            title: "Search".into(),
            alignment: Alignment::Top,
            proportion: 0.25,
            splitter_id: "SearchSplitter".into(),
            arrangement: Orientation::Vertical,
            wrapper_id: "DocumentArea".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairPolicy {
    /// Tool dock proportions above this are reset.
    pub auxiliary_max: f64,
    pub auxiliary_default: f64,
    /// Document dock proportions below this (or NaN) are reset.
    pub document_min: f64,
    pub document_default: f64,
}

impl Default for RepairPolicy {
    fn default() -> Self {
        Self {
            auxiliary_max: 0.9,
            auxiliary_default: 0.25,
            document_min: 0.1,
            document_default: 0.7,
        }
    }
}

impl LayoutPolicy {
    /// Load from a TOML string and validate.
    pub fn from_toml_str(s: &str) -> Result<Self, PolicyError> {
        toml::from_str::<Self>(s)
            .map_err(PolicyError::Toml)?
            .validated()
    }

    /// Load from a TOML file on disk and validate.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(PolicyError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string and validate.
    pub fn from_json_str(s: &str) -> Result<Self, PolicyError> {
        serde_json::from_str::<Self>(s)
            .map_err(PolicyError::Json)?
            .validated()
    }

    /// Load from a JSON file on disk and validate.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(PolicyError::Io)?;
        Self::from_json_str(&content)
    }

    /// Return `self` if [`Self::validate`] finds nothing wrong.
    pub fn validated(self) -> Result<Self, PolicyError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(PolicyError::Validation(errors))
        }
    }

    /// Validate all parameters.
    ///
    /// Returns a list of problems; an empty list means the policy is usable.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (name, id) in [
            ("ids.root", &self.ids.root),
            ("ids.main_layout", &self.ids.main_layout),
            ("ids.left_dock", &self.ids.left_dock),
            ("ids.right_dock", &self.ids.right_dock),
            ("ids.document_dock", &self.ids.document_dock),
        ] {
            if id.is_empty() {
                errors.push(format!("{name} must not be empty"));
            }
        }
        let named = [
            &self.ids.root,
            &self.ids.main_layout,
            &self.ids.left_dock,
            &self.ids.right_dock,
            &self.ids.document_dock,
        ];
        let distinct: BTreeSet<_> = named.iter().filter(|id| !id.is_empty()).collect();
        if distinct.len() != named.iter().filter(|id| !id.is_empty()).count() {
            errors.push("ids must be distinct".into());
        }

        for (name, value) in [
            ("proportions.left_dock", self.proportions.left_dock),
            ("proportions.document", self.proportions.document),
        ] {
            if !in_unit_interval(value) {
                errors.push(format!("{name} must be in (0, 1), got {value}"));
            }
        }

        if self.placement.default_target.is_empty() {
            errors.push("placement.default_target must not be empty".into());
        }
        for (tool, target) in &self.placement.targets {
            if target.is_empty() {
                errors.push(format!("placement.targets.{tool} must not be empty"));
            }
        }

        let mut containers = BTreeSet::new();
        for (index, pane) in self.latent_panes.iter().enumerate() {
            if pane.container_id.is_empty() {
                errors.push(format!("latent_panes[{index}].container_id must not be empty"));
            } else if !containers.insert(pane.container_id.as_str()) {
                errors.push(format!(
                    "latent_panes[{index}].container_id {:?} is declared twice",
                    pane.container_id
                ));
            }
            if pane.container_id == self.ids.document_dock {
                errors.push(format!(
                    "latent_panes[{index}].container_id must differ from ids.document_dock"
                ));
            }
            if pane.splitter_id.is_empty() {
                errors.push(format!("latent_panes[{index}].splitter_id must not be empty"));
            }
            if pane.wrapper_id.is_empty() {
                errors.push(format!("latent_panes[{index}].wrapper_id must not be empty"));
            }
            if !in_unit_interval(pane.proportion) {
                errors.push(format!(
                    "latent_panes[{index}].proportion must be in (0, 1), got {}",
                    pane.proportion
                ));
            }
        }

        for (name, value) in [
            ("repair.auxiliary_max", self.repair.auxiliary_max),
            ("repair.auxiliary_default", self.repair.auxiliary_default),
            ("repair.document_min", self.repair.document_min),
            ("repair.document_default", self.repair.document_default),
        ] {
            if !in_unit_interval(value) {
                errors.push(format!("{name} must be in (0, 1), got {value}"));
            }
        }
        if self.repair.auxiliary_default > self.repair.auxiliary_max {
            errors.push("repair.auxiliary_default must not exceed repair.auxiliary_max".into());
        }
        if self.repair.document_default < self.repair.document_min {
            errors.push("repair.document_default must not be below repair.document_min".into());
        }

        errors
    }

    /// Container id a tool is placed in when activated.
    #[must_use]
    pub fn target_for(&self, tool_id: &str) -> &str {
        self.placement
            .targets
            .get(tool_id)
            .map_or(self.placement.default_target.as_str(), String::as_str)
    }

    /// Latent pane descriptor for `container_id`.
    #[must_use]
    pub fn latent_pane(&self, container_id: &str) -> Option<&LatentPanePolicy> {
        self.latent_panes
            .iter()
            .find(|pane| pane.container_id == container_id)
    }
}

fn in_unit_interval(value: f64) -> bool {
    value > 0.0 && value < 1.0
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors from loading a [`LayoutPolicy`].
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[source] toml::de::Error),
    #[error("JSON parse error: {0}")]
    Json(#[source] serde_json::Error),
    /// Parsed, but [`LayoutPolicy::validate`] reported problems.
    #[error("invalid layout policy: {}", .0.join("; "))]
    Validation(Vec<String>),
}
