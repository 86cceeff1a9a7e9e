//! Configuration data model and the load-time static tree.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::error::ConfigError;
use crate::id::LayerId;

/// Top-level layer-switcher configuration document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LayerSwitcherConfig {
    /// Root layer groups, in display order.
    #[serde(default)]
    pub groups: Vec<GroupConfig>,
}

impl LayerSwitcherConfig {
    /// Parse a configuration document from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration document from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&data)
    }
}

/// A configured layer group, possibly containing layers and subgroups.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupConfig {
    /// Stable id; must be unique across the whole configuration.
    pub id: LayerId,

    /// Display name used when the registry has no caption for this id.
    #[serde(default)]
    pub name: Option<String>,

    /// Whether the group starts toggled on.
    #[serde(default)]
    pub toggled: bool,

    /// Whether the group starts expanded in the tree view.
    #[serde(default)]
    pub expanded: bool,

    /// Configured draw order, if any.
    #[serde(default)]
    pub draw_order: Option<i32>,

    /// Layer children, in display order.
    #[serde(default)]
    pub layers: Vec<LayerConfig>,

    /// Subgroup children, in display order.
    #[serde(default)]
    pub groups: Vec<GroupConfig>,
}

/// A configured leaf layer reference.
///
/// Everything descriptive about the layer (caption, sublayer catalog, zoom
/// bounds) lives in the registry; the configuration only pins the id into a
/// place in the tree and carries initial UI state.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerConfig {
    /// Stable id; must match a registry entry to be shown.
    pub id: LayerId,

    /// Whether the layer starts toggled on.
    #[serde(default)]
    pub toggled: bool,

    /// Configured draw order, if any.
    #[serde(default)]
    pub draw_order: Option<i32>,
}

/// Static per-node metadata carried from the configuration.
#[derive(Debug, Clone, Default)]
pub struct NodeMeta {
    /// Configured display name (groups only; leaves take registry captions).
    pub name: Option<String>,

    /// Whether the node starts toggled on.
    pub initially_toggled: bool,

    /// Whether the node starts expanded (groups only).
    pub initially_expanded: bool,

    /// Configured draw order, if any.
    pub initial_draw_order: Option<i32>,
}

/// A node of the validated static configuration tree.
///
/// The leaf/group decision is made once, during [`StaticTree::from_config`];
/// a node is a group iff its configuration declared child collections.
#[derive(Debug, Clone)]
pub enum StaticNode {
    /// A leaf layer reference.
    Leaf {
        /// The layer's id.
        id: LayerId,
        /// Static metadata.
        meta: NodeMeta,
    },
    /// A layer group with ordered children (layers before subgroups).
    Group {
        /// The group's id.
        id: LayerId,
        /// Static metadata.
        meta: NodeMeta,
        /// Children in display order.
        children: Vec<StaticNode>,
    },
}

impl StaticNode {
    /// This node's id.
    pub fn id(&self) -> &LayerId {
        match self {
            StaticNode::Leaf { id, .. } | StaticNode::Group { id, .. } => id,
        }
    }

    /// This node's static metadata.
    pub fn meta(&self) -> &NodeMeta {
        match self {
            StaticNode::Leaf { meta, .. } | StaticNode::Group { meta, .. } => meta,
        }
    }

    /// Children in display order; empty for leaves.
    pub fn children(&self) -> &[StaticNode] {
        match self {
            StaticNode::Leaf { .. } => &[],
            StaticNode::Group { children, .. } => children,
        }
    }

    /// Whether this node is a group.
    pub fn is_group(&self) -> bool {
        matches!(self, StaticNode::Group { .. })
    }
}

/// The validated, immutable static configuration tree.
///
/// A rooted forest: the configuration's top-level groups become the roots.
#[derive(Debug, Clone, Default)]
pub struct StaticTree {
    roots: Vec<StaticNode>,
}

impl StaticTree {
    /// Validate a configuration document and build the static tree.
    ///
    /// Fails with [`ConfigError::DuplicateId`] if any id appears more than
    /// once anywhere in the tree.
    pub fn from_config(config: &LayerSwitcherConfig) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        let roots = config
            .groups
            .iter()
            .map(|g| build_group(g, &mut seen))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { roots })
    }

    /// The root nodes in display order.
    pub fn roots(&self) -> &[StaticNode] {
        &self.roots
    }

    /// Total number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        fn count(node: &StaticNode) -> usize {
            1 + node.children().iter().map(count).sum::<usize>()
        }
        self.roots.iter().map(count).sum()
    }
}

fn build_group(group: &GroupConfig, seen: &mut HashSet<LayerId>) -> Result<StaticNode, ConfigError> {
    if !seen.insert(group.id.clone()) {
        return Err(ConfigError::DuplicateId(group.id.clone()));
    }

    // Layer children come before subgroup children; both keep configured order.
    let mut children = Vec::with_capacity(group.layers.len() + group.groups.len());
    for layer in &group.layers {
        if !seen.insert(layer.id.clone()) {
            return Err(ConfigError::DuplicateId(layer.id.clone()));
        }
        children.push(StaticNode::Leaf {
            id: layer.id.clone(),
            meta: NodeMeta {
                name: None,
                initially_toggled: layer.toggled,
                initially_expanded: false,
                initial_draw_order: layer.draw_order,
            },
        });
    }
    for subgroup in &group.groups {
        children.push(build_group(subgroup, seen)?);
    }

    Ok(StaticNode::Group {
        id: group.id.clone(),
        meta: NodeMeta {
            name: group.name.clone(),
            initially_toggled: group.toggled,
            initially_expanded: group.expanded,
            initial_draw_order: group.draw_order,
        },
        children,
    })
}
