//! Merged node types produced by the tree builder.

use crate::id::{LayerId, SubLayerId};
use crate::registry::LayerClass;

/// Classification of a merged node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergedKind {
    /// A configured group (has configured children).
    Group,
    /// A leaf whose registry entry is a composite layer with sublayers.
    GroupLayer,
    /// A plain leaf layer, carrying its registry classification.
    Leaf(LayerClass),
}

impl MergedKind {
    /// Whether this node is a configured group.
    pub fn is_group(self) -> bool {
        matches!(self, MergedKind::Group)
    }
}

/// One entry of the static lookup map: a configuration node merged with the
/// descriptive fields of its registry entry.
///
/// Live state (visibility, active sublayers, ...) is deliberately absent -
/// that belongs to the snapshot store. A `MergedNode` changes only when the
/// configuration or the registry's membership changes.
#[derive(Debug, Clone)]
pub struct MergedNode {
    /// The node's id.
    pub id: LayerId,
    /// Registry caption, falling back to the configured name, then the id.
    pub caption: String,
    /// Node classification.
    pub kind: MergedKind,
    /// Full declared sublayer catalog (registry-sourced; never configured).
    pub all_sub_layers: Vec<SubLayerId>,
    /// Whether the node starts toggled on.
    pub initially_toggled: bool,
    /// Whether the node starts expanded.
    pub initially_expanded: bool,
    /// Configured draw order, if any.
    pub initial_draw_order: Option<i32>,
    /// Minimum zoom bound from the registry.
    pub min_zoom: Option<f64>,
    /// Maximum zoom bound from the registry.
    pub max_zoom: Option<f64>,
    /// Id of the containing group, if the node is not a root.
    pub parent: Option<LayerId>,
}

/// One node of the display tree handed to the UI layer.
#[derive(Debug, Clone)]
pub struct DisplayNode {
    /// The node's id.
    pub id: LayerId,
    /// Display name (registry caption, falling back to the configured name).
    pub name: String,
    /// The node's active sublayers at build time, if it has a registry entry.
    pub sub_layers: Vec<SubLayerId>,
    /// Whether the group can be toggled as a whole.
    pub group_toggleable: bool,
    /// Whether the node starts expanded.
    pub default_expanded: bool,
    /// Id of the containing group, if the node is not a root.
    pub parent: Option<LayerId>,
    /// Children in display order; empty for leaves.
    pub children: Vec<DisplayNode>,
}

impl DisplayNode {
    /// Depth-first iteration over this node and all descendants.
    pub fn walk(&self) -> impl Iterator<Item = &DisplayNode> {
        // Small trees; a collected Vec keeps the iterator type simple.
        let mut nodes = Vec::new();
        fn push<'a>(node: &'a DisplayNode, out: &mut Vec<&'a DisplayNode>) {
            out.push(node);
            for child in &node.children {
                push(child, out);
            }
        }
        push(self, &mut nodes);
        nodes.into_iter()
    }
}
