//! Merging the static configuration against the live registry.

use std::collections::HashMap;

use tracing::warn;

use super::model::{DisplayNode, MergedKind, MergedNode};
use crate::config::StaticNode;
use crate::id::LayerId;
use crate::registry::{LayerClass, LayerRegistry};

/// Build the display tree for the UI layer.
///
/// Depth-first over the configuration. A leaf whose id has no registry
/// entry is pruned, so the UI never shows dangling references; this is
/// tolerated configuration drift, logged but not an error. Group names
/// prefer the live registry caption over the configured name.
pub fn build_display_tree(
    roots: &[StaticNode],
    registry: &dyn LayerRegistry,
) -> Vec<DisplayNode> {
    roots
        .iter()
        .filter_map(|node| build_display_node(node, None, registry))
        .collect()
}

fn build_display_node(
    node: &StaticNode,
    parent: Option<&LayerId>,
    registry: &dyn LayerRegistry,
) -> Option<DisplayNode> {
    let descriptor = registry.descriptor(node.id());

    if !node.is_group() && descriptor.is_none() {
        warn!(layer = %node.id(), "configured layer missing from registry, pruning");
        return None;
    }

    let children = node
        .children()
        .iter()
        .filter_map(|child| build_display_node(child, Some(node.id()), registry))
        .collect();

    let name = descriptor
        .map(|d| d.caption)
        .or_else(|| node.meta().name.clone())
        .unwrap_or_else(|| node.id().to_string());

    Some(DisplayNode {
        id: node.id().clone(),
        name,
        sub_layers: registry.visible_sub_layers(node.id()).unwrap_or_default(),
        group_toggleable: node.meta().initially_toggled,
        default_expanded: node.meta().initially_expanded,
        parent: parent.cloned(),
        children,
    })
}

/// Build the flat lookup map from id to merged static+live metadata.
///
/// Same traversal and pruning rules as [`build_display_tree`]. The sublayer
/// catalog comes exclusively from the registry; configuration cannot invent
/// sublayers.
pub fn build_static_lookup(
    roots: &[StaticNode],
    registry: &dyn LayerRegistry,
) -> HashMap<LayerId, MergedNode> {
    let mut lookup = HashMap::new();
    for root in roots {
        merge_into(root, None, registry, &mut lookup);
    }
    lookup
}

fn merge_into(
    node: &StaticNode,
    parent: Option<&LayerId>,
    registry: &dyn LayerRegistry,
    lookup: &mut HashMap<LayerId, MergedNode>,
) {
    let descriptor = registry.descriptor(node.id());

    let kind = if node.is_group() {
        MergedKind::Group
    } else {
        match &descriptor {
            None => {
                warn!(layer = %node.id(), "configured layer missing from registry, pruning");
                return;
            }
            Some(d) if d.class == LayerClass::Group => MergedKind::GroupLayer,
            Some(d) => MergedKind::Leaf(d.class),
        }
    };

    let meta = node.meta();
    let caption = descriptor
        .as_ref()
        .map(|d| d.caption.clone())
        .or_else(|| meta.name.clone())
        .unwrap_or_else(|| node.id().to_string());

    lookup.insert(
        node.id().clone(),
        MergedNode {
            id: node.id().clone(),
            caption,
            kind,
            all_sub_layers: descriptor
                .as_ref()
                .map(|d| d.all_sub_layers.clone())
                .unwrap_or_default(),
            initially_toggled: meta.initially_toggled,
            initially_expanded: meta.initially_expanded,
            initial_draw_order: meta.initial_draw_order,
            min_zoom: descriptor.as_ref().and_then(|d| d.min_zoom),
            max_zoom: descriptor.and_then(|d| d.max_zoom),
            parent: parent.cloned(),
        },
    );

    for child in node.children() {
        merge_into(child, Some(node.id()), registry, lookup);
    }
}
