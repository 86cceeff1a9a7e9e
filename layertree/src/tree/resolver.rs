//! Recursive lookups over the static configuration tree.

use crate::config::StaticNode;
use crate::id::LayerId;

/// Find the configuration node with the given id, depth-first.
///
/// Searches the rooted forest and returns the first match, or `None` if the
/// id is absent. Matches leaves as well as groups; callers that require a
/// group can check [`StaticNode::is_group`].
pub fn find_group_config<'a>(
    roots: &'a [StaticNode],
    group_id: &LayerId,
) -> Option<&'a StaticNode> {
    for node in roots {
        if node.id() == group_id {
            return Some(node);
        }
        if let Some(found) = find_group_config(node.children(), group_id) {
            return Some(found);
        }
    }
    None
}

/// Collect the ids of all leaf descendants of a node, in configured order.
///
/// Group children and layer children are interleaved exactly as configured
/// (layers before subgroups at each level). Tolerates `None` by returning
/// an empty sequence, so a misconfigured group id degrades to a no-op
/// cascade rather than a crash.
pub fn collect_layer_ids_in_group(node: Option<&StaticNode>) -> Vec<LayerId> {
    let mut ids = Vec::new();
    if let Some(node) = node {
        collect_into(node, &mut ids);
    }
    ids
}

fn collect_into(node: &StaticNode, ids: &mut Vec<LayerId>) {
    match node {
        StaticNode::Leaf { id, .. } => ids.push(id.clone()),
        StaticNode::Group { children, .. } => {
            for child in children {
                collect_into(child, ids);
            }
        }
    }
}
