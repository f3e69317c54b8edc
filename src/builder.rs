//! Assembly of a flat row set into a rooted tree.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use tracing::warn;

use crate::node::{Node, TreeNode};
use crate::path::TreePath;

/// Assemble index rows into a tree rooted at a synthetic root node.
///
/// The root slot is pre-seeded so the result is always rooted even when the
/// row set omits the root row; a root row in the set replaces the synthetic
/// one. Sibling order is the input row order. Rows whose parent is missing
/// from the set are dropped with a warning; sets fetched as full descendants
/// of an ancestor never contain such rows.
#[must_use]
pub fn build_tree(nodes: Vec<Node>, namespace: &str) -> TreeNode {
    let root_path = TreePath::root();

    // Slot 0 is the root; every other slot index is input arrival order.
    let mut slots: Vec<Option<TreeNode>> = Vec::with_capacity(nodes.len() + 1);
    let mut index_of: HashMap<TreePath, usize> = HashMap::with_capacity(nodes.len() + 1);
    slots.push(Some(TreeNode::new(Node::group(
        root_path.clone(),
        namespace,
        namespace,
    ))));
    index_of.insert(root_path, 0);

    for node in nodes {
        match index_of.entry(node.path.clone()) {
            Entry::Occupied(slot) => slots[*slot.get()] = Some(TreeNode::new(node)),
            Entry::Vacant(slot) => {
                slot.insert(slots.len());
                slots.push(Some(TreeNode::new(node)));
            }
        }
    }

    // Deepest rows attach first so a subtree is complete before it moves into
    // its parent. The sort is stable: siblings keep input order.
    let depths: Vec<usize> = slots
        .iter()
        .map(|slot| slot.as_ref().map_or(0, |n| n.node.path.depth()))
        .collect();
    let mut order: Vec<usize> = (1..slots.len()).collect();
    order.sort_by_key(|&i| std::cmp::Reverse(depths[i]));

    for i in order {
        let Some(child) = slots[i].take() else { continue };
        let parent_path = child.node.path.parent();
        let Some(&parent_slot) = index_of.get(&parent_path) else {
            warn!(path = %child.node.path, "dropping row with no parent in set");
            continue;
        };
        match slots[parent_slot].as_mut() {
            Some(parent) => parent.children.push(child),
            None => warn!(path = %child.node.path, "dropping row with no parent in set"),
        }
    }

    slots[0]
        .take()
        .unwrap_or_else(|| TreeNode::new(Node::group(TreePath::root(), namespace, namespace)))
}
