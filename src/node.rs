//! Flat node records and the assembled tree view.
//!
//! A [`Node`] is one row of the structural index. A [`TreeNode`] is the
//! in-memory view with children attached; it is built on demand and never
//! persisted.

use serde::{Deserialize, Serialize};

use crate::path::TreePath;

/// One row of the structural index, identified by `(path, namespace)`.
///
/// # Example
///
/// ```
/// use espalier::{Node, TreePath};
///
/// let path = TreePath::from_segments(["pages", "home"]).unwrap();
/// let node = Node::resource(path, "wiki", "home", "page-42");
/// assert!(node.leaf);
/// assert_eq!(node.value, "page-42");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Position in the hierarchy.
    pub path: TreePath,
    /// Isolation key: partitions one hierarchy from another sharing the
    /// same backing store.
    pub namespace: String,
    /// Display name.
    pub name: String,
    /// `false` marks a group (container), `true` a resource reference.
    pub leaf: bool,
    /// Opaque resource id for leaves; empty for groups. Understood only by
    /// the external resource store.
    pub value: String,
}

impl Node {
    /// A container node. `value` is always empty for groups.
    pub fn group(path: TreePath, namespace: &str, name: &str) -> Self {
        Self {
            path,
            namespace: namespace.to_string(),
            name: name.to_string(),
            leaf: false,
            value: String::new(),
        }
    }

    /// A leaf node referencing an external payload by id.
    pub fn resource(path: TreePath, namespace: &str, name: &str, resource_id: &str) -> Self {
        Self {
            path,
            namespace: namespace.to_string(),
            name: name.to_string(),
            leaf: true,
            value: resource_id.to_string(),
        }
    }

    #[must_use]
    pub fn is_group(&self) -> bool {
        !self.leaf
    }
}

/// A [`Node`] with its children attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    #[serde(flatten)]
    pub node: Node,
    #[serde(default)]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    #[must_use]
    pub fn new(node: Node) -> Self {
        Self {
            node,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &TreePath {
        &self.node.path
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.node.name
    }

    /// Look up a direct child by display name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&TreeNode> {
        self.children.iter().find(|c| c.node.name == name)
    }
}

impl From<Node> for TreeNode {
    fn from(node: Node) -> Self {
        Self::new(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn home_path() -> TreePath {
        TreePath::from_segments(["pages", "home"]).unwrap()
    }

    #[test]
    fn test_group_has_empty_value() {
        let node = Node::group(TreePath::root(), "wiki", "wiki");
        assert!(node.is_group());
        assert!(!node.leaf);
        assert_eq!(node.value, "");
    }

    #[test]
    fn test_resource_carries_id() {
        let node = Node::resource(home_path(), "wiki", "home", "page-42");
        assert!(node.leaf);
        assert!(!node.is_group());
        assert_eq!(node.value, "page-42");
    }

    #[test]
    fn test_tree_node_starts_childless() {
        let tree: TreeNode = Node::group(TreePath::root(), "wiki", "wiki").into();
        assert!(tree.children.is_empty());
        assert!(tree.path().is_root());
    }

    #[test]
    fn test_child_lookup_by_name() {
        let mut tree = TreeNode::new(Node::group(TreePath::root(), "wiki", "wiki"));
        let pages = TreePath::from_segments(["pages"]).unwrap();
        tree.children
            .push(TreeNode::new(Node::group(pages, "wiki", "pages")));

        assert!(tree.child("pages").is_some());
        assert!(tree.child("missing").is_none());
    }

    #[test]
    fn test_serde_shape_matches_wire_format() {
        let node = Node::resource(home_path(), "wiki", "home", "page-42");
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["path"], "\u{1}pages\u{1}home");
        assert_eq!(json["namespace"], "wiki");
        assert_eq!(json["leaf"], true);
        assert_eq!(json["value"], "page-42");

        // TreeNode flattens the node fields next to `children`
        let tree = TreeNode::new(node);
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json["name"], "home");
        assert!(json["children"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_tree_node_roundtrips_through_json() {
        let mut tree = TreeNode::new(Node::group(TreePath::root(), "wiki", "wiki"));
        tree.children.push(TreeNode::new(Node::resource(
            home_path(),
            "wiki",
            "home",
            "page-42",
        )));

        let encoded = serde_json::to_string(&tree).unwrap();
        let decoded: TreeNode = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, tree);
    }
}
