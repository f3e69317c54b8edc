//! Structural index abstraction.

use async_trait::async_trait;

use crate::error::TreeResult;
use crate::node::Node;
use crate::path::TreePath;

/// Relational index over materialized-path rows.
///
/// Row identity is `(path, namespace)`. Listings come back in ascending
/// encoded-path order, which always places a parent before its descendants.
///
/// `save` and `delete` are check-then-act sequences. Implementations must
/// make each call atomic against concurrent writers (one transaction, or an
/// equivalent write lock); the window is not left to callers.
#[async_trait]
pub trait TreeIndex: Send + Sync {
    /// Single-row lookup at `(path, namespace)`.
    async fn get(&self, path: &TreePath, namespace: &str) -> TreeResult<Option<Node>>;

    /// Rows exactly one level below `path`.
    ///
    /// Returns `None` when `path` itself has no row in `namespace`. The
    /// prefix match is delimiter bounded: a group named `group` never picks
    /// up rows under a sibling named `group2`.
    async fn children(&self, path: &TreePath, namespace: &str)
        -> TreeResult<Option<Vec<Node>>>;

    /// The row at `path` plus every row beneath it, at any depth.
    ///
    /// Returns `None` when `path` itself has no row in `namespace`; a row
    /// with no descendants yields a one-element listing. Bounded the same
    /// way as [`children`](TreeIndex::children).
    async fn descendants(&self, path: &TreePath, namespace: &str)
        -> TreeResult<Option<Vec<Node>>>;

    /// Insert or overwrite the row at `(node.path, node.namespace)`.
    ///
    /// Structural rules, violations reported as
    /// [`StructuralViolation`](crate::error::TreeError::StructuralViolation):
    /// an existing group row cannot be overwritten as a leaf (that would
    /// orphan its descendants); a new root row cannot be a leaf; a new
    /// non-root row requires an existing non-leaf parent. An overwrite
    /// never moves the row to another namespace.
    async fn save(&self, node: &Node) -> TreeResult<()>;

    /// Remove the row at `(path, namespace)`.
    ///
    /// Absent rows are a no-op. A leaf removes exactly its own row; a group
    /// removes itself and every descendant in one cascade.
    async fn delete(&self, path: &TreePath, namespace: &str) -> TreeResult<()>;
}
