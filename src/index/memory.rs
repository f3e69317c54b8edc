use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use dashmap::DashMap;

use super::traits::TreeIndex;
use crate::error::{TreeError, TreeResult};
use crate::node::Node;
use crate::path::TreePath;

/// Process-local index, keyed by `(namespace, encoded path)`.
///
/// Behaves exactly like the SQL index, including the structural rules on
/// mutation, so services can be exercised without a database.
pub struct InMemoryTreeIndex {
    nodes: DashMap<(String, String), Node>,
    // save/delete validate against other rows before writing; the gate makes
    // the check and the write one atomic step. Reads stay lock-free.
    write_gate: Mutex<()>,
}

impl InMemoryTreeIndex {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: DashMap::new(),
            write_gate: Mutex::new(()),
        }
    }

    /// Get current row count
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Clear all rows
    pub fn clear(&self) {
        self.nodes.clear();
    }

    fn gate(&self) -> MutexGuard<'_, ()> {
        self.write_gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn key(path: &TreePath, namespace: &str) -> (String, String) {
        (namespace.to_string(), path.encode())
    }

    fn collect_sorted<F>(&self, namespace: &str, keep: F) -> Vec<Node>
    where
        F: Fn(&Node) -> bool,
    {
        let mut rows: Vec<(String, Node)> = self
            .nodes
            .iter()
            .filter(|entry| entry.key().0 == namespace && keep(entry.value()))
            .map(|entry| (entry.key().1.clone(), entry.value().clone()))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        rows.into_iter().map(|(_, node)| node).collect()
    }
}

impl Default for InMemoryTreeIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TreeIndex for InMemoryTreeIndex {
    async fn get(&self, path: &TreePath, namespace: &str) -> TreeResult<Option<Node>> {
        Ok(self
            .nodes
            .get(&Self::key(path, namespace))
            .map(|r| r.value().clone()))
    }

    async fn children(
        &self,
        path: &TreePath,
        namespace: &str,
    ) -> TreeResult<Option<Vec<Node>>> {
        if !self.nodes.contains_key(&Self::key(path, namespace)) {
            return Ok(None);
        }
        let child_depth = path.depth() + 1;
        Ok(Some(self.collect_sorted(namespace, |n| {
            n.path.depth() == child_depth && n.path.parent() == *path
        })))
    }

    async fn descendants(
        &self,
        path: &TreePath,
        namespace: &str,
    ) -> TreeResult<Option<Vec<Node>>> {
        if !self.nodes.contains_key(&Self::key(path, namespace)) {
            return Ok(None);
        }
        // Segment-wise prefix: never matches a sibling whose name merely
        // extends this one ("group" vs "group2").
        Ok(Some(self.collect_sorted(namespace, |n| {
            n.path.segments().starts_with(path.segments())
        })))
    }

    async fn save(&self, node: &Node) -> TreeResult<()> {
        let _gate = self.gate();
        let key = Self::key(&node.path, &node.namespace);

        let existing_leaf = self.nodes.get(&key).map(|r| r.leaf);
        match existing_leaf {
            Some(existing_leaf) => {
                if !existing_leaf && node.leaf {
                    return Err(TreeError::StructuralViolation(format!(
                        "cannot convert group '{}' to a resource",
                        node.path
                    )));
                }
            }
            None => {
                if node.path.is_root() {
                    if node.leaf {
                        return Err(TreeError::StructuralViolation(
                            "root cannot be a resource".to_string(),
                        ));
                    }
                } else {
                    let parent = node.path.parent();
                    let parent_leaf = self
                        .nodes
                        .get(&Self::key(&parent, &node.namespace))
                        .map(|r| r.leaf);
                    match parent_leaf {
                        None => {
                            return Err(TreeError::StructuralViolation(format!(
                                "no parent node at '{parent}'"
                            )))
                        }
                        Some(true) => {
                            return Err(TreeError::StructuralViolation(format!(
                                "parent node '{parent}' is a resource"
                            )))
                        }
                        Some(false) => {}
                    }
                }
            }
        }

        self.nodes.insert(key, node.clone());
        Ok(())
    }

    async fn delete(&self, path: &TreePath, namespace: &str) -> TreeResult<()> {
        let _gate = self.gate();
        let key = Self::key(path, namespace);

        let leaf = match self.nodes.get(&key).map(|r| r.leaf) {
            Some(leaf) => leaf,
            None => return Ok(()),
        };

        if leaf {
            self.nodes.remove(&key);
        } else {
            self.nodes.retain(|(ns, _), n| {
                ns != namespace || !n.path.segments().starts_with(path.segments())
            });
        }
        Ok(())
    }
}
