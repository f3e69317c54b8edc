// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Path-addressed storage façade.
//!
//! [`TreeService`] ties the structural index to one payload store and one
//! namespace: callers speak paths, the service splits each operation into
//! index rows and payload bytes.
//!
//! # Ordering & Partial Failure
//!
//! The index and the payload store are not transactionally coupled. Each
//! operation sequences its two writes so the failure mode is recoverable,
//! but the window is real and is not rolled back here:
//!
//! - `save_resource` writes the index row first; if the payload write then
//!   fails, a leaf row points at a payload that never landed. Re-saving the
//!   same path retries just the payload.
//! - `delete` removes payloads first; if the index write then fails, rows
//!   point at deleted payloads but stay addressable for a retried delete.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use espalier::{
//!     InMemoryResourceStore, InMemoryTreeIndex, Resource, TreePath, TreeService,
//! };
//!
//! #[derive(Clone)]
//! struct Note {
//!     id: String,
//!     text: String,
//! }
//!
//! impl Resource for Note {
//!     fn id(&self) -> &str {
//!         &self.id
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), espalier::TreeError> {
//! let service = TreeService::new(
//!     Arc::new(InMemoryTreeIndex::new()),
//!     InMemoryResourceStore::new(),
//!     "notes",
//! )
//! .await?;
//!
//! let inbox = TreePath::root().child("inbox")?;
//! service.save_group(&inbox, "inbox").await?;
//!
//! let note = Note {
//!     id: "n-1".to_string(),
//!     text: "ship it".to_string(),
//! };
//! service
//!     .save_resource(&inbox.child("first")?, "first", "n-1", &note)
//!     .await?;
//!
//! assert_eq!(service.tree().await?.len(), 1);
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::builder::build_tree;
use crate::error::{TreeError, TreeResult};
use crate::index::TreeIndex;
use crate::metrics::LatencyTimer;
use crate::node::{Node, TreeNode};
use crate::path::TreePath;
use crate::store::ResourceStore;

/// Tagged result of a path lookup: a group listing or a leaf payload.
///
/// Serializes as `{"type": "GROUP", "value": [...]}` or
/// `{"type": "RESOURCE", "value": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "UPPERCASE")]
pub enum ValueHolder<R> {
    Group(Vec<TreeNode>),
    Resource(R),
}

impl<R> ValueHolder<R> {
    #[must_use]
    pub fn is_group(&self) -> bool {
        matches!(self, ValueHolder::Group(_))
    }

    #[must_use]
    pub fn is_resource(&self) -> bool {
        matches!(self, ValueHolder::Resource(_))
    }

    #[must_use]
    pub fn as_group(&self) -> Option<&[TreeNode]> {
        match self {
            ValueHolder::Group(children) => Some(children),
            ValueHolder::Resource(_) => None,
        }
    }

    #[must_use]
    pub fn as_resource(&self) -> Option<&R> {
        match self {
            ValueHolder::Resource(payload) => Some(payload),
            ValueHolder::Group(_) => None,
        }
    }

    #[must_use]
    pub fn into_resource(self) -> Option<R> {
        match self {
            ValueHolder::Resource(payload) => Some(payload),
            ValueHolder::Group(_) => None,
        }
    }
}

/// Path-addressed get/save/delete/list over one namespace.
pub struct TreeService<S: ResourceStore> {
    index: Arc<dyn TreeIndex>,
    store: S,
    namespace: String,
}

impl<S: ResourceStore> TreeService<S> {
    /// Build a service and ensure the namespace's root group exists.
    pub async fn new(index: Arc<dyn TreeIndex>, store: S, namespace: &str) -> TreeResult<Self> {
        let service = Self {
            index,
            store,
            namespace: namespace.to_string(),
        };
        service.init().await?;
        Ok(service)
    }

    /// Idempotently create the root group node for this namespace.
    pub async fn init(&self) -> TreeResult<()> {
        let _timer = LatencyTimer::new("service", "init");
        let result = self.init_inner().await;
        crate::metrics::record_outcome("service", "init", &result);
        result
    }

    async fn init_inner(&self) -> TreeResult<()> {
        let root = TreePath::root();
        if self.index.get(&root, &self.namespace).await?.is_some() {
            return Ok(());
        }

        let node = Node::group(root.clone(), &self.namespace, &self.namespace);
        match self.index.save(&node).await {
            Ok(()) => Ok(()),
            Err(e) => {
                // Another instance can create the root between the check and
                // the insert; losing that race still leaves the root in place.
                if self.index.get(&root, &self.namespace).await?.is_some() {
                    debug!(namespace = %self.namespace, "root created concurrently");
                    Ok(())
                } else {
                    Err(e)
                }
            }
        }
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The whole hierarchy, assembled. Returns the root's children.
    #[tracing::instrument(skip(self))]
    pub async fn tree(&self) -> TreeResult<Vec<TreeNode>> {
        let _timer = LatencyTimer::new("service", "tree");
        let result = self.tree_inner().await;
        crate::metrics::record_outcome("service", "tree", &result);
        result
    }

    async fn tree_inner(&self) -> TreeResult<Vec<TreeNode>> {
        let rows = self
            .index
            .descendants(&TreePath::root(), &self.namespace)
            .await?
            .unwrap_or_default();
        crate::metrics::record_tree_size(&self.namespace, rows.len());

        Ok(build_tree(rows, &self.namespace).children)
    }

    /// Look up a path and wrap what lives there.
    ///
    /// Groups come back as their direct-children listing, leaves as the
    /// stored payload. `None` when the path is absent, and also when a leaf
    /// row's payload is missing from the store.
    #[tracing::instrument(skip(self), fields(path = %path))]
    pub async fn get(&self, path: &TreePath) -> TreeResult<Option<ValueHolder<S::Resource>>> {
        let _timer = LatencyTimer::new("service", "get");
        let result = self.get_inner(path).await;
        crate::metrics::record_outcome("service", "get", &result);
        result
    }

    async fn get_inner(&self, path: &TreePath) -> TreeResult<Option<ValueHolder<S::Resource>>> {
        let Some(node) = self.index.get(path, &self.namespace).await? else {
            return Ok(None);
        };

        if node.leaf {
            match self.store.get(&node.value).await? {
                Some(payload) => Ok(Some(ValueHolder::Resource(payload))),
                None => {
                    debug!(path = %path, id = %node.value, "leaf row has no payload");
                    Ok(None)
                }
            }
        } else {
            // The listing only misses if the group vanished after the lookup
            let children = self.group(path).await?.unwrap_or_default();
            Ok(Some(ValueHolder::Group(children)))
        }
    }

    /// The raw payload at `path`, skipping the wrapper.
    ///
    /// `None` when the path is absent or names a group.
    pub async fn resource(&self, path: &TreePath) -> TreeResult<Option<S::Resource>> {
        let _timer = LatencyTimer::new("service", "resource");
        let result = self.resource_inner(path).await;
        crate::metrics::record_outcome("service", "resource", &result);
        result
    }

    async fn resource_inner(&self, path: &TreePath) -> TreeResult<Option<S::Resource>> {
        let Some(node) = self.index.get(path, &self.namespace).await? else {
            return Ok(None);
        };
        if !node.leaf {
            return Ok(None);
        }
        self.store.get(&node.value).await
    }

    /// Direct children of the group at `path`, one level, childless views.
    ///
    /// `None` when the path is absent.
    pub async fn group(&self, path: &TreePath) -> TreeResult<Option<Vec<TreeNode>>> {
        let _timer = LatencyTimer::new("service", "group");
        let result = self.group_inner(path).await;
        crate::metrics::record_outcome("service", "group", &result);
        result
    }

    async fn group_inner(&self, path: &TreePath) -> TreeResult<Option<Vec<TreeNode>>> {
        let rows = self.index.children(path, &self.namespace).await?;
        Ok(rows.map(|rows| rows.into_iter().map(TreeNode::from).collect()))
    }

    /// Store a payload and index it at `path`.
    ///
    /// The first save of a path writes the leaf row, then the payload.
    /// Re-saving an existing leaf path leaves the index row untouched and
    /// writes only the payload, so `name` and `resource_id` are ignored
    /// there. Saving over a group fails.
    #[tracing::instrument(skip(self, payload), fields(path = %path))]
    pub async fn save_resource(
        &self,
        path: &TreePath,
        name: &str,
        resource_id: &str,
        payload: &S::Resource,
    ) -> TreeResult<()> {
        let _timer = LatencyTimer::new("service", "save_resource");
        let result = self
            .save_resource_inner(path, name, resource_id, payload)
            .await;
        crate::metrics::record_outcome("service", "save_resource", &result);
        result
    }

    async fn save_resource_inner(
        &self,
        path: &TreePath,
        name: &str,
        resource_id: &str,
        payload: &S::Resource,
    ) -> TreeResult<()> {
        match self.index.get(path, &self.namespace).await? {
            Some(node) if !node.leaf => {
                return Err(TreeError::StructuralViolation(format!(
                    "cannot save a resource over group '{path}'"
                )));
            }
            Some(_) => {
                debug!(path = %path, "existing leaf, payload-only save");
            }
            None => {
                let node = Node::resource(path.clone(), &self.namespace, name, resource_id);
                self.index.save(&node).await?;
            }
        }

        self.store.save(payload).await?;
        Ok(())
    }

    /// Upsert the group node at `path` and fire the group-saved hook.
    ///
    /// Fails when a resource already lives at `path`. The existence check
    /// runs before the index write, so a concurrent first save of the same
    /// path can slip between them; the index's own structural rules still
    /// hold in that case.
    #[tracing::instrument(skip(self), fields(path = %path))]
    pub async fn save_group(&self, path: &TreePath, name: &str) -> TreeResult<()> {
        let _timer = LatencyTimer::new("service", "save_group");
        let result = self.save_group_inner(path, name).await;
        crate::metrics::record_outcome("service", "save_group", &result);
        result
    }

    async fn save_group_inner(&self, path: &TreePath, name: &str) -> TreeResult<()> {
        if let Some(existing) = self.index.get(path, &self.namespace).await? {
            if existing.leaf {
                return Err(TreeError::StructuralViolation(format!(
                    "cannot save a group over resource '{path}'"
                )));
            }
        }

        let node = Node::group(path.clone(), &self.namespace, name);
        self.index.save(&node).await?;
        self.store.on_group_saved(&node).await?;
        Ok(())
    }

    /// Delete the node at `path`.
    ///
    /// A leaf loses its payload, then its row. A group collects the resource
    /// ids of every leaf beneath it, hands them to the store's batch hook,
    /// then cascades the subtree out of the index. Fails with `NotFound`
    /// when nothing lives at `path`.
    #[tracing::instrument(skip(self), fields(path = %path))]
    pub async fn delete(&self, path: &TreePath) -> TreeResult<()> {
        let _timer = LatencyTimer::new("service", "delete");
        let result = self.delete_inner(path).await;
        crate::metrics::record_outcome("service", "delete", &result);
        result
    }

    async fn delete_inner(&self, path: &TreePath) -> TreeResult<()> {
        let Some(node) = self.index.get(path, &self.namespace).await? else {
            return Err(TreeError::NotFound(path.to_string()));
        };

        if node.leaf {
            // Payload first: if it fails, the row stays addressable for retry
            self.store.delete(&node.value).await?;
            self.index.delete(path, &self.namespace).await?;
            crate::metrics::record_nodes_deleted(1);
        } else {
            let rows = self
                .index
                .descendants(path, &self.namespace)
                .await?
                .unwrap_or_default();
            let ids: HashSet<String> = rows
                .iter()
                .filter(|n| n.leaf && !n.value.is_empty())
                .map(|n| n.value.clone())
                .collect();

            if let Err(e) = self.store.on_group_deleted(&ids).await {
                crate::metrics::record_error("store", "group_delete", e.kind());
                return Err(e);
            }

            self.index.delete(path, &self.namespace).await?;
            crate::metrics::record_nodes_deleted(rows.len());
            debug!(path = %path, rows = rows.len(), payloads = ids.len(), "group deleted");
        }

        Ok(())
    }
}
