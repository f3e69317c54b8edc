//! Payload storage abstraction.
//!
//! The index never sees payload bytes; leaf rows carry only an opaque id
//! that some [`ResourceStore`] understands. One store is implemented per
//! payload type and injected into the service at construction.

use std::collections::HashSet;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::TreeResult;
use crate::node::Node;

/// A payload the tree can reference.
pub trait Resource: Send + Sync {
    /// Stable identifier the index's leaf rows point at.
    fn id(&self) -> &str;
}

/// Opaque payload store paired with the structural index.
///
/// Failures surface as
/// [`ResourceStoreFailure`](crate::error::TreeError::ResourceStoreFailure)
/// and are never retried here. The index and the store are not
/// transactionally coupled: if one write lands and the other fails, the
/// caller sees the error and owns recovery (see [`TreeService`] for the
/// exact ordering of each operation).
///
/// [`TreeService`]: crate::service::TreeService
#[async_trait]
pub trait ResourceStore: Send + Sync {
    type Resource: Resource;

    /// Load a payload by id.
    async fn get(&self, id: &str) -> TreeResult<Option<Self::Resource>>;

    /// Save a payload; the payload carries its own id.
    async fn save(&self, payload: &Self::Resource) -> TreeResult<()>;

    /// Delete a payload by id. Absent ids are not an error.
    async fn delete(&self, id: &str) -> TreeResult<()>;

    /// Called after a group node is written. Stores that mirror structure
    /// elsewhere (a search index, a cache) hook in here.
    async fn on_group_saved(&self, _node: &Node) -> TreeResult<()> {
        Ok(())
    }

    /// Called with the resource ids of every leaf under a group, before the
    /// group's subtree rows are removed from the index. The default deletes
    /// the payloads one by one; override to batch.
    async fn on_group_deleted(&self, ids: &HashSet<String>) -> TreeResult<()> {
        for id in ids {
            self.delete(id).await?;
        }
        Ok(())
    }
}

/// Process-local payload store for tests and embedding.
pub struct InMemoryResourceStore<R> {
    payloads: DashMap<String, R>,
}

impl<R> InMemoryResourceStore<R> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            payloads: DashMap::new(),
        }
    }

    /// Get current payload count
    #[must_use]
    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    /// Clear all payloads
    pub fn clear(&self) {
        self.payloads.clear();
    }
}

impl<R> Default for InMemoryResourceStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R> ResourceStore for InMemoryResourceStore<R>
where
    R: Resource + Clone,
{
    type Resource = R;

    async fn get(&self, id: &str) -> TreeResult<Option<R>> {
        Ok(self.payloads.get(id).map(|r| r.value().clone()))
    }

    async fn save(&self, payload: &R) -> TreeResult<()> {
        self.payloads.insert(payload.id().to_string(), payload.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> TreeResult<()> {
        self.payloads.remove(id);
        Ok(())
    }
}
