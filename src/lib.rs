//! # Espalier
//!
//! Tree-structured storage and retrieval over a flat relational key space.
//!
//! ## Architecture
//!
//! Callers address groups (directories) and resources (leaves) by path; the
//! backing store only ever sees rows keyed by an encoded path string and a
//! namespace:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        TreeService                          │
//! │  • Path-addressed get / save / delete / list                │
//! │  • One namespace, one payload store                         │
//! └─────────────────────────────────────────────────────────────┘
//!              │                                │
//!              ▼                                ▼
//! ┌──────────────────────────────┐ ┌──────────────────────────────┐
//! │          TreeIndex           │ │        ResourceStore         │
//! │  • One row per node          │ │  • Opaque payloads by id     │
//! │  • Materialized-path keys    │ │  • Implemented per payload   │
//! │  • Children via LIKE + depth │ │    type and injected         │
//! │  • Structural invariants     │ │  • Batch-delete hook         │
//! └──────────────────────────────┘ └──────────────────────────────┘
//!              │
//!              ▼
//! ┌──────────────────────────────┐
//! │        SQLite / MySQL        │
//! │  nodes(path, namespace,      │
//! │        name, leaf, value,    │
//! │        depth)                │
//! └──────────────────────────────┘
//! ```
//!
//! Listings are flat row sets; [`build_tree`] reassembles them into a rooted
//! [`TreeNode`] hierarchy in memory. Nothing is cached: every read re-queries
//! the index.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use espalier::{InMemoryResourceStore, Resource, SqlTreeIndex, TreePath, TreeService};
//!
//! #[derive(Clone)]
//! struct Page {
//!     id: String,
//!     markdown: String,
//! }
//!
//! impl Resource for Page {
//!     fn id(&self) -> &str {
//!         &self.id
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let index = SqlTreeIndex::connect("sqlite://wiki.db?mode=rwc")
//!         .await
//!         .expect("Failed to open index");
//!     let store = InMemoryResourceStore::new();
//!     let service = TreeService::new(Arc::new(index), store, "wiki")
//!         .await
//!         .expect("Failed to init service");
//!
//!     // Groups first: a resource needs an existing parent group
//!     let pages = TreePath::root().child("pages").unwrap();
//!     service.save_group(&pages, "pages").await.expect("Failed to save group");
//!
//!     let home = pages.child("home").unwrap();
//!     let page = Page {
//!         id: "page-1".into(),
//!         markdown: "# Home".into(),
//!     };
//!     service
//!         .save_resource(&home, "home", "page-1", &page)
//!         .await
//!         .expect("Failed to save resource");
//!
//!     // The whole hierarchy, assembled from flat rows
//!     for node in service.tree().await.unwrap() {
//!         println!("{}: {} children", node.name(), node.children.len());
//!     }
//!
//!     // Cascades: removes /pages/home and its payload too
//!     service.delete(&pages).await.expect("Failed to delete");
//! }
//! ```
//!
//! ## Features
//!
//! - **Materialized Paths**: arbitrary-depth hierarchies as prefix-scannable
//!   string keys; children and subtrees are single indexable queries
//! - **Structural Invariants**: no orphaned children, no group-to-leaf
//!   conversion, no leaf root; violations fail synchronously
//! - **Cascading Deletes**: a group delete removes its whole subtree and
//!   batch-deletes the payloads beneath it
//! - **Namespace Isolation**: many hierarchies share one table without
//!   seeing each other
//! - **Pluggable Payloads**: one [`ResourceStore`] per payload type,
//!   injected at construction
//! - **SQLite & MySQL**: one code path through sqlx's `Any` driver
//!
//! ## Configuration
//!
//! See [`IndexConfig`] for connection pool options.
//!
//! ## Modules
//!
//! - [`service`]: The [`TreeService`] façade callers talk to
//! - [`index`]: The structural index (SQL and in-memory)
//! - [`store`]: The payload-store seam and hooks
//! - [`path`]: Path encoding ([`TreePath`])
//! - [`node`]: Flat rows ([`Node`]) and assembled views ([`TreeNode`])
//! - [`builder`]: Row-set-to-tree assembly

pub mod builder;
pub mod config;
pub mod error;
pub mod index;
pub mod metrics;
pub mod node;
pub mod path;
pub mod service;
pub mod store;

pub use builder::build_tree;
pub use config::IndexConfig;
pub use error::{TreeError, TreeResult};
pub use index::{InMemoryTreeIndex, SqlTreeIndex, TreeIndex};
pub use metrics::LatencyTimer;
pub use node::{Node, TreeNode};
pub use path::{TreePath, SEPARATOR};
pub use service::{TreeService, ValueHolder};
pub use store::{InMemoryResourceStore, Resource, ResourceStore};
