//! The structural index: one relational row per tree node.
//!
//! # Design
//!
//! A node's position is materialized into its key, so locality queries
//! become string scans over one flat table:
//!
//! ```text
//! /pages/home/intro
//!
//! Becomes (␁ = the reserved separator):
//!
//! ␁pages ──────────────── depth 1
//! ␁pages␁home ─────────── depth 2
//! ␁pages␁home␁intro ───── depth 3
//! ```
//!
//! - exact node:     `path = key`
//! - direct children: `path LIKE key␁% AND depth = depth(key) + 1`
//! - whole subtree:  `path = key OR path LIKE key␁%`
//!
//! The trailing separator in the pattern keeps sibling names that merely
//! extend each other (`group`, `group2`) out of each other's subtrees, and
//! the stored `depth` column turns "direct child" into an equality filter.
//!
//! # Implementations
//!
//! [`SqlTreeIndex`] runs against SQLite or MySQL through sqlx's `Any`
//! driver and is the production index. [`InMemoryTreeIndex`] enforces the
//! same structural rules over a [`DashMap`](dashmap::DashMap) and exists
//! for tests and embedding.

mod memory;
mod sql;
mod traits;

pub use memory::InMemoryTreeIndex;
pub use sql::SqlTreeIndex;
pub use traits::TreeIndex;
