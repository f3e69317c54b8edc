// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! SQL-backed structural index.
//!
//! One row per node, keyed by `(path, namespace)`:
//! ```sql
//! CREATE TABLE nodes (
//!   path VARCHAR(512),      -- encoded materialized path
//!   namespace VARCHAR(128), -- hierarchy isolation key
//!   name VARCHAR(255),      -- display name (last segment)
//!   leaf TINYINT(1),        -- 0 = group, 1 = resource reference
//!   value TEXT,             -- opaque resource id ('' for groups)
//!   depth INT,              -- segment count, root = 0
//!   PRIMARY KEY (path, namespace)
//! )
//! ```
//!
//! `depth` is derived from `path` but stored so the direct-children query is
//! an indexable equality filter instead of per-row string math.
//!
//! # Prefix Scans
//!
//! Children and descendants are LIKE scans over the encoded path. Two details
//! matter for correctness:
//! 1. Patterns are delimiter bounded (`key + separator + '%'`), so a group
//!    named `group` never matches rows under a sibling named `group2`.
//! 2. `%`, `_` and `!` are legal in segment names, so user text is escaped
//!    and every scan carries `ESCAPE '!'`.
//!
//! # Write Atomicity
//!
//! `save` and `delete` run their existence checks and the write inside one
//! transaction. MySQL additionally row-locks the checked rows (`FOR UPDATE`);
//! SQLite serializes writers at the engine level, so a losing concurrent
//! writer surfaces the engine's busy error instead of interleaving.
//!
//! ## sqlx Any Driver Quirks
//!
//! - MySQL's default collation compares case-insensitively; the key columns
//!   are pinned to `utf8mb4_bin` so `Docs` and `docs` stay distinct rows.
//! - SQLite's LIKE is ASCII case-insensitive by default; every pooled
//!   connection runs `PRAGMA case_sensitive_like = ON` to match.
//! - TEXT columns may decode as `String` or as raw bytes depending on the
//!   backend, so reads try both.

use std::sync::Once;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Row};
use tracing::debug;

use super::traits::TreeIndex;
use crate::config::IndexConfig;
use crate::error::{TreeError, TreeResult};
use crate::node::Node;
use crate::path::{TreePath, SEPARATOR};

// SQLx `Any` driver requires runtime installation
static INSTALL_DRIVERS: Once = Once::new();

fn install_drivers() {
    INSTALL_DRIVERS.call_once(|| {
        sqlx::any::install_default_drivers();
    });
}

#[derive(Clone)]
pub struct SqlTreeIndex {
    pool: AnyPool,
    is_sqlite: bool,
}

impl SqlTreeIndex {
    /// Connect with default pool settings and initialize the schema.
    pub async fn connect(url: &str) -> TreeResult<Self> {
        let config = IndexConfig {
            url: url.to_string(),
            ..IndexConfig::default()
        };
        Self::connect_with(&config).await
    }

    /// Connect with explicit pool settings and initialize the schema.
    pub async fn connect_with(config: &IndexConfig) -> TreeResult<Self> {
        install_drivers();

        let is_sqlite = config.url.starts_with("sqlite:");

        let mut options = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs));

        if is_sqlite {
            // case_sensitive_like is connection scoped, so it has to be
            // pinned on every pooled connection, not once per database.
            options = options.after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA case_sensitive_like = ON")
                        .execute(conn)
                        .await?;
                    Ok(())
                })
            });
        }

        let pool = options
            .connect(&config.url)
            .await
            .map_err(|e| TreeError::IndexUnavailable(e.to_string()))?;

        let index = Self { pool, is_sqlite };

        // Enable WAL mode for SQLite (readers don't block the writer)
        if is_sqlite {
            index.enable_wal_mode().await?;
        }

        index.init_schema().await?;
        Ok(index)
    }

    /// Get a clone of the connection pool for sharing with other stores.
    pub fn pool(&self) -> AnyPool {
        self.pool.clone()
    }

    async fn enable_wal_mode(&self) -> TreeResult<()> {
        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                TreeError::IndexUnavailable(format!("Failed to enable WAL mode: {}", e))
            })?;

        // WAL is safe with NORMAL; FULL costs an extra fsync per write
        sqlx::query("PRAGMA synchronous = NORMAL")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                TreeError::IndexUnavailable(format!("Failed to set synchronous mode: {}", e))
            })?;

        Ok(())
    }

    async fn init_schema(&self) -> TreeResult<()> {
        let sql = if self.is_sqlite {
            r#"
            CREATE TABLE IF NOT EXISTS nodes (
                path TEXT NOT NULL,
                namespace TEXT NOT NULL,
                name TEXT NOT NULL DEFAULT '',
                leaf INTEGER NOT NULL DEFAULT 0,
                value TEXT NOT NULL DEFAULT '',
                depth INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (path, namespace)
            )
            "#
        } else {
            // MySQL - utf8mb4_bin on the key columns so path comparison and
            // LIKE scans are byte-exact; VARCHAR widths keep the composite
            // primary key inside InnoDB's index size limit.
            r#"
            CREATE TABLE IF NOT EXISTS nodes (
                path VARCHAR(512) CHARACTER SET utf8mb4 COLLATE utf8mb4_bin NOT NULL,
                namespace VARCHAR(128) CHARACTER SET utf8mb4 COLLATE utf8mb4_bin NOT NULL,
                name VARCHAR(255) NOT NULL DEFAULT '',
                leaf TINYINT(1) NOT NULL DEFAULT 0,
                value TEXT,
                depth INT NOT NULL DEFAULT 0,
                PRIMARY KEY (path, namespace),
                INDEX idx_nodes_children (namespace, depth)
            )
            "#
        };

        sqlx::query(sql)
            .execute(&self.pool)
            .await
            .map_err(|e| TreeError::IndexUnavailable(e.to_string()))?;

        // SQLite cannot declare an index inline with the table
        if self.is_sqlite {
            sqlx::query(
                "CREATE INDEX IF NOT EXISTS idx_nodes_children ON nodes (namespace, depth)",
            )
            .execute(&self.pool)
            .await
            .map_err(|e| TreeError::IndexUnavailable(e.to_string()))?;
        }

        Ok(())
    }

    /// Escape LIKE metacharacters in user text; scans pair this with
    /// `ESCAPE '!'`.
    fn escape_like(raw: &str) -> String {
        let mut escaped = String::with_capacity(raw.len());
        for ch in raw.chars() {
            if matches!(ch, '%' | '_' | '!') {
                escaped.push('!');
            }
            escaped.push(ch);
        }
        escaped
    }

    /// Pattern matching rows strictly beneath `path`.
    ///
    /// The trailing separator before the wildcard is what stops `group`
    /// matching rows under `group2`. The root key already ends with the
    /// separator, so it gets the bare wildcard.
    fn subtree_pattern(path: &TreePath) -> String {
        let mut pattern = Self::escape_like(&path.encode());
        if !path.is_root() {
            pattern.push(SEPARATOR);
        }
        pattern.push('%');
        pattern
    }

    /// MySQL locks the rows a transaction checked; SQLite has no row locks
    /// and rejects the clause, its single writer covers the same window.
    fn row_lock_clause(&self) -> &'static str {
        if self.is_sqlite {
            ""
        } else {
            " FOR UPDATE"
        }
    }

    // Boolean columns surface as BOOLEAN or as an integer depending on the
    // backend
    fn leaf_column(row: &AnyRow) -> bool {
        row.try_get::<bool, _>("leaf")
            .ok()
            .or_else(|| row.try_get::<i64, _>("leaf").ok().map(|v| v != 0))
            .or_else(|| row.try_get::<i32, _>("leaf").ok().map(|v| v != 0))
            .unwrap_or(false)
    }

    // Try reading as String first (SQLite TEXT), then as bytes (MySQL TEXT)
    fn text_column(row: &AnyRow, column: &str) -> Option<String> {
        row.try_get::<String, _>(column).ok().or_else(|| {
            row.try_get::<Vec<u8>, _>(column)
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok())
        })
    }

    fn node_from_row(row: &AnyRow) -> TreeResult<Node> {
        let path = Self::text_column(row, "path").ok_or_else(|| {
            TreeError::IndexUnavailable("unreadable path column".to_string())
        })?;
        let namespace = Self::text_column(row, "namespace").ok_or_else(|| {
            TreeError::IndexUnavailable("unreadable namespace column".to_string())
        })?;

        Ok(Node {
            path: TreePath::decode(&path),
            namespace,
            name: Self::text_column(row, "name").unwrap_or_default(),
            leaf: Self::leaf_column(row),
            value: Self::text_column(row, "value").unwrap_or_default(),
        })
    }
}

// Query and mutation bodies. The trait impl below wraps each with latency
// and outcome instrumentation.
impl SqlTreeIndex {
    async fn fetch_node(&self, path: &TreePath, namespace: &str) -> TreeResult<Option<Node>> {
        let row = sqlx::query(
            "SELECT path, namespace, name, leaf, value FROM nodes WHERE path = ? AND namespace = ?",
        )
        .bind(path.encode())
        .bind(namespace)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TreeError::IndexUnavailable(e.to_string()))?;

        row.as_ref().map(Self::node_from_row).transpose()
    }

    async fn fetch_children(
        &self,
        path: &TreePath,
        namespace: &str,
    ) -> TreeResult<Option<Vec<Node>>> {
        if self.fetch_node(path, namespace).await?.is_none() {
            return Ok(None);
        }

        let rows = sqlx::query(
            "SELECT path, namespace, name, leaf, value FROM nodes \
             WHERE namespace = ? AND depth = ? AND path LIKE ? ESCAPE '!' \
             ORDER BY path",
        )
        .bind(namespace)
        .bind((path.depth() + 1) as i64)
        .bind(Self::subtree_pattern(path))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TreeError::IndexUnavailable(e.to_string()))?;

        let nodes = rows
            .iter()
            .map(Self::node_from_row)
            .collect::<TreeResult<Vec<_>>>()?;
        Ok(Some(nodes))
    }

    async fn fetch_descendants(
        &self,
        path: &TreePath,
        namespace: &str,
    ) -> TreeResult<Option<Vec<Node>>> {
        let rows = sqlx::query(
            "SELECT path, namespace, name, leaf, value FROM nodes \
             WHERE namespace = ? AND (path = ? OR path LIKE ? ESCAPE '!') \
             ORDER BY path",
        )
        .bind(namespace)
        .bind(path.encode())
        .bind(Self::subtree_pattern(path))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TreeError::IndexUnavailable(e.to_string()))?;

        // The keyed row is part of every listing, so no rows at all means
        // the path itself is absent.
        if rows.is_empty() {
            return Ok(None);
        }

        rows.iter()
            .map(Self::node_from_row)
            .collect::<TreeResult<Vec<_>>>()
            .map(Some)
    }

    async fn upsert(&self, node: &Node) -> TreeResult<()> {
        let path_key = node.path.encode();
        let depth = node.path.depth() as i64;

        let mut tx = self.pool.begin().await.map_err(|e| {
            TreeError::IndexUnavailable(format!("Failed to begin transaction: {}", e))
        })?;

        let select_sql = format!(
            "SELECT leaf FROM nodes WHERE path = ? AND namespace = ?{}",
            self.row_lock_clause()
        );
        let existing = sqlx::query(&select_sql)
            .bind(&path_key)
            .bind(&node.namespace)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| TreeError::IndexUnavailable(e.to_string()))?;

        match existing {
            Some(row) => {
                // Overwrite in place. Turning a group into a leaf would
                // orphan its descendants.
                if !Self::leaf_column(&row) && node.leaf {
                    return Err(TreeError::StructuralViolation(format!(
                        "cannot convert group '{}' to a resource",
                        node.path
                    )));
                }

                sqlx::query(
                    "UPDATE nodes SET name = ?, leaf = ?, value = ?, depth = ? \
                     WHERE path = ? AND namespace = ?",
                )
                .bind(&node.name)
                .bind(i64::from(node.leaf))
                .bind(&node.value)
                .bind(depth)
                .bind(&path_key)
                .bind(&node.namespace)
                .execute(&mut *tx)
                .await
                .map_err(|e| TreeError::IndexUnavailable(e.to_string()))?;
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
                    let parent_row = sqlx::query(&select_sql)
                        .bind(parent.encode())
                        .bind(&node.namespace)
                        .fetch_optional(&mut *tx)
                        .await
                        .map_err(|e| TreeError::IndexUnavailable(e.to_string()))?;

                    match parent_row {
                        None => {
                            return Err(TreeError::StructuralViolation(format!(
                                "no parent node at '{parent}'"
                            )));
                        }
                        Some(row) if Self::leaf_column(&row) => {
                            return Err(TreeError::StructuralViolation(format!(
                                "parent node '{parent}' is a resource"
                            )));
                        }
                        Some(_) => {}
                    }
                }

                sqlx::query(
                    "INSERT INTO nodes (path, namespace, name, leaf, value, depth) \
                     VALUES (?, ?, ?, ?, ?, ?)",
                )
                .bind(&path_key)
                .bind(&node.namespace)
                .bind(&node.name)
                .bind(i64::from(node.leaf))
                .bind(&node.value)
                .bind(depth)
                .execute(&mut *tx)
                .await
                .map_err(|e| TreeError::IndexUnavailable(e.to_string()))?;
            }
        }

        tx.commit().await.map_err(|e| {
            TreeError::IndexUnavailable(format!("Failed to commit save: {}", e))
        })?;
        Ok(())
    }

    async fn remove(&self, path: &TreePath, namespace: &str) -> TreeResult<()> {
        let path_key = path.encode();

        let mut tx = self.pool.begin().await.map_err(|e| {
            TreeError::IndexUnavailable(format!("Failed to begin transaction: {}", e))
        })?;

        let select_sql = format!(
            "SELECT leaf FROM nodes WHERE path = ? AND namespace = ?{}",
            self.row_lock_clause()
        );
        let existing = sqlx::query(&select_sql)
            .bind(&path_key)
            .bind(namespace)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| TreeError::IndexUnavailable(e.to_string()))?;

        // Absent rows are a no-op
        let Some(row) = existing else {
            return Ok(());
        };

        if Self::leaf_column(&row) {
            sqlx::query("DELETE FROM nodes WHERE path = ? AND namespace = ?")
                .bind(&path_key)
                .bind(namespace)
                .execute(&mut *tx)
                .await
                .map_err(|e| TreeError::IndexUnavailable(e.to_string()))?;
        } else {
            let result = sqlx::query(
                "DELETE FROM nodes \
                 WHERE namespace = ? AND (path = ? OR path LIKE ? ESCAPE '!')",
            )
            .bind(namespace)
            .bind(&path_key)
            .bind(Self::subtree_pattern(path))
            .execute(&mut *tx)
            .await
            .map_err(|e| TreeError::IndexUnavailable(e.to_string()))?;

            debug!(path = %path, rows = result.rows_affected(), "cascade delete");
        }

        tx.commit().await.map_err(|e| {
            TreeError::IndexUnavailable(format!("Failed to commit delete: {}", e))
        })?;
        Ok(())
    }
}

#[async_trait]
impl TreeIndex for SqlTreeIndex {
    async fn get(&self, path: &TreePath, namespace: &str) -> TreeResult<Option<Node>> {
        let _timer = crate::time_operation!("index", "get");
        let result = self.fetch_node(path, namespace).await;
        crate::metrics::record_outcome("index", "get", &result);
        result
    }

    async fn children(
        &self,
        path: &TreePath,
        namespace: &str,
    ) -> TreeResult<Option<Vec<Node>>> {
        let _timer = crate::time_operation!("index", "children");
        let result = self.fetch_children(path, namespace).await;
        crate::metrics::record_outcome("index", "children", &result);
        result
    }

    async fn descendants(
        &self,
        path: &TreePath,
        namespace: &str,
    ) -> TreeResult<Option<Vec<Node>>> {
        let _timer = crate::time_operation!("index", "descendants");
        let result = self.fetch_descendants(path, namespace).await;
        crate::metrics::record_outcome("index", "descendants", &result);
        result
    }

    async fn save(&self, node: &Node) -> TreeResult<()> {
        let _timer = crate::time_operation!("index", "save");
        let result = self.upsert(node).await;
        crate::metrics::record_outcome("index", "save", &result);
        result
    }

    async fn delete(&self, path: &TreePath, namespace: &str) -> TreeResult<()> {
        let _timer = crate::time_operation!("index", "delete");
        let result = self.remove(path, namespace).await;
        crate::metrics::record_outcome("index", "delete", &result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_db_path(name: &str) -> PathBuf {
        // Use local temp/ folder (gitignored) instead of system temp
        let _ = std::fs::create_dir_all("temp");
        PathBuf::from("temp").join(format!("tree_index_test_{}.db", name))
    }

    /// Clean up SQLite database and its WAL files
    fn cleanup_db(path: &PathBuf) {
        let _ = std::fs::remove_file(path);
        let _ = std::fs::remove_file(format!("{}-wal", path.display()));
        let _ = std::fs::remove_file(format!("{}-shm", path.display()));
    }

    fn path(segments: &[&str]) -> TreePath {
        TreePath::from_segments(segments.iter().copied()).unwrap()
    }

    fn group(segments: &[&str]) -> Node {
        let p = path(segments);
        let name = p.last().unwrap_or("root").to_string();
        Node::group(p, "ns", &name)
    }

    fn resource(segments: &[&str], id: &str) -> Node {
        let p = path(segments);
        let name = p.last().unwrap_or("root").to_string();
        Node::resource(p, "ns", &name, id)
    }

    async fn open(db_path: &PathBuf) -> SqlTreeIndex {
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        let index = SqlTreeIndex::connect(&url).await.unwrap();
        index.save(&group(&[])).await.unwrap();
        index
    }

    #[tokio::test]
    async fn test_schema_init_is_idempotent() {
        let db_path = temp_db_path("idempotent");
        cleanup_db(&db_path);

        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        let _first = SqlTreeIndex::connect(&url).await.unwrap();
        let _second = SqlTreeIndex::connect(&url).await.unwrap();

        cleanup_db(&db_path);
    }

    #[tokio::test]
    async fn test_save_and_get_roundtrip() {
        let db_path = temp_db_path("roundtrip");
        cleanup_db(&db_path);
        let index = open(&db_path).await;

        index.save(&group(&["docs"])).await.unwrap();
        index.save(&resource(&["docs", "readme"], "id-7")).await.unwrap();

        let row = index
            .get(&path(&["docs", "readme"]), "ns")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.name, "readme");
        assert_eq!(row.value, "id-7");
        assert!(row.leaf);
        assert_eq!(row.path, path(&["docs", "readme"]));

        cleanup_db(&db_path);
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let db_path = temp_db_path("get_missing");
        cleanup_db(&db_path);
        let index = open(&db_path).await;

        let found = index.get(&path(&["ghost"]), "ns").await.unwrap();
        assert!(found.is_none());

        cleanup_db(&db_path);
    }

    #[tokio::test]
    async fn test_save_without_parent_fails() {
        let db_path = temp_db_path("no_parent");
        cleanup_db(&db_path);
        let index = open(&db_path).await;

        let err = index
            .save(&resource(&["missing", "leaf"], "id"))
            .await
            .unwrap_err();
        assert!(matches!(err, TreeError::StructuralViolation(_)));
        assert!(index
            .get(&path(&["missing", "leaf"]), "ns")
            .await
            .unwrap()
            .is_none());

        cleanup_db(&db_path);
    }

    #[tokio::test]
    async fn test_save_under_leaf_parent_fails() {
        let db_path = temp_db_path("leaf_parent");
        cleanup_db(&db_path);
        let index = open(&db_path).await;

        index.save(&resource(&["r"], "id")).await.unwrap();
        let err = index
            .save(&resource(&["r", "child"], "id2"))
            .await
            .unwrap_err();
        assert!(matches!(err, TreeError::StructuralViolation(_)));

        cleanup_db(&db_path);
    }

    #[tokio::test]
    async fn test_root_cannot_be_a_leaf() {
        let db_path = temp_db_path("leaf_root");
        cleanup_db(&db_path);

        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        let index = SqlTreeIndex::connect(&url).await.unwrap();

        let err = index.save(&resource(&[], "id")).await.unwrap_err();
        assert!(matches!(err, TreeError::StructuralViolation(_)));
        assert!(index.get(&TreePath::root(), "ns").await.unwrap().is_none());

        cleanup_db(&db_path);
    }

    #[tokio::test]
    async fn test_group_to_leaf_conversion_fails_and_row_is_unchanged() {
        let db_path = temp_db_path("convert");
        cleanup_db(&db_path);
        let index = open(&db_path).await;

        index.save(&group(&["g"])).await.unwrap();
        let err = index.save(&resource(&["g"], "id")).await.unwrap_err();
        assert!(matches!(err, TreeError::StructuralViolation(_)));

        let row = index.get(&path(&["g"]), "ns").await.unwrap().unwrap();
        assert!(!row.leaf);
        assert_eq!(row.value, "");

        cleanup_db(&db_path);
    }

    #[tokio::test]
    async fn test_resave_overwrites_all_fields() {
        let db_path = temp_db_path("resave");
        cleanup_db(&db_path);
        let index = open(&db_path).await;

        index.save(&resource(&["r"], "id-1")).await.unwrap();
        let mut updated = resource(&["r"], "id-2");
        updated.name = "renamed".to_string();
        index.save(&updated).await.unwrap();

        let row = index.get(&path(&["r"]), "ns").await.unwrap().unwrap();
        assert_eq!(row.value, "id-2");
        assert_eq!(row.name, "renamed");

        cleanup_db(&db_path);
    }

    #[tokio::test]
    async fn test_children_of_missing_key_returns_none() {
        let db_path = temp_db_path("children_missing");
        cleanup_db(&db_path);
        let index = open(&db_path).await;

        let result = index.children(&path(&["ghost"]), "ns").await.unwrap();
        assert!(result.is_none());

        cleanup_db(&db_path);
    }

    #[tokio::test]
    async fn test_children_of_root_are_depth_one_only() {
        let db_path = temp_db_path("children_root");
        cleanup_db(&db_path);
        let index = open(&db_path).await;

        index.save(&group(&["a"])).await.unwrap();
        index.save(&group(&["b"])).await.unwrap();
        index.save(&resource(&["a", "deep"], "id")).await.unwrap();

        let kids = index
            .children(&TreePath::root(), "ns")
            .await
            .unwrap()
            .unwrap();
        let names: Vec<&str> = kids.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);

        cleanup_db(&db_path);
    }

    #[tokio::test]
    async fn test_children_bounded_to_one_level() {
        let db_path = temp_db_path("children_level");
        cleanup_db(&db_path);
        let index = open(&db_path).await;

        index.save(&group(&["a"])).await.unwrap();
        index.save(&group(&["a", "b"])).await.unwrap();
        index.save(&resource(&["a", "b", "c"], "id")).await.unwrap();

        let kids = index.children(&path(&["a"]), "ns").await.unwrap().unwrap();
        assert_eq!(kids.len(), 1);
        assert_eq!(kids[0].name, "b");

        cleanup_db(&db_path);
    }

    #[tokio::test]
    async fn test_sibling_name_prefix_does_not_leak() {
        let db_path = temp_db_path("prefix_leak");
        cleanup_db(&db_path);
        let index = open(&db_path).await;

        index.save(&group(&["group"])).await.unwrap();
        index.save(&group(&["group2"])).await.unwrap();
        index.save(&resource(&["group2", "inner"], "id")).await.unwrap();

        let kids = index
            .children(&path(&["group"]), "ns")
            .await
            .unwrap()
            .unwrap();
        assert!(kids.is_empty());

        let subtree = index
            .descendants(&path(&["group"]), "ns")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(subtree.len(), 1);
        assert_eq!(subtree[0].name, "group");

        cleanup_db(&db_path);
    }

    #[tokio::test]
    async fn test_like_metacharacters_in_segments() {
        let db_path = temp_db_path("metachars");
        cleanup_db(&db_path);
        let index = open(&db_path).await;

        // '%' would match anything, '_' any one character, if unescaped
        index.save(&group(&["50%"])).await.unwrap();
        index.save(&resource(&["50%", "a_b!"], "id-1")).await.unwrap();
        index.save(&group(&["50x"])).await.unwrap();
        index.save(&resource(&["50x", "stray"], "id-2")).await.unwrap();

        let subtree = index
            .descendants(&path(&["50%"]), "ns")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(subtree.len(), 2);
        assert!(subtree.iter().all(|n| n.path.segments()[0] == "50%"));

        let kids = index.children(&path(&["50%"]), "ns").await.unwrap().unwrap();
        assert_eq!(kids.len(), 1);
        assert_eq!(kids[0].name, "a_b!");

        cleanup_db(&db_path);
    }

    #[tokio::test]
    async fn test_paths_are_case_sensitive() {
        let db_path = temp_db_path("case");
        cleanup_db(&db_path);
        let index = open(&db_path).await;

        index.save(&group(&["Docs"])).await.unwrap();
        index.save(&group(&["docs"])).await.unwrap();
        index.save(&resource(&["docs", "inner"], "id")).await.unwrap();

        let kids = index
            .children(&TreePath::root(), "ns")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(kids.len(), 2);

        // The LIKE scan must not fold case either
        let subtree = index
            .descendants(&path(&["Docs"]), "ns")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(subtree.len(), 1);

        cleanup_db(&db_path);
    }

    #[tokio::test]
    async fn test_descendants_include_self_and_whole_subtree() {
        let db_path = temp_db_path("descendants");
        cleanup_db(&db_path);
        let index = open(&db_path).await;

        index.save(&group(&["a"])).await.unwrap();
        index.save(&group(&["a", "b"])).await.unwrap();
        index.save(&resource(&["a", "b", "c"], "id")).await.unwrap();
        index.save(&group(&["other"])).await.unwrap();

        let subtree = index
            .descendants(&path(&["a"]), "ns")
            .await
            .unwrap()
            .unwrap();
        let names: Vec<&str> = subtree.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);

        cleanup_db(&db_path);
    }

    #[tokio::test]
    async fn test_delete_missing_is_noop() {
        let db_path = temp_db_path("delete_missing");
        cleanup_db(&db_path);
        let index = open(&db_path).await;

        index.delete(&path(&["ghost"]), "ns").await.unwrap();
        assert!(index.get(&TreePath::root(), "ns").await.unwrap().is_some());

        cleanup_db(&db_path);
    }

    #[tokio::test]
    async fn test_delete_leaf_removes_only_its_row() {
        let db_path = temp_db_path("delete_leaf");
        cleanup_db(&db_path);
        let index = open(&db_path).await;

        index.save(&group(&["g"])).await.unwrap();
        index.save(&resource(&["g", "r"], "id")).await.unwrap();

        index.delete(&path(&["g", "r"]), "ns").await.unwrap();

        assert!(index.get(&path(&["g", "r"]), "ns").await.unwrap().is_none());
        assert!(index.get(&path(&["g"]), "ns").await.unwrap().is_some());

        cleanup_db(&db_path);
    }

    #[tokio::test]
    async fn test_delete_group_cascades_through_subtree() {
        let db_path = temp_db_path("cascade");
        cleanup_db(&db_path);
        let index = open(&db_path).await;

        index.save(&group(&["g"])).await.unwrap();
        index.save(&resource(&["g", "r1"], "id1")).await.unwrap();
        index.save(&resource(&["g", "r2"], "id2")).await.unwrap();
        index.save(&group(&["g", "nested"])).await.unwrap();
        index
            .save(&resource(&["g", "nested", "r3"], "id3"))
            .await
            .unwrap();

        index.delete(&path(&["g"]), "ns").await.unwrap();

        let result = index.descendants(&path(&["g"]), "ns").await.unwrap();
        assert!(result.is_none());

        // Root survives the cascade
        let root_kids = index
            .children(&TreePath::root(), "ns")
            .await
            .unwrap()
            .unwrap();
        assert!(root_kids.is_empty());

        cleanup_db(&db_path);
    }

    #[tokio::test]
    async fn test_namespace_isolation() {
        let db_path = temp_db_path("namespaces");
        cleanup_db(&db_path);
        let index = open(&db_path).await;

        index.save(&Node::group(TreePath::root(), "other", "root")).await.unwrap();
        index.save(&group(&["shared"])).await.unwrap();
        index
            .save(&Node::group(path(&["shared"]), "other", "shared"))
            .await
            .unwrap();

        index.delete(&path(&["shared"]), "ns").await.unwrap();

        assert!(index.get(&path(&["shared"]), "ns").await.unwrap().is_none());
        assert!(index
            .get(&path(&["shared"]), "other")
            .await
            .unwrap()
            .is_some());

        cleanup_db(&db_path);
    }
}
