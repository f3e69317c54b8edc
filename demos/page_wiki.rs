// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Page-wiki walkthrough.
//!
//! Demonstrates:
//! 1. Opening a SQLite-backed tree index
//! 2. Building a small wiki hierarchy of groups and pages
//! 3. Rendering the assembled tree
//! 4. Fetching pages and group listings by path
//! 5. Cascade-deleting a subtree (payloads included)
//! 6. Displaying metrics (OTEL-compatible)
//!
//! # Run
//!
//! ```bash
//! cargo run --example page_wiki
//! ```
//!
//! No external services needed; state lands in `./page_wiki_demo.db`.

use std::sync::Arc;

use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use serde::Serialize;

use espalier::{
    InMemoryResourceStore, Resource, SqlTreeIndex, TreeNode, TreePath, TreeService, ValueHolder,
};

const DB_PATH: &str = "./page_wiki_demo.db";

/// The payload type this wiki stores. The tree only ever sees its id.
#[derive(Debug, Clone, Serialize)]
struct Page {
    id: String,
    name: String,
    markdown: String,
    enrichment: Vec<Enrichment>,
}

/// A key/value a page was annotated with, tagged with where it came from.
#[derive(Debug, Clone, Serialize)]
struct Enrichment {
    key: String,
    value: String,
    source: String,
}

impl Page {
    fn new(id: &str, name: &str, markdown: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            markdown: markdown.to_string(),
            enrichment: Vec::new(),
        }
    }

    fn enriched(mut self, key: &str, value: &str, source: &str) -> Self {
        self.enrichment.push(Enrichment {
            key: key.to_string(),
            value: value.to_string(),
            source: source.to_string(),
        });
        self
    }
}

impl Resource for Page {
    fn id(&self) -> &str {
        &self.id
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install metrics recorder (captures all metrics for OTEL export)
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder.install().expect("failed to install metrics recorder");

    // Simple logging (no filter for simplicity)
    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .init();

    println!("\n╔═══════════════════════════════════════════════════════════════╗");
    println!("║              espalier: Page Wiki Example                      ║");
    println!("╚═══════════════════════════════════════════════════════════════╝\n");

    // Stale state from a previous run would make the walkthrough drift
    remove_db_files();

    // ─────────────────────────────────────────────────────────────────────────
    // 1. Open the index and build the service
    // ─────────────────────────────────────────────────────────────────────────
    println!("📦 Opening SQLite index at {}...", DB_PATH);

    let index = SqlTreeIndex::connect(&format!("sqlite://{}?mode=rwc", DB_PATH)).await?;
    let service = TreeService::new(Arc::new(index), InMemoryResourceStore::new(), "wiki").await?;

    println!("   ✅ Service ready (namespace: {})", service.namespace());

    // ─────────────────────────────────────────────────────────────────────────
    // 2. Build the wiki: groups first, then the pages under them
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n📝 Building the hierarchy...");

    let pages = TreePath::root().child("pages")?;
    let guide = pages.child("guide")?;
    let archive = TreePath::root().child("archive")?;

    for (path, name) in [(&pages, "Pages"), (&guide, "Guide"), (&archive, "Archive")] {
        service.save_group(path, name).await?;
        println!("   └─ 📁 {}", path);
    }

    let entries = [
        (pages.child("home")?, "Home", "page-home", "# Welcome\n\nStart here."),
        (guide.child("install")?, "Install", "page-install", "# Install\n\ncargo add espalier"),
        (guide.child("faq")?, "FAQ", "page-faq", "# FAQ\n\nQ: Why trees?"),
        (archive.child("old-home")?, "Old Home", "page-old", "# Welcome (2019)"),
    ];
    for (path, name, id, markdown) in &entries {
        let page = Page::new(id, name, markdown)
            .enriched("reading-time", "1min", "analyzer")
            .enriched("language", "en", "detector");
        service.save_resource(path, name, id, &page).await?;
        println!("   └─ 📄 {} → {}", path, id);
    }

    println!("   ⚡ {} pages stored", service.store().len());

    // ─────────────────────────────────────────────────────────────────────────
    // 3. Assemble and render the whole tree
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n🌳 Assembled tree:");
    for node in service.tree().await? {
        print_tree(&node, 0);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 4. Resolve paths: a page, a listing, and the group wire shape
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n🔍 Resolving paths...");

    let install = guide.child("install")?;
    match service.get(&install).await? {
        Some(ValueHolder::Resource(page)) => {
            let first_line = page.markdown.lines().next().unwrap_or("");
            println!("   └─ {} → {} ({})", install, first_line, page.name);
            for e in &page.enrichment {
                println!("      └─ 🏷️  {}={} (from {})", e.key, e.value, e.source);
            }
        }
        Some(ValueHolder::Group(_)) => println!("   └─ {} → (group?)", install),
        None => println!("   └─ {} → NOT FOUND", install),
    }

    let children = service.group(&guide).await?.unwrap_or_default();
    println!("   └─ {} lists {} children:", guide, children.len());
    for child in &children {
        println!("      └─ {} (id: {})", child.name(), child.node.value);
    }

    if let Some(holder) = service.get(&guide).await? {
        println!("   └─ {} as JSON:", guide);
        println!("{}", indent(&serde_json::to_string_pretty(&holder)?, 6));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 5. Cascade delete: the guide subtree and its payloads go together
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n🗑️  Deleting {} (cascades to its pages)...", guide);
    println!("   └─ Pages before: {}", service.store().len());

    service.delete(&guide).await?;

    println!("   └─ Pages after:  {}", service.store().len());
    match service.get(&install).await? {
        None => println!("   └─ ✅ {} is gone", install),
        Some(_) => println!("   └─ ⚠️  {} still resolves", install),
    }

    println!("\n🌳 Tree after delete:");
    for node in service.tree().await? {
        print_tree(&node, 0);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 6. Dump raw metrics (OTEL-compatible)
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n📈 Raw Metrics (OTEL export format):");
    dump_metrics(&snapshotter);

    println!("\n💡 Rows remain in {} - inspect with:", DB_PATH);
    println!("   └─ sqlite3 {} \"SELECT hex(path), name, leaf, value, depth FROM nodes;\"", DB_PATH);

    println!("\n╔═══════════════════════════════════════════════════════════════╗");
    println!("║                    Example complete!                          ║");
    println!("╚═══════════════════════════════════════════════════════════════╝\n");

    Ok(())
}

/// Render a subtree with one indent level per depth
fn print_tree(node: &TreeNode, depth: usize) {
    let marker = if node.node.leaf { "📄" } else { "📁" };
    let value = if node.node.value.is_empty() {
        String::new()
    } else {
        format!(" → {}", node.node.value)
    };
    println!("   {}{} {}{}", "  ".repeat(depth), marker, node.name(), value);
    for child in &node.children {
        print_tree(child, depth + 1);
    }
}

fn indent(text: &str, spaces: usize) -> String {
    let pad = " ".repeat(spaces);
    text.lines()
        .map(|line| format!("{}{}", pad, line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn remove_db_files() {
    let _ = std::fs::remove_file(DB_PATH);
    let _ = std::fs::remove_file(format!("{}-wal", DB_PATH));
    let _ = std::fs::remove_file(format!("{}-shm", DB_PATH));
}

/// Dump all captured metrics, sorted by name
fn dump_metrics(snapshotter: &Snapshotter) {
    let snapshot = snapshotter.snapshot();

    let mut lines: Vec<String> = Vec::new();
    for (composite_key, _, _, value) in snapshot.into_vec() {
        let (_kind, key) = composite_key.into_parts();
        let labels: Vec<String> = key
            .labels()
            .map(|l| format!("{}={}", l.key(), l.value()))
            .collect();
        let label_str = if labels.is_empty() {
            String::new()
        } else {
            format!("{{{}}}", labels.join(","))
        };

        let rendered = match value {
            DebugValue::Counter(v) => format!("{}{} = {}", key.name(), label_str, v),
            DebugValue::Gauge(v) => format!("{}{} = {:.2}", key.name(), label_str, v.into_inner()),
            DebugValue::Histogram(samples) => {
                let count = samples.len();
                let sum: f64 = samples.iter().map(|v| v.into_inner()).sum();
                let avg = if count > 0 { sum / count as f64 } else { 0.0 };
                format!("{}{} count={} avg={:.6}s", key.name(), label_str, count, avg)
            }
        };
        lines.push(rendered);
    }

    lines.sort();
    if lines.is_empty() {
        println!("   └─ (no metrics recorded)");
    }
    for line in &lines {
        println!("   └─ {}", line);
    }
}
