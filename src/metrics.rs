// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The embedding application is responsible for choosing the exporter
//! (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `espalier_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `component`: service, index, store
//! - `operation`: service ops (tree, get, resource, group, save_resource,
//!   save_group, delete) and index ops (get, children, descendants, save,
//!   delete)
//! - `status`: success, error

use metrics::{counter, gauge, histogram};
use std::time::{Duration, Instant};

use crate::error::TreeResult;

/// Record a completed operation
pub fn record_operation(component: &str, operation: &str, status: &str) {
    counter!(
        "espalier_operations_total",
        "component" => component.to_string(),
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record operation latency
pub fn record_latency(component: &str, operation: &str, duration: Duration) {
    histogram!(
        "espalier_operation_seconds",
        "component" => component.to_string(),
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record an error with category for alerting
pub fn record_error(component: &str, operation: &str, error_type: &str) {
    counter!(
        "espalier_errors_total",
        "component" => component.to_string(),
        "operation" => operation.to_string(),
        "error_type" => error_type.to_string()
    )
    .increment(1);
}

/// Record one operation's outcome: a success counter, or an error counter
/// tagged with the error kind
pub fn record_outcome<T>(component: &str, operation: &str, result: &TreeResult<T>) {
    match result {
        Ok(_) => record_operation(component, operation, "success"),
        Err(e) => record_error(component, operation, e.kind()),
    }
}

/// Record index rows removed by deletes (cascades count every row)
pub fn record_nodes_deleted(count: usize) {
    counter!("espalier_nodes_deleted_total").increment(count as u64);
}

/// Record a namespace's row count as observed by a full-tree fetch
pub fn record_tree_size(namespace: &str, count: usize) {
    gauge!("espalier_tree_size", "namespace" => namespace.to_string()).set(count as f64);
}

/// A timing guard that records latency on drop
pub struct LatencyTimer {
    component: &'static str,
    operation: &'static str,
    start: Instant,
}

impl LatencyTimer {
    /// Start a new latency timer
    pub fn new(component: &'static str, operation: &'static str) -> Self {
        Self {
            component,
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        record_latency(self.component, self.operation, self.start.elapsed());
    }
}

/// Convenience macro for timing operations
#[macro_export]
macro_rules! time_operation {
    ($component:expr, $op:expr) => {
        $crate::metrics::LatencyTimer::new($component, $op)
    };
}
