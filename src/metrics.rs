// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for the criteria engine.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The embedding process is responsible for choosing the exporter
//! (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `search_criteria_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `backend`: solr, sphinx
//! - `status`: success, error
//! - `strategy`: direct, batch

use metrics::{counter, histogram};
use std::time::Duration;

/// Record an executed search query
pub fn record_query(backend: &str, status: &str) {
    counter!(
        "search_criteria_queries_total",
        "backend" => backend.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record query execution latency
pub fn record_query_latency(backend: &str, duration: Duration) {
    histogram!(
        "search_criteria_query_seconds",
        "backend" => backend.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record the number of documents returned by a query
pub fn record_result_count(count: usize) {
    histogram!("search_criteria_results").record(count as f64);
}

/// Record a completed index run
pub fn record_index_run(strategy: &str, status: &str) {
    counter!(
        "search_criteria_index_runs_total",
        "strategy" => strategy.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record the number of documents pushed by an index run
pub fn record_indexed_documents(strategy: &str, count: usize) {
    histogram!(
        "search_criteria_indexed_documents",
        "strategy" => strategy.to_string()
    )
    .record(count as f64);
}
