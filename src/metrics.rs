// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for the emitter cache.
//!
//! Uses the `metrics` crate for backend-agnostic collection. The host
//! chooses the exporter.
//!
//! # Metric Naming Convention
//! - `emitter_cache_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `operation`: get, preload, sync, close, open
//! - `outcome`: hit, miss, success, error, skipped

use metrics::{counter, gauge, histogram};
use std::time::{Duration, Instant};

/// Record a cache operation outcome
pub fn record_operation(operation: &str, outcome: &str) {
    counter!(
        "emitter_cache_operations_total",
        "operation" => operation.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record operation latency
pub fn record_latency(operation: &str, duration: Duration) {
    histogram!(
        "emitter_cache_operation_seconds",
        "operation" => operation.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Set current number of resident records
pub fn set_working_set_size(count: usize) {
    gauge!("emitter_cache_working_set_records").set(count as f64);
}

/// Record records loaded from the store by preload
pub fn record_preloaded(count: usize) {
    counter!("emitter_cache_preloaded_records_total").increment(count as u64);
}

/// Record records written in one sync transaction
pub fn record_records_written(count: usize) {
    counter!("emitter_cache_written_records_total").increment(count as u64);
    histogram!("emitter_cache_sync_batch_size").record(count as f64);
}

/// Record aged-out records removed after a sync
pub fn record_eviction(count: usize) {
    counter!("emitter_cache_evictions_total").increment(count as u64);
}

/// Record a safety-valve clear of the whole working set
pub fn record_safety_clear(dropped: usize) {
    counter!("emitter_cache_safety_clears_total").increment(1);
    counter!("emitter_cache_safety_cleared_records_total").increment(dropped as u64);
}

/// Record a store failure by operation
pub fn record_store_error(operation: &str) {
    counter!(
        "emitter_cache_store_errors_total",
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Set consecutive failed maintenance passes
pub fn set_consecutive_sync_failures(count: u32) {
    gauge!("emitter_cache_consecutive_sync_failures").set(f64::from(count));
}

/// Set whether a durable store is attached
pub fn set_store_available(available: bool) {
    gauge!("emitter_cache_store_available").set(if available { 1.0 } else { 0.0 });
}

/// A timing guard that records latency on drop
pub struct LatencyTimer {
    operation: &'static str,
    start: Instant,
}

impl LatencyTimer {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        record_latency(self.operation, self.start.elapsed());
    }
}
