// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Configuration for the emitter cache.
//!
//! # Example
//!
//! ```
//! use emitter_cache::CacheConfig;
//!
//! // Defaults: evict after 30 idle cycles, safety clear above 500 records
//! let config = CacheConfig::default();
//! assert_eq!(config.max_age, 30);
//! assert_eq!(config.max_working_set, 500);
//!
//! let config = CacheConfig {
//!     store_url: Some("sqlite://emitters.db?mode=rwc".into()),
//!     sync_interval_ms: 10_000,
//!     ..Default::default()
//! };
//! ```

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Durable store connection string (e.g., "sqlite://emitters.db?mode=rwc").
    /// `None` runs the cache in-memory only.
    #[serde(default)]
    pub store_url: Option<String>,

    /// Maintenance cycles without access before a record is evicted
    #[serde(default = "default_max_age")]
    pub max_age: u32,

    /// Resident records above which a sync clears the whole working set
    #[serde(default = "default_max_working_set")]
    pub max_working_set: usize,

    /// Interval between maintenance passes run by [`crate::MaintenanceTask`]
    #[serde(default = "default_sync_interval_ms")]
    pub sync_interval_ms: u64,

    /// Consecutive failed syncs before failures are reported as errors
    #[serde(default = "default_failure_escalation_threshold")]
    pub failure_escalation_threshold: u32,
}

fn default_max_age() -> u32 { 30 }
fn default_max_working_set() -> usize { 500 }
fn default_sync_interval_ms() -> u64 { 30_000 }
fn default_failure_escalation_threshold() -> u32 { 3 }

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            store_url: None,
            max_age: default_max_age(),
            max_working_set: default_max_working_set(),
            sync_interval_ms: default_sync_interval_ms(),
            failure_escalation_threshold: default_failure_escalation_threshold(),
        }
    }
}
