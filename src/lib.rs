// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! # Emitter Cache
//!
//! A write-back cache of RF emitter records (cell towers, Wi-Fi access
//! points) for offline position estimation.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Scan pipeline                        │
//! │  • preload(ids seen this cycle)  - one bulk store fetch    │
//! │  • get(id) per emitter           - lookup-or-create        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  EmitterCache (working set)                 │
//! │  • One async lock over the identity → record mapping       │
//! │  • Age counter per record, reset on every lookup           │
//! │  • Dirty tracking per record                               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!               (sync: one transaction per maintenance pass)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 EmitterStore (SQLite on flash)              │
//! │  • Bulk fetch by id set                                    │
//! │  • Transactional upsert                                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! After the write-back, records that had already sat idle for `max_age`
//! passes are evicted, and if the working set still holds more than
//! `max_working_set` records it is cleared outright.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use emitter_cache::{EmitterCache, CacheConfig, MaintenanceTask, EmitterPayload, RfIdentification};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = CacheConfig {
//!         store_url: Some("sqlite://emitters.db?mode=rwc".into()),
//!         ..Default::default()
//!     };
//!     let cache = Arc::new(EmitterCache::open(config).await);
//!     let maintenance = MaintenanceTask::spawn(Arc::clone(&cache));
//!
//!     // One scan cycle
//!     let seen: Vec<RfIdentification> = vec![
//!         "WIFI/aa:bb:cc:dd:ee:ff".parse().unwrap(),
//!         "LTE/262/2/801/26113281".parse().unwrap(),
//!     ];
//!     let _ = cache.preload(&seen).await;
//!     for id in &seen {
//!         let emitter = cache.get(id).await;
//!         emitter.lock().set_payload(EmitterPayload::new(52.52, 13.40, 100.0, 100.0));
//!     }
//!
//!     // Final sync, clear, release the store
//!     maintenance.shutdown().await.expect("final sync failed");
//! }
//! ```
//!
//! ## Modules
//!
//! - [`cache`]: the [`EmitterCache`] manager
//! - [`emitter`]: records and their shared handle
//! - [`identity`]: emitter identities and unique ids
//! - [`storage`]: store traits, SQL and in-memory stores
//! - [`maintenance`]: periodic sync driver
//! - [`resilience`]: retry with backoff

pub mod config;
pub mod identity;
pub mod emitter;
pub mod storage;
pub mod resilience;
pub mod cache;
pub mod maintenance;
pub mod metrics;

pub use config::CacheConfig;
pub use identity::{EmitterType, IdentityParseError, RfIdentification};
pub use emitter::{EmitterPayload, EmitterStatus, RfEmitter, SharedEmitter, StoredEmitter};
pub use cache::{CacheLifecycle, EmitterCache, SyncOutcome, SyncReport};
pub use maintenance::MaintenanceTask;
pub use storage::traits::{BatchWriteResult, EmitterStore, StorageError, StoreTransaction};
pub use storage::memory::InMemoryStore;
pub use storage::sql::SqlStore;
pub use resilience::retry::RetryConfig;
pub use metrics::LatencyTimer;
