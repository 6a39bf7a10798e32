// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Emitter cache manager.
//!
//! The [`EmitterCache`] mediates every access to emitter records:
//! - [`get`](EmitterCache::get): lookup-or-create, never touches the store
//! - [`preload`](EmitterCache::preload): one bulk fetch per scan cycle
//! - [`sync`](EmitterCache::sync): age, write back dirty records in one
//!   transaction, evict, enforce the size bound
//! - [`close`](EmitterCache::close): final sync, clear, release the store;
//!   stays open if the final sync fails
//!
//! # Lifecycle
//!
//! ```text
//! Open → Closed
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use emitter_cache::{EmitterCache, CacheConfig, InMemoryStore, EmitterPayload, RfIdentification};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = Arc::new(InMemoryStore::new());
//! let cache = EmitterCache::new(CacheConfig::default(), Some(store.clone()));
//!
//! let seen: Vec<RfIdentification> = vec!["WIFI/aa:bb:cc".parse().unwrap()];
//! cache.preload(&seen).await.unwrap();
//!
//! for id in &seen {
//!     let emitter = cache.get(id).await;
//!     emitter.lock().set_payload(EmitterPayload::new(52.5, 13.4, 60.0, 60.0));
//! }
//!
//! let outcome = cache.sync().await.unwrap();
//! assert_eq!(outcome.written(), 1);
//! assert_eq!(store.len(), 1);
//!
//! cache.close().await.unwrap();
//! # }
//! ```

mod types;
mod working_set;
mod api;
mod flush;
mod lifecycle;

pub use types::{CacheLifecycle, SyncOutcome, SyncReport};

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::CacheConfig;
use crate::storage::traits::EmitterStore;
use working_set::WorkingSet;

/// Lifecycle state and the mapping it owns.
pub(crate) enum CacheState {
    Open {
        working_set: WorkingSet,
        /// `None` when no store could be opened: in-memory only
        store: Option<Arc<dyn EmitterStore>>,
    },
    Closed,
}

/// Write-back cache of RF emitter records.
///
/// # Thread Safety
///
/// The cache is `Send + Sync`. One async mutex guards the mapping and the
/// lifecycle state; it is held for a whole lookup, preload insert or sync
/// pass. Records handed out by [`get`](Self::get) are outside that lock.
pub struct EmitterCache {
    pub(super) config: CacheConfig,
    pub(super) state: Mutex<CacheState>,
}

impl EmitterCache {
    /// Create an open cache over `store`. With `None` the cache works purely
    /// in memory: `preload` and `sync` are no-ops.
    pub fn new(config: CacheConfig, store: Option<Arc<dyn EmitterStore>>) -> Self {
        crate::metrics::set_store_available(store.is_some());
        Self {
            config,
            state: Mutex::new(CacheState::Open {
                working_set: WorkingSet::default(),
                store,
            }),
        }
    }

    /// Create a cache without a store.
    pub fn in_memory(config: CacheConfig) -> Self {
        Self::new(config, None)
    }

    /// Open the store named by `config.store_url` and create a cache over it.
    /// If the store can't be opened the cache runs in-memory only.
    pub async fn open(config: CacheConfig) -> Self {
        let store = crate::storage::open_store(&config).await;
        Self::new(config, store)
    }

    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub async fn lifecycle(&self) -> CacheLifecycle {
        match *self.state.lock().await {
            CacheState::Open { .. } => CacheLifecycle::Open,
            CacheState::Closed => CacheLifecycle::Closed,
        }
    }

    pub async fn is_closed(&self) -> bool {
        self.lifecycle().await == CacheLifecycle::Closed
    }

    /// Whether persistence is enabled.
    pub async fn has_store(&self) -> bool {
        matches!(*self.state.lock().await, CacheState::Open { store: Some(_), .. })
    }

    /// Number of resident records.
    pub async fn len(&self) -> usize {
        match &*self.state.lock().await {
            CacheState::Open { working_set, .. } => working_set.len(),
            CacheState::Closed => 0,
        }
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of resident records with unsynced changes.
    pub async fn dirty_len(&self) -> usize {
        match &*self.state.lock().await {
            CacheState::Open { working_set, .. } => working_set.dirty_count(),
            CacheState::Closed => 0,
        }
    }
}
