// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Lookup operations: get-or-create, bulk preload and inspection.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::emitter::{RfEmitter, SharedEmitter};
use crate::identity::RfIdentification;
use crate::resilience::retry::{retry, RetryConfig};
use crate::storage::traits::StorageError;

use super::{CacheState, EmitterCache};

impl EmitterCache {
    /// Get the resident record for `id`, creating a default one on a miss.
    ///
    /// A hit resets the record's age. A miss does NOT consult the store:
    /// call [`preload`](Self::preload) with the scan cycle's ids first so
    /// the store is read once per cycle instead of once per emitter.
    ///
    /// After [`close`](Self::close) this returns a transient record that is
    /// never inserted and never persisted.
    pub async fn get(&self, id: &RfIdentification) -> SharedEmitter {
        let mut state = self.state.lock().await;
        match &mut *state {
            CacheState::Open { working_set, .. } => {
                let (emitter, created) = working_set.get_or_create(id);
                if created {
                    crate::metrics::record_operation("get", "miss");
                } else {
                    crate::metrics::record_operation("get", "hit");
                }
                emitter
            }
            CacheState::Closed => {
                debug!(id = %id, "get() on closed cache, returning transient emitter");
                crate::metrics::record_operation("get", "closed");
                RfEmitter::new(id.clone()).into_shared()
            }
        }
    }

    /// Load the stored records for every id in `ids` that is not resident,
    /// in one store round trip. Returns how many records were inserted.
    ///
    /// A no-op when the cache is closed, has no store, the store reports
    /// itself unavailable, or every id is already resident. Backend and
    /// decode failures are returned. A record that becomes resident while the fetch is
    /// in flight wins over the fetched copy.
    #[tracing::instrument(skip(self, ids), fields(requested = ids.len()))]
    pub async fn preload(&self, ids: &[RfIdentification]) -> Result<usize, StorageError> {
        let (store, missing) = {
            let state = self.state.lock().await;
            let CacheState::Open { working_set, store: Some(store) } = &*state else {
                return Ok(0);
            };
            (Arc::clone(store), working_set.missing(ids))
        };

        debug!(missing = missing.len(), "Fetching ids not in working set");
        if missing.is_empty() {
            return Ok(0);
        }

        let _timer = crate::metrics::LatencyTimer::new("preload");
        let store_ref = store.as_ref();
        let to_fetch = missing.as_slice();
        let fetched = match retry("preload_fetch", &RetryConfig::fetch(), || store_ref.fetch_emitters(to_fetch)).await {
            Ok(fetched) => fetched,
            Err(StorageError::Unavailable) => {
                debug!(missing = missing.len(), "Store unavailable, preload skipped");
                crate::metrics::record_operation("preload", "skipped");
                return Ok(0);
            }
            Err(e) => {
                warn!(error = %e, missing = missing.len(), "Preload fetch failed, ids will start as unknown");
                crate::metrics::record_store_error("fetch");
                return Err(e);
            }
        };

        let mut state = self.state.lock().await;
        let CacheState::Open { working_set, .. } = &mut *state else {
            debug!(fetched = fetched.len(), "Cache closed during preload, discarding fetched emitters");
            return Ok(0);
        };

        let found = fetched.len();
        let mut inserted = 0;
        for stored in fetched {
            if working_set.insert_if_absent(RfEmitter::from_stored(stored)) {
                inserted += 1;
            }
        }

        if inserted < found {
            debug!(lost_race = found - inserted, "Fetched emitters already resident, kept in-memory copies");
        }
        debug!(found, inserted, "Preload complete");
        crate::metrics::record_preloaded(inserted);
        crate::metrics::set_working_set_size(working_set.len());
        Ok(inserted)
    }

    /// Whether `id` is resident. Does not touch its age.
    pub async fn contains(&self, id: &RfIdentification) -> bool {
        self.peek(id).await.is_some()
    }

    /// The resident record for `id` without resetting its age or creating it.
    pub async fn peek(&self, id: &RfIdentification) -> Option<SharedEmitter> {
        match &*self.state.lock().await {
            CacheState::Open { working_set, .. } => working_set.get(&id.unique_id()).cloned(),
            CacheState::Closed => None,
        }
    }
}
