// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Maintenance pass: aging, batched write-back, eviction and the size bound.

use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::storage::traits::{EmitterStore, StorageError};

use super::working_set::WorkingSet;
use super::{CacheState, EmitterCache, SyncOutcome, SyncReport};

impl EmitterCache {
    /// Run one maintenance pass.
    ///
    /// Ages every resident record, writes all dirty records back in a single
    /// store transaction, then evicts records that had already been idle for
    /// `max_age` passes when this one started, and clears the working set if
    /// it still exceeds `max_working_set`.
    ///
    /// Holds the cache lock for the whole pass, including store I/O; never
    /// call it from a latency-sensitive path. Skipped when the cache is
    /// closed, has no store, or the store reports itself unavailable; in the
    /// last case records have aged but nothing is written or evicted.
    ///
    /// If the transaction fails nothing is evicted or cleared, dirty records
    /// stay dirty for the next pass, and the error is returned.
    #[tracing::instrument(skip(self))]
    pub async fn sync(&self) -> Result<SyncOutcome, StorageError> {
        let mut state = self.state.lock().await;
        let CacheState::Open { working_set, store: Some(store) } = &mut *state else {
            crate::metrics::record_operation("sync", "skipped");
            return Ok(SyncOutcome::Skipped);
        };

        let _timer = crate::metrics::LatencyTimer::new("sync");
        match sync_pass(working_set, store.as_ref(), &self.config).await {
            Ok(report) => {
                crate::metrics::record_operation("sync", "success");
                Ok(SyncOutcome::Synced(report))
            }
            Err(StorageError::Unavailable) => {
                debug!(dirty = working_set.dirty_count(), "Store unavailable, write-back skipped");
                crate::metrics::record_operation("sync", "skipped");
                Ok(SyncOutcome::Skipped)
            }
            Err(e) => Err(e),
        }
    }
}

/// One pass over a locked working set. Shared by [`EmitterCache::sync`] and
/// close.
pub(super) async fn sync_pass(
    working_set: &mut WorkingSet,
    store: &dyn EmitterStore,
    config: &CacheConfig,
) -> Result<SyncReport, StorageError> {
    let resident = working_set.len();

    // Marks records already at max_age, then ages every record
    let aged = working_set.age_all(config.max_age);

    let batch = working_set.dirty_batch();
    let mut written = 0;
    if !batch.records.is_empty() {
        debug!(dirty = batch.records.len(), "Writing dirty emitters to store");
        match store.write_batch(&batch.records).await {
            Ok(result) => {
                written = result.written;
                for (emitter, revision) in &batch.handles {
                    emitter.lock().mark_synced(*revision);
                }
                crate::metrics::record_records_written(written);
            }
            Err(e) => {
                warn!(
                    error = %e,
                    dirty = batch.records.len(),
                    aged_out = aged.len(),
                    "Write-back transaction failed, emitters stay dirty and resident"
                );
                crate::metrics::record_store_error("sync");
                crate::metrics::record_operation("sync", "error");
                return Err(e);
            }
        }
    }

    // Strictly after the transaction, so nothing leaves unpersisted
    let mut evicted = 0;
    for key in &aged {
        if working_set.evict_clean(key) {
            debug!(id = %key, "Aged out, removed from cache");
            evicted += 1;
        } else {
            debug!(id = %key, "Aged out but modified during write-back, kept");
        }
    }
    if evicted > 0 {
        crate::metrics::record_eviction(evicted);
    }

    let cleared = working_set.len() > config.max_working_set;
    if cleared {
        let dropped = working_set.clear();
        warn!(
            dropped,
            max_working_set = config.max_working_set,
            "Working set exceeded its bound, cleared"
        );
        crate::metrics::record_safety_clear(dropped);
    }

    let report = SyncReport {
        resident,
        aged_out: aged.len(),
        written,
        evicted,
        cleared,
        remaining: working_set.len(),
    };
    crate::metrics::set_working_set_size(report.remaining);
    debug!(?report, "Sync pass complete");
    Ok(report)
}
