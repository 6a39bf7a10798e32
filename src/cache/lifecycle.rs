// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Shutdown of the cache.

use tracing::{debug, error, info};

use crate::storage::traits::StorageError;

use super::flush::sync_pass;
use super::{CacheState, EmitterCache};

impl EmitterCache {
    /// Sync once, drop every resident record, release the store and move to
    /// `Closed` for good.
    ///
    /// Takes the same lock as [`sync`](Self::sync), so it never interleaves
    /// with a maintenance pass. Closing twice is a no-op.
    ///
    /// If the final sync fails the error is returned and nothing else
    /// happens: the cache stays `Open` with its store attached and its
    /// records resident and dirty, so `close` (or `sync`) can be retried.
    #[tracing::instrument(skip(self))]
    pub async fn close(&self) -> Result<(), StorageError> {
        let mut state = self.state.lock().await;
        let CacheState::Open { working_set, store } = &mut *state else {
            debug!("close() on closed cache");
            return Ok(());
        };

        if let Some(active) = store.as_ref() {
            if let Err(e) = sync_pass(working_set, active.as_ref(), &self.config).await {
                error!(
                    error = %e,
                    dirty = working_set.dirty_count(),
                    "Final sync failed, cache left open with unsynced emitters"
                );
                crate::metrics::record_operation("close", "error");
                return Err(e);
            }
            active.close().await;
        }

        let dropped = working_set.clear();
        *state = CacheState::Closed;

        crate::metrics::set_working_set_size(0);
        crate::metrics::set_store_available(false);
        crate::metrics::record_operation("close", "success");
        info!(dropped, "Emitter cache closed");
        Ok(())
    }
}
