// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Periodic maintenance driver.
//!
//! [`MaintenanceTask`] runs [`EmitterCache::sync`] every
//! `sync_interval_ms` on a tokio task and closes the cache when shut down.
//! Single failed passes are logged as warnings; once `failure_escalation_threshold`
//! passes in a row have failed, each further failure is logged as an error
//! since the store is probably not coming back on its own.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::cache::{EmitterCache, SyncOutcome};
use crate::storage::traits::StorageError;

/// Handle to a running maintenance loop.
pub struct MaintenanceTask {
    shutdown: watch::Sender<bool>,
    failures: Arc<AtomicU32>,
    handle: JoinHandle<Result<(), StorageError>>,
}

impl MaintenanceTask {
    /// Spawn the loop on the current tokio runtime.
    pub fn spawn(cache: Arc<EmitterCache>) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let failures = Arc::new(AtomicU32::new(0));
        let handle = tokio::spawn(run(cache, Arc::clone(&failures), shutdown_rx));
        Self {
            shutdown,
            failures,
            handle,
        }
    }

    /// Failed passes since the last successful one.
    #[must_use]
    pub fn consecutive_failures(&self) -> u32 {
        self.failures.load(Ordering::Acquire)
    }

    /// Stop ticking, close the cache (final sync included) and wait for it.
    ///
    /// If the final sync fails the error is returned and the cache stays
    /// open with its unsynced records; call [`EmitterCache::close`] again
    /// once the store recovers.
    pub async fn shutdown(self) -> Result<(), StorageError> {
        let _ = self.shutdown.send(true);
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(StorageError::Backend(format!("maintenance task failed: {}", e))),
        }
    }
}

#[tracing::instrument(skip_all)]
async fn run(
    cache: Arc<EmitterCache>,
    failures: Arc<AtomicU32>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), StorageError> {
    let interval = Duration::from_millis(cache.config().sync_interval_ms.max(1));
    let threshold = cache.config().failure_escalation_threshold.max(1);
    info!(interval_ms = interval.as_millis() as u64, "Emitter cache maintenance started");

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; nothing to sync yet
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match cache.sync().await {
                    Ok(SyncOutcome::Synced(report)) => {
                        failures.store(0, Ordering::Release);
                        crate::metrics::set_consecutive_sync_failures(0);
                        debug!(?report, "Maintenance pass complete");
                    }
                    Ok(SyncOutcome::Skipped) => {
                        debug!("Maintenance pass skipped, no store attached");
                    }
                    Err(e) => {
                        let count = failures.fetch_add(1, Ordering::AcqRel) + 1;
                        crate::metrics::set_consecutive_sync_failures(count);
                        if count >= threshold {
                            error!(error = %e, consecutive_failures = count, "Emitter store keeps failing, changes are piling up in memory");
                        } else {
                            warn!(error = %e, consecutive_failures = count, "Maintenance pass failed, will retry next cycle");
                        }
                    }
                }
            }

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    info!("Emitter cache maintenance stopping");
    cache.close().await
}
