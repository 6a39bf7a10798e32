// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Durable stores for emitter records.
//!
//! The cache only talks to [`traits::EmitterStore`]. Two implementations ship
//! with the crate: [`sql::SqlStore`] (SQLite on flash) and
//! [`memory::InMemoryStore`] (volatile, for tests and hosts without storage).

pub mod traits;
pub mod memory;
pub mod sql;

use std::sync::Arc;
use tracing::{info, warn};
use crate::config::CacheConfig;
use traits::EmitterStore;

/// Open the store named by `config.store_url`.
///
/// Returns `None` when no store is configured or it cannot be opened; the
/// cache then runs in-memory only with persistence disabled.
pub async fn open_store(config: &CacheConfig) -> Option<Arc<dyn EmitterStore>> {
    let Some(ref url) = config.store_url else {
        info!("No store URL configured, emitter cache runs in-memory only");
        return None;
    };

    match sql::SqlStore::new(url).await {
        Ok(store) => {
            info!(url = %url, "Emitter store opened");
            crate::metrics::set_store_available(true);
            Some(Arc::new(store))
        }
        Err(e) => {
            warn!(url = %url, error = %e, "Failed to open emitter store, persistence disabled");
            crate::metrics::set_store_available(false);
            crate::metrics::record_store_error("open");
            None
        }
    }
}
