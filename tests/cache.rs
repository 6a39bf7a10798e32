// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! End-to-end tests for the emitter cache.
//!
//! Most tests run against [`InMemoryStore`]; the SQLite ones use a database
//! file in the temp directory that is removed afterwards.
//!
//! Run with: `cargo test --test cache`

use std::path::PathBuf;
use std::sync::Arc;

use emitter_cache::{
    CacheConfig, EmitterCache, EmitterPayload, EmitterStatus, EmitterType, InMemoryStore,
    MaintenanceTask, RfIdentification, SqlStore, StoredEmitter, SyncOutcome,
};

fn id(s: &str) -> RfIdentification {
    s.parse().expect("valid identity")
}

fn payload(lat: f64, lon: f64) -> EmitterPayload {
    EmitterPayload::new(lat, lon, 120.0, 80.0)
}

fn memory_cache(config: CacheConfig) -> (Arc<EmitterCache>, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let cache = Arc::new(EmitterCache::new(config, Some(store.clone())));
    (cache, store)
}

fn temp_db_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "emitter_cache_it_{}_{}_{}.db",
        name,
        std::process::id(),
        uuid::Uuid::new_v4().simple()
    ))
}

fn cleanup_db(path: &PathBuf) {
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
    }
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn wifi_record_ages_until_accessed() {
    let (cache, _store) = memory_cache(CacheConfig::default());
    let wifi = id("WIFI/aa:bb:cc");

    let first = cache.get(&wifi).await;
    assert_eq!(first.lock().age(), 0);
    assert_eq!(first.lock().status(), EmitterStatus::Unknown);

    for _ in 0..5 {
        cache.sync().await.unwrap();
    }
    let peeked = cache.peek(&wifi).await.expect("still resident");
    assert!(Arc::ptr_eq(&first, &peeked));
    assert_eq!(peeked.lock().age(), 5);

    let again = cache.get(&wifi).await;
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(again.lock().age(), 0);
}

#[tokio::test]
async fn preload_loads_stored_gsm_cell_only() {
    let (cache, store) = memory_cache(CacheConfig::default());
    let stored_cell = id("GSM/1/2/3/4");
    let unknown_cell = id("GSM/1/2/3/5");
    store.insert(StoredEmitter::new(stored_cell.clone(), payload(48.1, 11.5)));

    let loaded = cache.preload(&[stored_cell.clone(), unknown_cell.clone()]).await.unwrap();
    assert_eq!(loaded, 1);

    let resident = cache.peek(&stored_cell).await.expect("preloaded");
    assert_eq!(resident.lock().payload(), Some(&payload(48.1, 11.5)));
    assert!(!cache.contains(&unknown_cell).await);

    let created = cache.get(&unknown_cell).await;
    assert!(created.lock().payload().is_none());
    assert_eq!(created.lock().status(), EmitterStatus::Unknown);
    assert_eq!(cache.len().await, 2);
}

// =============================================================================
// Properties
// =============================================================================

#[tokio::test]
async fn one_record_per_identity_under_concurrency() {
    let (cache, _store) = memory_cache(CacheConfig::default());
    let cell = RfIdentification::cell(EmitterType::Lte, &[262, 2, 801, 26_113_281]);

    let mut handles = Vec::new();
    for _ in 0..16 {
        let cache = Arc::clone(&cache);
        let cell = cell.clone();
        handles.push(tokio::spawn(async move { cache.get(&cell).await }));
    }
    let mut records = Vec::new();
    for handle in handles {
        records.push(handle.await.unwrap());
    }

    assert_eq!(cache.len().await, 1);
    assert!(records.iter().all(|r| Arc::ptr_eq(r, &records[0])));
}

#[tokio::test]
async fn preload_leaves_other_residents_alone() {
    let (cache, store) = memory_cache(CacheConfig::default());
    let bystander = id("WIFI/00:11:22");
    let record = cache.get(&bystander).await;
    record.lock().set_payload(payload(1.0, 1.0));
    store.insert(StoredEmitter::new(bystander.clone(), payload(9.0, 9.0)));
    store.insert(StoredEmitter::new(id("WIFI/33:44:55"), payload(2.0, 2.0)));

    cache.preload(&[id("WIFI/33:44:55")]).await.unwrap();

    assert_eq!(record.lock().payload(), Some(&payload(1.0, 1.0)));
    assert!(record.lock().is_dirty());
    assert_eq!(cache.len().await, 2);
}

#[tokio::test]
async fn access_before_threshold_extends_life() {
    let config = CacheConfig { max_age: 4, ..Default::default() };
    let (cache, _store) = memory_cache(config);
    let wifi = id("WIFI/de:ad:be:ef");
    let record = cache.get(&wifi).await;

    // Accessed after cycle 2, so it survives past cycle 2 + 4
    cache.sync().await.unwrap();
    cache.sync().await.unwrap();
    cache.get(&wifi).await;
    for _ in 0..4 {
        cache.sync().await.unwrap();
        assert!(cache.contains(&wifi).await);
    }
    assert_eq!(record.lock().age(), 4);

    cache.sync().await.unwrap();
    assert!(!cache.contains(&wifi).await);
}

#[tokio::test]
async fn default_threshold_keeps_record_past_thirty_idle_passes() {
    let (cache, _store) = memory_cache(CacheConfig::default());
    let cell = id("GSM/262/1/4711/12");
    cache.get(&cell).await;
    cache.sync().await.unwrap();
    cache.sync().await.unwrap();
    cache.get(&cell).await;

    for pass in 1..=30 {
        cache.sync().await.unwrap();
        assert!(cache.contains(&cell).await, "evicted after {} idle passes", pass);
    }

    let outcome = cache.sync().await.unwrap();
    assert_eq!(outcome.report().unwrap().evicted, 1);
    assert!(!cache.contains(&cell).await);
}

#[tokio::test]
async fn evicted_record_comes_back_through_preload() {
    let config = CacheConfig { max_age: 1, ..Default::default() };
    let (cache, _store) = memory_cache(config);
    let wifi = id("WIFI/aa:aa:aa");
    cache.get(&wifi).await.lock().set_payload(payload(3.0, 4.0));

    assert_eq!(cache.sync().await.unwrap().written(), 1);
    let report = cache.sync().await.unwrap();
    assert_eq!(report.report().unwrap().evicted, 1);
    assert!(cache.is_empty().await);

    assert_eq!(cache.preload(&[wifi.clone()]).await.unwrap(), 1);
    let record = cache.get(&wifi).await;
    assert_eq!(record.lock().payload(), Some(&payload(3.0, 4.0)));
    assert_eq!(record.lock().status(), EmitterStatus::Cached);
}

#[tokio::test]
async fn overflow_clears_after_flushing_everything() {
    let (cache, store) = memory_cache(CacheConfig::default());
    for i in 0..501u64 {
        let record = cache.get(&RfIdentification::cell(EmitterType::Gsm, &[262, 1, 100, i])).await;
        record.lock().set_payload(payload(50.0, 8.0));
    }

    let outcome = cache.sync().await.unwrap();

    let report = outcome.report().unwrap();
    assert!(report.cleared);
    assert_eq!(report.written, 501);
    assert!(cache.is_empty().await);
    assert_eq!(store.len(), 501);
}

#[tokio::test]
async fn note_update_is_written_back() {
    let (cache, store) = memory_cache(CacheConfig::default());
    let wifi = id("WIFI/12:34:56");
    store.insert(StoredEmitter::new(wifi.clone(), payload(5.0, 6.0)));
    cache.preload(&[wifi.clone()]).await.unwrap();

    assert!(cache.get(&wifi).await.lock().set_note("moved indoors"));
    assert_eq!(cache.sync().await.unwrap().written(), 1);

    let persisted = store.get(&wifi).unwrap();
    assert_eq!(persisted.payload.note.as_deref(), Some("moved indoors"));
}

#[tokio::test]
async fn in_memory_cache_never_persists() {
    let cache = EmitterCache::in_memory(CacheConfig::default());
    cache.get(&id("BT/aa:bb")).await.lock().set_payload(payload(1.0, 2.0));

    assert_eq!(cache.sync().await.unwrap(), SyncOutcome::Skipped);
    assert_eq!(cache.dirty_len().await, 1);
    cache.close().await.unwrap();
}

// =============================================================================
// SQLite
// =============================================================================

#[tokio::test]
async fn sqlite_round_trip_across_sessions() {
    let path = temp_db_path("sessions");
    let config = CacheConfig {
        store_url: Some(format!("sqlite://{}?mode=rwc", path.display())),
        ..Default::default()
    };
    let cell = id("LTE/262/2/801/26113281");

    {
        let cache = EmitterCache::open(config.clone()).await;
        assert!(cache.has_store().await);
        cache.get(&cell).await.lock().set_payload(payload(52.52, 13.40));
        cache.close().await.unwrap();
    }

    let cache = EmitterCache::open(config).await;
    assert_eq!(cache.preload(&[cell.clone()]).await.unwrap(), 1);
    let record = cache.get(&cell).await;
    assert_eq!(record.lock().payload(), Some(&payload(52.52, 13.40)));
    cache.close().await.unwrap();

    cleanup_db(&path);
}

#[tokio::test]
async fn sqlite_store_counts_written_rows() {
    let path = temp_db_path("count");
    let store = Arc::new(SqlStore::open_path(&path).await.unwrap());
    let cache = EmitterCache::new(CacheConfig::default(), Some(store.clone()));

    for i in 0..20u64 {
        let cell = RfIdentification::cell(EmitterType::Wcdma, &[262, 3, i]);
        cache.get(&cell).await.lock().set_payload(payload(0.5, 0.5));
    }
    assert_eq!(cache.sync().await.unwrap().written(), 20);
    assert_eq!(store.count_all().await.unwrap(), 20);

    cache.close().await.unwrap();
    cleanup_db(&path);
}

#[tokio::test]
async fn unreachable_store_falls_back_to_memory() {
    let config = CacheConfig {
        store_url: Some("sqlite:///nonexistent-dir/for/sure/emitters.db?mode=ro".into()),
        ..Default::default()
    };

    let cache = EmitterCache::open(config).await;

    assert!(!cache.has_store().await);
    cache.get(&id("WIFI/aa")).await;
    assert_eq!(cache.sync().await.unwrap(), SyncOutcome::Skipped);
}

#[tokio::test]
async fn maintenance_task_shutdown_persists() {
    let (cache, store) = memory_cache(CacheConfig {
        sync_interval_ms: 3_600_000,
        ..Default::default()
    });
    let task = MaintenanceTask::spawn(Arc::clone(&cache));

    cache.get(&id("NR/262/1/99/7")).await.lock().set_payload(payload(1.0, 1.0));
    task.shutdown().await.unwrap();

    assert_eq!(store.len(), 1);
    assert!(cache.is_closed().await);
}
