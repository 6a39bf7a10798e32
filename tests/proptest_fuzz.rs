// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Property-based tests for the emitter cache.
//!
//! Random sequences of lookups, updates, preloads and syncs are replayed
//! against a cache over an [`InMemoryStore`], checking after every step that
//! no update is lost and the working set stays within its bounds. Identity
//! parsing is fuzzed with arbitrary strings.
//!
//! Run with: `cargo test --test proptest_fuzz`

use std::collections::HashMap;
use std::sync::Arc;

use proptest::prelude::*;

use emitter_cache::{
    CacheConfig, EmitterCache, EmitterPayload, EmitterType, InMemoryStore, RfIdentification,
};

const MAX_AGE: u32 = 3;
const MAX_WORKING_SET: usize = 6;

#[derive(Debug, Clone)]
enum Op {
    Get(u8),
    Set(u8, i32),
    Preload(Vec<u8>),
    Sync,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u8..12).prop_map(Op::Get),
        3 => (0u8..12, -90i32..90).prop_map(|(n, lat)| Op::Set(n, lat)),
        1 => prop::collection::vec(0u8..12, 0..6).prop_map(Op::Preload),
        2 => Just(Op::Sync),
    ]
}

fn cell(n: u8) -> RfIdentification {
    RfIdentification::cell(EmitterType::Gsm, &[262, 1, 4711, u64::from(n)])
}

fn payload(lat: i32) -> EmitterPayload {
    EmitterPayload::new(f64::from(lat), 0.0, 100.0, 100.0)
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Every update reaches the store by the end of the next successful sync,
    /// and after a sync nothing dirty or past its eviction pass stays resident.
    #[test]
    fn sync_never_loses_updates(ops in prop::collection::vec(op_strategy(), 1..80)) {
        let rt = runtime();
        rt.block_on(async {
            let store = Arc::new(InMemoryStore::new());
            let config = CacheConfig {
                max_age: MAX_AGE,
                max_working_set: MAX_WORKING_SET,
                ..Default::default()
            };
            let cache = EmitterCache::new(config, Some(store.clone()));
            let mut last_written: HashMap<u8, i32> = HashMap::new();

            for op in ops {
                match op {
                    Op::Get(n) => {
                        let record = cache.get(&cell(n)).await;
                        prop_assert_eq!(record.lock().age(), 0);
                        let again = cache.get(&cell(n)).await;
                        prop_assert!(Arc::ptr_eq(&record, &again));
                    }
                    Op::Set(n, lat) => {
                        cache.get(&cell(n)).await.lock().set_payload(payload(lat));
                        last_written.insert(n, lat);
                    }
                    Op::Preload(ns) => {
                        let before: HashMap<u8, Option<EmitterPayload>> = {
                            let mut map = HashMap::new();
                            for n in 0u8..12 {
                                if let Some(r) = cache.peek(&cell(n)).await {
                                    map.insert(n, r.lock().payload().cloned());
                                }
                            }
                            map
                        };
                        let ids: Vec<_> = ns.iter().map(|n| cell(*n)).collect();
                        cache.preload(&ids).await.unwrap();
                        // Residents are never overwritten by stored copies
                        for (n, payload) in before {
                            let current = cache.peek(&cell(n)).await;
                            prop_assert!(current.is_some());
                            prop_assert_eq!(current.unwrap().lock().payload().cloned(), payload);
                        }
                    }
                    Op::Sync => {
                        cache.sync().await.unwrap();
                        prop_assert_eq!(cache.dirty_len().await, 0);
                        prop_assert!(cache.len().await <= MAX_WORKING_SET);
                        for n in 0u8..12 {
                            if let Some(r) = cache.peek(&cell(n)).await {
                                prop_assert!(r.lock().age() <= MAX_AGE);
                            }
                        }
                        for (n, lat) in &last_written {
                            let stored = store.get(&cell(*n));
                            prop_assert_eq!(stored.map(|s| s.payload), Some(payload(*lat)));
                        }
                        // Idempotent
                        prop_assert_eq!(cache.sync().await.unwrap().written(), 0);
                    }
                }
            }
            Ok(())
        })?;
    }

    /// Parsing arbitrary text never panics.
    #[test]
    fn fuzz_identity_parse(s in ".*") {
        let _ = s.parse::<RfIdentification>();
    }

    /// Well-formed ids parse back to the same unique id.
    #[test]
    fn identity_unique_id_is_stable(
        kind in prop_oneof![Just("GSM"), Just("LTE"), Just("NR"), Just("WCDMA")],
        parts in prop::collection::vec(0u64..100_000, 1..5),
    ) {
        let text = format!(
            "{}/{}",
            kind,
            parts.iter().map(u64::to_string).collect::<Vec<_>>().join("/")
        );
        let id: RfIdentification = text.parse().unwrap();
        prop_assert_eq!(id.unique_id(), text);
    }

    /// Hardware addresses are case-insensitive.
    #[test]
    fn wifi_addresses_fold_case(mac in "[0-9a-fA-F]{2}(:[0-9a-fA-F]{2}){5}") {
        let upper: RfIdentification = format!("WIFI/{}", mac.to_uppercase()).parse().unwrap();
        let lower: RfIdentification = format!("WIFI/{}", mac.to_lowercase()).parse().unwrap();
        prop_assert_eq!(upper, lower);
    }
}
