// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! The identity → record mapping.
//!
//! Only reachable through the cache lock, so every structural change is
//! serialized by construction.

use std::collections::{HashMap, HashSet};
use crate::emitter::{RfEmitter, SharedEmitter, StoredEmitter};
use crate::identity::RfIdentification;

#[derive(Default)]
pub(crate) struct WorkingSet {
    emitters: HashMap<String, SharedEmitter>,
}

/// Dirty records captured for one write-back transaction.
pub(crate) struct DirtyBatch {
    pub(crate) handles: Vec<(SharedEmitter, u64)>,
    pub(crate) records: Vec<StoredEmitter>,
}

impl WorkingSet {
    pub(crate) fn len(&self) -> usize {
        self.emitters.len()
    }

    pub(crate) fn get(&self, key: &str) -> Option<&SharedEmitter> {
        self.emitters.get(key)
    }

    /// Resident record with its age reset, or a fresh default one. The bool
    /// is true when the record was created.
    pub(crate) fn get_or_create(&mut self, id: &RfIdentification) -> (SharedEmitter, bool) {
        let key = id.unique_id();
        if let Some(emitter) = self.emitters.get(&key) {
            emitter.lock().reset_age();
            return (SharedEmitter::clone(emitter), false);
        }
        let emitter = RfEmitter::new(id.clone()).into_shared();
        let previous = self.emitters.insert(key, SharedEmitter::clone(&emitter));
        debug_assert!(previous.is_none(), "duplicate identity in working set");
        (emitter, true)
    }

    /// Insert unless the identity is already resident. A resident record is
    /// always at least as fresh as one read from the store.
    pub(crate) fn insert_if_absent(&mut self, emitter: RfEmitter) -> bool {
        let key = emitter.unique_id();
        if self.emitters.contains_key(&key) {
            return false;
        }
        self.emitters.insert(key, emitter.into_shared());
        true
    }

    /// Distinct ids from `ids` that are not resident, in first-seen order.
    pub(crate) fn missing(&self, ids: &[RfIdentification]) -> Vec<RfIdentification> {
        let mut seen = HashSet::with_capacity(ids.len());
        ids.iter()
            .filter(|id| {
                let key = id.unique_id();
                !self.emitters.contains_key(&key) && seen.insert(key)
            })
            .cloned()
            .collect()
    }

    /// Age every record by one cycle. Returns the keys of records that had
    /// already reached `max_age` before this pass; those are aged too.
    pub(crate) fn age_all(&mut self, max_age: u32) -> Vec<String> {
        self.emitters
            .iter()
            .filter_map(|(key, emitter)| {
                let mut emitter = emitter.lock();
                let expired = emitter.age() >= max_age;
                emitter.increment_age();
                expired.then(|| key.clone())
            })
            .collect()
    }

    pub(crate) fn dirty_batch(&self) -> DirtyBatch {
        let mut handles = Vec::new();
        let mut records = Vec::new();
        for emitter in self.emitters.values() {
            if let Some((revision, record)) = emitter.lock().snapshot() {
                handles.push((SharedEmitter::clone(emitter), revision));
                records.push(record);
            }
        }
        DirtyBatch { handles, records }
    }

    pub(crate) fn dirty_count(&self) -> usize {
        self.emitters.values().filter(|e| e.lock().is_dirty()).count()
    }

    /// Remove a clean record. Dirty records stay resident so a later pass
    /// can write them.
    pub(crate) fn evict_clean(&mut self, key: &str) -> bool {
        let is_clean = self
            .emitters
            .get(key)
            .is_some_and(|emitter| !emitter.lock().is_dirty());
        if is_clean {
            self.emitters.remove(key);
        }
        is_clean
    }

    /// Drop every record, returning how many were resident.
    pub(crate) fn clear(&mut self) -> usize {
        let dropped = self.emitters.len();
        self.emitters.clear();
        dropped
    }
}
