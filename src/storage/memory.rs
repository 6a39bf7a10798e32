// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use async_trait::async_trait;
use dashmap::DashMap;
use crate::emitter::StoredEmitter;
use crate::identity::RfIdentification;
use super::traits::{EmitterStore, StorageError, StoreTransaction};

/// Volatile [`EmitterStore`] backed by a `DashMap`.
///
/// Transactions stage their upserts and apply them on commit, so readers
/// never observe a partial batch.
pub struct InMemoryStore {
    data: Arc<DashMap<String, StoredEmitter>>,
    closed: Arc<AtomicBool>,
    commits: Arc<AtomicU64>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Arc::new(DashMap::new()),
            closed: Arc::new(AtomicBool::new(false)),
            commits: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Seed a record directly, bypassing transactions.
    pub fn insert(&self, emitter: StoredEmitter) {
        self.data.insert(emitter.id.unique_id(), emitter);
    }

    #[must_use]
    pub fn get(&self, id: &RfIdentification) -> Option<StoredEmitter> {
        self.data.get(&id.unique_id()).map(|r| r.value().clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of committed transactions
    #[must_use]
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<(), StorageError> {
        if self.is_closed() {
            Err(StorageError::Unavailable)
        } else {
            Ok(())
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

struct MemoryTransaction {
    data: Arc<DashMap<String, StoredEmitter>>,
    commits: Arc<AtomicU64>,
    staged: Vec<StoredEmitter>,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn upsert(&mut self, emitter: &StoredEmitter) -> Result<(), StorageError> {
        self.staged.push(emitter.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StorageError> {
        let Self { data, commits, staged } = *self;
        for emitter in staged {
            data.insert(emitter.id.unique_id(), emitter);
        }
        commits.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}

#[async_trait]
impl EmitterStore for InMemoryStore {
    async fn fetch_emitters(&self, ids: &[RfIdentification]) -> Result<Vec<StoredEmitter>, StorageError> {
        self.ensure_open()?;
        Ok(ids
            .iter()
            .filter_map(|id| self.data.get(&id.unique_id()).map(|r| r.value().clone()))
            .collect())
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StorageError> {
        self.ensure_open()?;
        Ok(Box::new(MemoryTransaction {
            data: Arc::clone(&self.data),
            commits: Arc::clone(&self.commits),
            staged: Vec::new(),
        }))
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}
