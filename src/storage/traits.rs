// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use async_trait::async_trait;
use crate::emitter::StoredEmitter;
use crate::identity::RfIdentification;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Store unavailable")]
    Unavailable,
    #[error("Storage backend error: {0}")]
    Backend(String),
    #[error("Corrupt record '{id}': {reason}")]
    Corrupt {
        id: String,
        reason: String,
    },
}

/// Result of a batch write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchWriteResult {
    /// Number of records upserted inside the committed transaction
    pub written: usize,
}

/// A write transaction on an [`EmitterStore`].
///
/// Upserts become visible atomically on [`commit`](Self::commit). Dropping
/// the transaction without committing discards them.
#[async_trait]
pub trait StoreTransaction: Send {
    async fn upsert(&mut self, emitter: &StoredEmitter) -> Result<(), StorageError>;
    async fn commit(self: Box<Self>) -> Result<(), StorageError>;
}

#[async_trait]
pub trait EmitterStore: Send + Sync {
    /// Bulk point lookup. Ids with no stored record are absent from the result.
    async fn fetch_emitters(&self, ids: &[RfIdentification]) -> Result<Vec<StoredEmitter>, StorageError>;

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StorageError>;

    /// Release the store. Idempotent.
    async fn close(&self);

    /// Upsert all records in one transaction. Nothing is committed if any
    /// upsert fails.
    async fn write_batch(&self, emitters: &[StoredEmitter]) -> Result<BatchWriteResult, StorageError> {
        let mut tx = self.begin().await?;
        for emitter in emitters {
            tx.upsert(emitter).await?;
        }
        tx.commit().await?;
        Ok(BatchWriteResult {
            written: emitters.len(),
        })
    }
}
