// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! SQL storage backend for emitter records.
//!
//! One row per emitter, keyed by its unique id:
//! ```sql
//! CREATE TABLE emitters (
//!   id TEXT PRIMARY KEY,          -- "<TYPE>/<rf_id>"
//!   emitter_type TEXT NOT NULL,   -- "WIFI", "GSM", ...
//!   payload TEXT NOT NULL,        -- EmitterPayload as JSON
//!   updated_at INTEGER NOT NULL   -- epoch millis
//! )
//! ```
//!
//! The database normally lives on flash, so the cache batches all writes of a
//! maintenance pass into one transaction and this store never writes outside
//! one.

use async_trait::async_trait;
use sqlx::{Any, AnyPool, Row, Transaction, any::AnyPoolOptions};
use std::sync::Once;
use std::time::Duration;
use tracing::debug;
use crate::emitter::{EmitterPayload, StoredEmitter};
use crate::identity::RfIdentification;
use crate::resilience::retry::{retry, RetryConfig};
use super::traits::{EmitterStore, StorageError, StoreTransaction};

// SQLx `Any` driver requires runtime installation
static INSTALL_DRIVERS: Once = Once::new();

fn install_drivers() {
    INSTALL_DRIVERS.call_once(|| {
        sqlx::any::install_default_drivers();
    });
}

/// Bound parameters per `IN (...)` query
const FETCH_CHUNK_SIZE: usize = 500;

const UPSERT_SQL: &str = "INSERT INTO emitters (id, emitter_type, payload, updated_at) VALUES (?, ?, ?, ?) \
     ON CONFLICT(id) DO UPDATE SET \
        emitter_type = excluded.emitter_type, \
        payload = excluded.payload, \
        updated_at = excluded.updated_at";

fn backend(e: sqlx::Error) -> StorageError {
    StorageError::Backend(e.to_string())
}

pub struct SqlStore {
    pool: AnyPool,
}

impl SqlStore {
    /// Connect with open-mode retry, enable WAL journaling and create the
    /// schema if needed.
    pub async fn new(connection_string: &str) -> Result<Self, StorageError> {
        install_drivers();

        let pool = retry("sql_connect", &RetryConfig::open(), || async {
            AnyPoolOptions::new()
                .max_connections(4)
                .acquire_timeout(Duration::from_secs(10))
                .connect(connection_string)
                .await
                .map_err(backend)
        })
        .await?;

        let store = Self { pool };
        store.enable_wal_mode().await?;
        store.init_schema().await?;
        Ok(store)
    }

    /// Open (creating if needed) a SQLite database file.
    pub async fn open_path(path: impl AsRef<std::path::Path>) -> Result<Self, StorageError> {
        let url = format!("sqlite://{}?mode=rwc", path.as_ref().display());
        Self::new(&url).await
    }

    /// Readers don't block the maintenance writer, and a commit costs one
    /// fsync instead of two.
    async fn enable_wal_mode(&self) -> Result<(), StorageError> {
        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to enable WAL mode: {}", e)))?;

        sqlx::query("PRAGMA synchronous = NORMAL")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to set synchronous mode: {}", e)))?;

        Ok(())
    }

    async fn init_schema(&self) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS emitters (
                id TEXT PRIMARY KEY,
                emitter_type TEXT NOT NULL,
                payload TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_emitters_type ON emitters (emitter_type)")
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        Ok(())
    }

    pub async fn count_all(&self) -> Result<u64, StorageError> {
        self.ensure_open()?;
        let row = sqlx::query("SELECT COUNT(*) as cnt FROM emitters")
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;
        let count: i64 = row.try_get("cnt").map_err(backend)?;
        u64::try_from(count).map_err(|_| StorageError::Backend(format!("negative row count {}", count)))
    }

    fn ensure_open(&self) -> Result<(), StorageError> {
        if self.pool.is_closed() {
            Err(StorageError::Unavailable)
        } else {
            Ok(())
        }
    }

    async fn fetch_chunk(&self, chunk: &[RfIdentification]) -> Result<Vec<StoredEmitter>, StorageError> {
        let placeholders = vec!["?"; chunk.len()].join(", ");
        let sql = format!("SELECT id, payload, updated_at FROM emitters WHERE id IN ({})", placeholders);

        let mut query = sqlx::query(&sql);
        for id in chunk {
            query = query.bind(id.unique_id());
        }
        let rows = query.fetch_all(&self.pool).await.map_err(backend)?;

        rows.iter().map(decode_row).collect()
    }
}

fn decode_row(row: &sqlx::any::AnyRow) -> Result<StoredEmitter, StorageError> {
    let id: String = row.try_get("id").map_err(backend)?;
    let payload: String = row.try_get("payload").map_err(backend)?;
    let updated_at: i64 = row.try_get("updated_at").map_err(backend)?;

    let identity: RfIdentification = id.parse().map_err(|e: crate::identity::IdentityParseError| {
        StorageError::Corrupt { id: id.clone(), reason: e.to_string() }
    })?;
    let payload: EmitterPayload = serde_json::from_str(&payload).map_err(|e| StorageError::Corrupt {
        id: id.clone(),
        reason: e.to_string(),
    })?;

    Ok(StoredEmitter {
        id: identity,
        payload,
        updated_at,
    })
}

struct SqlTransaction {
    tx: Transaction<'static, Any>,
    upserts: usize,
}

#[async_trait]
impl StoreTransaction for SqlTransaction {
    async fn upsert(&mut self, emitter: &StoredEmitter) -> Result<(), StorageError> {
        let payload = serde_json::to_string(&emitter.payload)
            .map_err(|e| StorageError::Backend(format!("Failed to encode payload: {}", e)))?;

        sqlx::query(UPSERT_SQL)
            .bind(emitter.id.unique_id())
            .bind(emitter.id.emitter_type().as_str())
            .bind(payload)
            .bind(emitter.updated_at)
            .execute(&mut *self.tx)
            .await
            .map_err(backend)?;

        self.upserts += 1;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StorageError> {
        let upserts = self.upserts;
        self.tx.commit().await.map_err(backend)?;
        debug!(upserts, "SQL transaction committed");
        Ok(())
    }
}

#[async_trait]
impl EmitterStore for SqlStore {
    async fn fetch_emitters(&self, ids: &[RfIdentification]) -> Result<Vec<StoredEmitter>, StorageError> {
        self.ensure_open()?;
        let mut found = Vec::new();
        for chunk in ids.chunks(FETCH_CHUNK_SIZE) {
            found.extend(self.fetch_chunk(chunk).await?);
        }
        Ok(found)
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StorageError> {
        self.ensure_open()?;
        let tx = self.pool.begin().await.map_err(backend)?;
        Ok(Box::new(SqlTransaction { tx, upserts: 0 }))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
