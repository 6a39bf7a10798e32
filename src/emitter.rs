// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Emitter records.
//!
//! An [`RfEmitter`] is the mutable unit of state the cache hands out. It is
//! not internally synchronized; the cache shares it as a [`SharedEmitter`]
//! and the per-record mutex is the caller's synchronization, not the cache's.
//!
//! # Example
//!
//! ```
//! use emitter_cache::{RfEmitter, RfIdentification, EmitterType, EmitterPayload, EmitterStatus};
//!
//! let mut emitter = RfEmitter::new(RfIdentification::new(EmitterType::Wifi, "aa:bb:cc"));
//! assert_eq!(emitter.status(), EmitterStatus::Unknown);
//! assert!(!emitter.is_dirty());
//!
//! emitter.set_payload(EmitterPayload::new(52.52, 13.40, 80.0, 80.0));
//! assert_eq!(emitter.status(), EmitterStatus::New);
//! assert!(emitter.is_dirty());
//! ```

use std::sync::Arc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use crate::identity::RfIdentification;

/// A record shared between the cache and the caller of
/// [`EmitterCache::get`](crate::EmitterCache::get).
///
/// The cache lock only protects the working-set mapping. Everything inside
/// the record is guarded by this mutex alone; callers must not hold the guard
/// across a call into the cache.
pub type SharedEmitter = Arc<Mutex<RfEmitter>>;

/// Observation state of an emitter, opaque to the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmitterPayload {
    /// Coverage centre latitude (degrees)
    pub latitude: f64,
    /// Coverage centre longitude (degrees)
    pub longitude: f64,
    /// North/south coverage radius (metres)
    pub radius_ns: f64,
    /// East/west coverage radius (metres)
    pub radius_ew: f64,
    /// Free-form note, e.g. the SSID of an access point
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl EmitterPayload {
    pub fn new(latitude: f64, longitude: f64, radius_ns: f64, radius_ew: f64) -> Self {
        Self {
            latitude,
            longitude,
            radius_ns,
            radius_ew,
            note: None,
        }
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Persistence status of a record relative to the durable store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmitterStatus {
    /// Created on a cache miss, never observed with a position
    Unknown,
    /// Observed, not yet in the store
    New,
    /// Loaded from the store and modified since
    Changed,
    /// Matches the store
    Cached,
}

impl EmitterStatus {
    #[must_use]
    pub fn needs_sync(&self) -> bool {
        matches!(self, Self::New | Self::Changed)
    }
}

impl std::fmt::Display for EmitterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "Unknown"),
            Self::New => write!(f, "New"),
            Self::Changed => write!(f, "Changed"),
            Self::Cached => write!(f, "Cached"),
        }
    }
}

/// The durable form of an emitter, as read from and written to a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEmitter {
    pub id: RfIdentification,
    pub payload: EmitterPayload,
    /// Last update timestamp (epoch millis)
    pub updated_at: i64,
}

impl StoredEmitter {
    pub fn new(id: RfIdentification, payload: EmitterPayload) -> Self {
        Self {
            id,
            payload,
            updated_at: now_millis(),
        }
    }
}

/// A resident emitter record.
#[derive(Debug, Clone)]
pub struct RfEmitter {
    id: RfIdentification,
    payload: Option<EmitterPayload>,
    status: EmitterStatus,
    updated_at: i64,
    /// Bumped on every mutation; a sync only cleans the revision it wrote
    revision: u64,
    /// Maintenance cycles since the last lookup
    age: u32,
}

impl RfEmitter {
    /// A default record for an identity the cache has no data for.
    pub fn new(id: RfIdentification) -> Self {
        Self {
            id,
            payload: None,
            status: EmitterStatus::Unknown,
            updated_at: 0,
            revision: 0,
            age: 0,
        }
    }

    /// A clean record seeded from the store.
    pub fn from_stored(stored: StoredEmitter) -> Self {
        Self {
            id: stored.id,
            payload: Some(stored.payload),
            status: EmitterStatus::Cached,
            updated_at: stored.updated_at,
            revision: 0,
            age: 0,
        }
    }

    #[must_use]
    pub fn id(&self) -> &RfIdentification {
        &self.id
    }

    #[must_use]
    pub fn unique_id(&self) -> String {
        self.id.unique_id()
    }

    #[must_use]
    pub fn payload(&self) -> Option<&EmitterPayload> {
        self.payload.as_ref()
    }

    #[must_use]
    pub fn status(&self) -> EmitterStatus {
        self.status
    }

    /// True if the in-memory state diverges from the store.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.status.needs_sync()
    }

    #[must_use]
    pub fn age(&self) -> u32 {
        self.age
    }

    #[must_use]
    pub fn updated_at(&self) -> i64 {
        self.updated_at
    }

    /// Replace the observation state and mark the record for write-back.
    pub fn set_payload(&mut self, payload: EmitterPayload) {
        self.payload = Some(payload);
        self.status = match self.status {
            EmitterStatus::Unknown | EmitterStatus::New => EmitterStatus::New,
            EmitterStatus::Changed | EmitterStatus::Cached => EmitterStatus::Changed,
        };
        self.updated_at = now_millis();
        self.revision = self.revision.wrapping_add(1);
    }

    /// Set the note on an observed record. Returns false if there is no
    /// payload to annotate yet.
    pub fn set_note(&mut self, note: impl Into<String>) -> bool {
        let Some(mut payload) = self.payload.clone() else {
            return false;
        };
        payload.note = Some(note.into());
        self.set_payload(payload);
        true
    }

    /// Durable form of a dirty record, tagged with the revision it captures.
    pub(crate) fn snapshot(&self) -> Option<(u64, StoredEmitter)> {
        if !self.is_dirty() {
            return None;
        }
        let payload = self.payload.clone()?;
        Some((
            self.revision,
            StoredEmitter {
                id: self.id.clone(),
                payload,
                updated_at: self.updated_at,
            },
        ))
    }

    /// Mark clean after a successful write, unless mutated since `revision`.
    pub(crate) fn mark_synced(&mut self, revision: u64) -> bool {
        if self.revision != revision || !self.is_dirty() {
            return false;
        }
        self.status = EmitterStatus::Cached;
        true
    }

    pub(crate) fn reset_age(&mut self) {
        self.age = 0;
    }

    /// Age by one maintenance cycle, returning the new age.
    pub(crate) fn increment_age(&mut self) -> u32 {
        self.age = self.age.saturating_add(1);
        self.age
    }

    pub(crate) fn into_shared(self) -> SharedEmitter {
        Arc::new(Mutex::new(self))
    }
}

pub(crate) fn now_millis() -> i64 {
    let since_epoch = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    millis_saturating(since_epoch)
}

/// Milliseconds as the store's `INTEGER` column, clamped at `i64::MAX`.
fn millis_saturating(duration: std::time::Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}
