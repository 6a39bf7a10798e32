// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Public types for the emitter cache.

/// Cache lifecycle. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLifecycle {
    /// Serving lookups; persistence enabled if a store is attached
    Open,
    /// Synced, cleared and detached from its store
    Closed,
}

impl std::fmt::Display for CacheLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "Open"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

/// What a maintenance pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Resident records when the pass started
    pub resident: usize,
    /// Records whose idle age reached the eviction threshold
    pub aged_out: usize,
    /// Dirty records upserted in the pass's transaction
    pub written: usize,
    /// Aged-out records removed from the working set
    pub evicted: usize,
    /// Whether the working set was cleared for exceeding its size bound
    pub cleared: bool,
    /// Resident records when the pass finished
    pub remaining: usize,
}

/// Result of [`super::EmitterCache::sync`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// No store attached or cache closed; nothing was aged or written
    Skipped,
    Synced(SyncReport),
}

impl SyncOutcome {
    #[must_use]
    pub fn report(&self) -> Option<&SyncReport> {
        match self {
            Self::Skipped => None,
            Self::Synced(report) => Some(report),
        }
    }

    #[must_use]
    pub fn written(&self) -> usize {
        self.report().map_or(0, |r| r.written)
    }
}
