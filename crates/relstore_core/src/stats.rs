//! Store statistics.
//!
//! Counters are atomic and can be read while mutations are in progress.
//!
//! ```rust,ignore
//! let store = Store::new();
//! // ... mutations and queries
//! let stats = store.stats();
//! println!("scans: {}", stats.scans);
//! ```

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live operation counters for a store.
#[derive(Debug, Default)]
pub struct StoreStats {
    inserts: AtomicU64,
    updates: AtomicU64,
    deletes: AtomicU64,
    /// Deletes reached through cascading relationships.
    cascaded_deletes: AtomicU64,
    truncations: AtomicU64,
    index_lookups: AtomicU64,
    /// Lookups that had no index and scanned the collection.
    scans: AtomicU64,
    triggers_fired: AtomicU64,
    constraint_violations: AtomicU64,
}

impl StoreStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_update(&self) {
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cascaded_delete(&self) {
        self.cascaded_deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_truncation(&self) {
        self.truncations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_index_lookup(&self) {
        self.index_lookups.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_scan(&self) {
        self.scans.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_trigger_fired(&self) {
        self.triggers_fired.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_constraint_violation(&self) {
        self.constraint_violations.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of inserts.
    pub fn inserts(&self) -> u64 {
        self.inserts.load(Ordering::Relaxed)
    }

    /// Returns the number of updates (adds that replaced an existing key).
    pub fn updates(&self) -> u64 {
        self.updates.load(Ordering::Relaxed)
    }

    /// Returns the number of deletes, cascaded ones included.
    pub fn deletes(&self) -> u64 {
        self.deletes.load(Ordering::Relaxed)
    }

    /// Returns the number of deletes triggered by cascades.
    pub fn cascaded_deletes(&self) -> u64 {
        self.cascaded_deletes.load(Ordering::Relaxed)
    }

    /// Returns the number of truncated collections.
    pub fn truncations(&self) -> u64 {
        self.truncations.load(Ordering::Relaxed)
    }

    /// Returns the number of index-backed lookups.
    pub fn index_lookups(&self) -> u64 {
        self.index_lookups.load(Ordering::Relaxed)
    }

    /// Returns the number of full scans.
    ///
    /// High scan counts usually mean an index is missing.
    pub fn scans(&self) -> u64 {
        self.scans.load(Ordering::Relaxed)
    }

    /// Returns the number of trigger invocations.
    pub fn triggers_fired(&self) -> u64 {
        self.triggers_fired.load(Ordering::Relaxed)
    }

    /// Returns the number of mutations rejected by constraints.
    pub fn constraint_violations(&self) -> u64 {
        self.constraint_violations.load(Ordering::Relaxed)
    }

    /// Returns a point-in-time copy of every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            inserts: self.inserts(),
            updates: self.updates(),
            deletes: self.deletes(),
            cascaded_deletes: self.cascaded_deletes(),
            truncations: self.truncations(),
            index_lookups: self.index_lookups(),
            scans: self.scans(),
            triggers_fired: self.triggers_fired(),
            constraint_violations: self.constraint_violations(),
        }
    }
}

/// Serializable copy of [`StoreStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[allow(missing_docs)]
pub struct StatsSnapshot {
    pub inserts: u64,
    pub updates: u64,
    pub deletes: u64,
    pub cascaded_deletes: u64,
    pub truncations: u64,
    pub index_lookups: u64,
    pub scans: u64,
    pub triggers_fired: u64,
    pub constraint_violations: u64,
}
