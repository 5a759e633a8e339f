//! Metrics registry for query execution
//!
//! - Counters only (no gauges, no histograms)
//! - Monotonic increase
//! - Reset only on process start
//! - Thread-safe but lock-minimal

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Metrics registry containing all query counters
///
/// # Thread Safety
///
/// All counters use atomic operations for thread-safe increments.
/// Uses Relaxed ordering; counters are read as independent values.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Queries started
    queries_executed: AtomicU64,
    /// Queries whose candidates came straight from an index
    index_paths: AtomicU64,
    /// Queries that fell back to a full store scan
    full_scans: AtomicU64,
    /// Sort-limit probes that satisfied the query
    probe_hits: AtomicU64,
    /// Sort-limit probes that under-delivered
    probe_fallbacks: AtomicU64,
    /// Point lookups that found no document
    lookups_dropped: AtomicU64,
    /// Documents emitted to callers
    documents_returned: AtomicU64,
    /// Store or index faults surfaced to callers
    store_faults: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment queries executed
    pub fn increment_queries_executed(&self) {
        self.queries_executed.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment index paths taken
    pub fn increment_index_paths(&self) {
        self.index_paths.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment full scans
    pub fn increment_full_scans(&self) {
        self.full_scans.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment satisfied probes
    pub fn increment_probe_hits(&self) {
        self.probe_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment probe fallbacks
    pub fn increment_probe_fallbacks(&self) {
        self.probe_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment dropped lookups
    pub fn increment_lookups_dropped(&self) {
        self.lookups_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Add returned documents
    pub fn add_documents_returned(&self, count: u64) {
        self.documents_returned.fetch_add(count, Ordering::Relaxed);
    }

    /// Increment store faults
    pub fn increment_store_faults(&self) {
        self.store_faults.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queries_executed: self.queries_executed.load(Ordering::Relaxed),
            index_paths: self.index_paths.load(Ordering::Relaxed),
            full_scans: self.full_scans.load(Ordering::Relaxed),
            probe_hits: self.probe_hits.load(Ordering::Relaxed),
            probe_fallbacks: self.probe_fallbacks.load(Ordering::Relaxed),
            lookups_dropped: self.lookups_dropped.load(Ordering::Relaxed),
            documents_returned: self.documents_returned.load(Ordering::Relaxed),
            store_faults: self.store_faults.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub queries_executed: u64,
    pub index_paths: u64,
    pub full_scans: u64,
    pub probe_hits: u64,
    pub probe_fallbacks: u64,
    pub lookups_dropped: u64,
    pub documents_returned: u64,
    pub store_faults: u64,
}
