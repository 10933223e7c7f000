//! Global atomic counters for sitrep observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of a report run).

use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::GatherResult;

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters: no allocations, no locking.
pub struct Metrics {
    sources_gathered: AtomicU64,
    sources_failed: AtomicU64,
    sources_timed_out: AtomicU64,
    relations_found: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            sources_gathered: AtomicU64::new(0),
            sources_failed: AtomicU64::new(0),
            sources_timed_out: AtomicU64::new(0),
            relations_found: AtomicU64::new(0),
        }
    }

    /// Count one collected source result.
    pub fn record_source(&self, result: &GatherResult) {
        self.sources_gathered.fetch_add(1, Ordering::Relaxed);
        if result.is_error() {
            self.sources_failed.fetch_add(1, Ordering::Relaxed);
        }
        if result.is_timed_out() {
            self.sources_timed_out.fetch_add(1, Ordering::Relaxed);
        }
        tracing::trace!(metric = "sources_gathered", "counter incremented");
    }

    /// Add to the relations-found counter.
    pub fn add_relations(&self, count: usize) {
        self.relations_found.fetch_add(count as u64, Ordering::Relaxed);
        tracing::trace!(metric = "relations_found", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            sources_gathered = self.sources_gathered(),
            sources_failed = self.sources_failed(),
            sources_timed_out = self.sources_timed_out(),
            relations_found = self.relations_found(),
        );
    }

    pub fn sources_gathered(&self) -> u64 {
        self.sources_gathered.load(Ordering::Relaxed)
    }

    /// Sources that ended in `Error`, timeouts included.
    pub fn sources_failed(&self) -> u64 {
        self.sources_failed.load(Ordering::Relaxed)
    }

    pub fn sources_timed_out(&self) -> u64 {
        self.sources_timed_out.load(Ordering::Relaxed)
    }

    pub fn relations_found(&self) -> u64 {
        self.relations_found.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.sources_gathered.store(0, Ordering::Relaxed);
        self.sources_failed.store(0, Ordering::Relaxed);
        self.sources_timed_out.store(0, Ordering::Relaxed);
        self.relations_found.store(0, Ordering::Relaxed);
    }
}
