//! Global atomic counters for evalmark.
//!
//! Counters are bumped silently at the call site. [`Metrics::flush`] emits
//! the current values as one `tracing::info!` event, typically at the end of
//! a CLI command.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    records_scored: AtomicU64,
    snapshots_appended: AtomicU64,
    snapshots_evicted: AtomicU64,
    rubrics_imported: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            records_scored: AtomicU64::new(0),
            snapshots_appended: AtomicU64::new(0),
            snapshots_evicted: AtomicU64::new(0),
            rubrics_imported: AtomicU64::new(0),
        }
    }

    /// Add `n` to the records-scored counter.
    pub fn add_records_scored(&self, n: u64) {
        self.records_scored.fetch_add(n, Ordering::Relaxed);
        tracing::trace!(metric = "records_scored", by = n, "counter incremented");
    }

    pub fn inc_snapshots_appended(&self) {
        self.snapshots_appended.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "snapshots_appended", "counter incremented");
    }

    /// Add `n` to the snapshots-evicted counter.
    pub fn add_snapshots_evicted(&self, n: u64) {
        self.snapshots_evicted.fetch_add(n, Ordering::Relaxed);
        tracing::trace!(metric = "snapshots_evicted", by = n, "counter incremented");
    }

    pub fn inc_rubrics_imported(&self) {
        self.rubrics_imported.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "rubrics_imported", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            records_scored = self.records_scored(),
            snapshots_appended = self.snapshots_appended(),
            snapshots_evicted = self.snapshots_evicted(),
            rubrics_imported = self.rubrics_imported(),
        );
    }

    pub fn records_scored(&self) -> u64 {
        self.records_scored.load(Ordering::Relaxed)
    }

    pub fn snapshots_appended(&self) -> u64 {
        self.snapshots_appended.load(Ordering::Relaxed)
    }

    pub fn snapshots_evicted(&self) -> u64 {
        self.snapshots_evicted.load(Ordering::Relaxed)
    }

    pub fn rubrics_imported(&self) -> u64 {
        self.rubrics_imported.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.records_scored.store(0, Ordering::Relaxed);
        self.snapshots_appended.store(0, Ordering::Relaxed);
        self.snapshots_evicted.store(0, Ordering::Relaxed);
        self.rubrics_imported.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = Metrics::new();
        assert_eq!(m.records_scored(), 0);
        m.add_records_scored(3);
        m.add_records_scored(2);
        assert_eq!(m.records_scored(), 5);

        m.inc_snapshots_appended();
        assert_eq!(m.snapshots_appended(), 1);

        m.add_snapshots_evicted(2);
        assert_eq!(m.snapshots_evicted(), 2);

        m.inc_rubrics_imported();
        m.inc_rubrics_imported();
        assert_eq!(m.rubrics_imported(), 2);
    }

    #[test]
    fn reset_zeroes_all() {
        let m = Metrics::new();
        m.add_records_scored(4);
        m.inc_snapshots_appended();
        m.add_snapshots_evicted(1);
        m.inc_rubrics_imported();
        m.reset();
        assert_eq!(m.records_scored(), 0);
        assert_eq!(m.snapshots_appended(), 0);
        assert_eq!(m.snapshots_evicted(), 0);
        assert_eq!(m.rubrics_imported(), 0);
    }
}
