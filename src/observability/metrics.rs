//! Query metrics for dirquery
//!
//! - Counters only
//! - Monotonic increase
//! - Thread-safe but lock-free

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters describing parser and executor activity
///
/// All counters use Relaxed atomics; readers only need eventually exact
/// totals.
#[derive(Debug, Default)]
pub struct QueryMetrics {
    queries_parsed: AtomicU64,
    queries_rejected: AtomicU64,
    queries_executed: AtomicU64,
    /// Executions driven by an attribute index
    index_driven: AtomicU64,
    full_scans: AtomicU64,
    objects_examined: AtomicU64,
    objects_matched: AtomicU64,
}

impl QueryMetrics {
    /// Create a new registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_parsed(&self) {
        self.queries_parsed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rejected(&self) {
        self.queries_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one finished execution
    pub fn record_execution(&self, index_driven: bool, examined: u64, matched: u64) {
        self.queries_executed.fetch_add(1, Ordering::Relaxed);
        if index_driven {
            self.index_driven.fetch_add(1, Ordering::Relaxed);
        } else {
            self.full_scans.fetch_add(1, Ordering::Relaxed);
        }
        self.objects_examined.fetch_add(examined, Ordering::Relaxed);
        self.objects_matched.fetch_add(matched, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queries_parsed: self.queries_parsed.load(Ordering::Relaxed),
            queries_rejected: self.queries_rejected.load(Ordering::Relaxed),
            queries_executed: self.queries_executed.load(Ordering::Relaxed),
            index_driven: self.index_driven.load(Ordering::Relaxed),
            full_scans: self.full_scans.load(Ordering::Relaxed),
            objects_examined: self.objects_examined.load(Ordering::Relaxed),
            objects_matched: self.objects_matched.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub queries_parsed: u64,
    pub queries_rejected: u64,
    pub queries_executed: u64,
    pub index_driven: u64,
    pub full_scans: u64,
    pub objects_examined: u64,
    pub objects_matched: u64,
}

impl MetricsSnapshot {
    /// Serializes the snapshot as one JSON object
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_has_zero_values() {
        let snapshot = QueryMetrics::new().snapshot();
        assert_eq!(snapshot.queries_executed, 0);
        assert_eq!(snapshot.objects_examined, 0);
    }

    #[test]
    fn test_record_execution() {
        let metrics = QueryMetrics::new();
        metrics.increment_parsed();
        metrics.increment_parsed();
        metrics.increment_rejected();
        metrics.record_execution(true, 3, 1);
        metrics.record_execution(false, 100, 7);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.queries_parsed, 2);
        assert_eq!(snapshot.queries_rejected, 1);
        assert_eq!(snapshot.queries_executed, 2);
        assert_eq!(snapshot.index_driven, 1);
        assert_eq!(snapshot.full_scans, 1);
        assert_eq!(snapshot.objects_examined, 103);
        assert_eq!(snapshot.objects_matched, 8);
    }

    #[test]
    fn test_to_json() {
        let metrics = QueryMetrics::new();
        metrics.record_execution(true, 4, 2);

        let parsed: serde_json::Value =
            serde_json::from_str(&metrics.snapshot().to_json()).unwrap();
        assert_eq!(parsed["objects_examined"], 4);
        assert_eq!(parsed["index_driven"], 1);
    }

    #[test]
    fn test_thread_safety() {
        use std::sync::Arc;
        use std::thread;

        let metrics = Arc::new(QueryMetrics::new());
        let mut handles = vec![];

        for _ in 0..10 {
            let m = Arc::clone(&metrics);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    m.record_execution(false, 1, 0);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.queries_executed, 1000);
        assert_eq!(snapshot.full_scans, 1000);
    }
}
