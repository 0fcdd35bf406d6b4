//! Dispatch counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-router metrics (atomic counters).
///
/// Updated on every dispatch; readable concurrently without locking.
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Requests handed to `dispatch`, whatever the outcome.
    pub dispatched: AtomicU64,
    /// Responses that carried a payload.
    pub good: AtomicU64,
    /// Faults produced because the handler raised (or panicked).
    pub handler_faults: AtomicU64,
    /// Faults produced because no handler was registered.
    pub unknown_operation: AtomicU64,
}

impl DispatchMetrics {
    /// Take a non-atomic snapshot of the current counters.
    pub fn snapshot(&self) -> DispatchMetricsSnapshot {
        DispatchMetricsSnapshot {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            good: self.good.load(Ordering::Relaxed),
            handler_faults: self.handler_faults.load(Ordering::Relaxed),
            unknown_operation: self.unknown_operation.load(Ordering::Relaxed),
        }
    }
}

/// Non-atomic snapshot of [`DispatchMetrics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchMetricsSnapshot {
    pub dispatched: u64,
    pub good: u64,
    pub handler_faults: u64,
    pub unknown_operation: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reads_counters() {
        let metrics = DispatchMetrics::default();
        metrics.dispatched.fetch_add(3, Ordering::Relaxed);
        metrics.good.fetch_add(2, Ordering::Relaxed);
        metrics.handler_faults.fetch_add(1, Ordering::Relaxed);

        let snapshot = metrics.snapshot();
        assert_eq!(
            snapshot,
            DispatchMetricsSnapshot {
                dispatched: 3,
                good: 2,
                handler_faults: 1,
                unknown_operation: 0,
            }
        );
    }
}
