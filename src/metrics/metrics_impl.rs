use crate::metrics::snapshot::RingMetricsSnapshot;
use crate::metrics::traits::{MetricsReset, MetricsSnapshotProvider, RingMetricsRecorder};

/// Plain counters; the owning ring is either `&mut` or behind its mutex.
#[derive(Debug, Default, Clone)]
pub struct RingMetrics {
    pub pushes: u64,
    pub placeholders: u64,
    pub evictions: u64,
    pub overwrites: u64,
    pub rejected_too_old: u64,
    pub rejected_by_policy: u64,
}

impl RingMetricsRecorder for RingMetrics {
    #[inline]
    fn record_push(&mut self, placeholder: bool) {
        self.pushes += 1;
        if placeholder {
            self.placeholders += 1;
        }
    }

    #[inline]
    fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    #[inline]
    fn record_overwrite(&mut self) {
        self.overwrites += 1;
    }

    #[inline]
    fn record_rejected_too_old(&mut self) {
        self.rejected_too_old += 1;
    }

    #[inline]
    fn record_rejected_by_policy(&mut self) {
        self.rejected_by_policy += 1;
    }
}

impl MetricsSnapshotProvider<RingMetricsSnapshot> for RingMetrics {
    /// Gauges (`len`, `capacity`) are left at 0; the ring fills them in.
    fn snapshot(&self) -> RingMetricsSnapshot {
        RingMetricsSnapshot {
            pushes: self.pushes,
            placeholders: self.placeholders,
            evictions: self.evictions,
            overwrites: self.overwrites,
            rejected_too_old: self.rejected_too_old,
            rejected_by_policy: self.rejected_by_policy,
            len: 0,
            capacity: 0,
        }
    }
}

impl MetricsReset for RingMetrics {
    fn reset_metrics(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_pushes_count_twice() {
        let mut metrics = RingMetrics::default();
        metrics.record_push(false);
        metrics.record_push(true);
        metrics.record_eviction();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.pushes, 2);
        assert_eq!(snapshot.placeholders, 1);
        assert_eq!(snapshot.evictions, 1);
    }

    #[test]
    fn reset_clears_counters() {
        let mut metrics = RingMetrics::default();
        metrics.record_overwrite();
        metrics.record_rejected_by_policy();
        metrics.reset_metrics();
        assert_eq!(metrics.snapshot(), RingMetricsSnapshot::default());
    }
}
