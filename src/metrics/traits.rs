//! # Metrics Traits
//!
//! ```text
//!   ┌─────────────────────────────┐
//!   │     RingMetricsRecorder     │   written by RoundRing on every mutation
//!   │  push/eviction/overwrite    │
//!   │  rejected_too_old/_policy   │
//!   └──────────────┬──────────────┘
//!                  │
//!   Consumption (decoupled from recording):
//!   ┌──────────────────────────────┐    ┌──────────────────────────────┐
//!   │ MetricsSnapshotProvider<S>   │    │ MetricsExporter<S>           │
//!   │ (bench/test)                 │    │ (production monitoring)      │
//!   └──────────────────────────────┘    └──────────────────────────────┘
//! ```

/// Counters for a keyed round ring.
pub trait RingMetricsRecorder {
    /// A slot was written; `placeholder` is true for a gap fill.
    fn record_push(&mut self, placeholder: bool);
    fn record_eviction(&mut self);
    fn record_overwrite(&mut self);
    fn record_rejected_too_old(&mut self);
    fn record_rejected_by_policy(&mut self);
}

/// Produce a point-in-time copy of the counters.
pub trait MetricsSnapshotProvider<S> {
    fn snapshot(&self) -> S;
}

/// Reset counters between tests or benchmark iterations.
pub trait MetricsReset {
    fn reset_metrics(&mut self);
}

/// Publish a snapshot to a monitoring backend.
pub trait MetricsExporter<S> {
    fn export(&self, snapshot: &S);
}
