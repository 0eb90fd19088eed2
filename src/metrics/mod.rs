//! Ring activity counters (feature `metrics`).
//!
//! Recording, snapshotting and export are separate traits so that the ring
//! only ever writes counters, while tests and monitoring read them through a
//! [`RingMetricsSnapshot`](snapshot::RingMetricsSnapshot).

pub mod exporter;
pub mod metrics_impl;
pub mod snapshot;
pub mod traits;
