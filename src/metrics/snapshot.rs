#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RingMetricsSnapshot {
    pub pushes: u64,
    pub placeholders: u64, // subset of pushes that filled a gap
    pub evictions: u64,
    pub overwrites: u64,
    pub rejected_too_old: u64,
    pub rejected_by_policy: u64,

    // gauges captured at snapshot time
    pub len: usize,
    pub capacity: usize,
}
