use std::io::{self, Write};

use parking_lot::Mutex;

use crate::metrics::snapshot::RingMetricsSnapshot;
use crate::metrics::traits::MetricsExporter;

/// Prometheus text exporter for ring metrics snapshots.
///
/// Writes the Prometheus text exposition format so the output can be scraped
/// or forwarded to an OpenTelemetry collector.
#[derive(Debug)]
pub struct PrometheusTextExporter<W: Write + Send> {
    prefix: String,
    writer: Mutex<W>,
}

impl<W: Write + Send> PrometheusTextExporter<W> {
    pub fn new(prefix: impl Into<String>, writer: W) -> Self {
        Self {
            prefix: prefix.into(),
            writer: Mutex::new(writer),
        }
    }

    /// Consumes the exporter, returning the writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn write_metric(writer: &mut W, kind: &str, name: &str, value: u64) -> io::Result<()> {
        writeln!(writer, "# TYPE {} {}", name, kind)?;
        writeln!(writer, "{} {}", name, value)
    }

    fn write_snapshot(&self, snapshot: &RingMetricsSnapshot) -> io::Result<()> {
        let metrics = [
            ("counter", "pushes_total", snapshot.pushes),
            ("counter", "placeholders_total", snapshot.placeholders),
            ("counter", "evictions_total", snapshot.evictions),
            ("counter", "overwrites_total", snapshot.overwrites),
            ("counter", "rejected_too_old_total", snapshot.rejected_too_old),
            ("counter", "rejected_by_policy_total", snapshot.rejected_by_policy),
            ("gauge", "len", snapshot.len as u64),
            ("gauge", "capacity", snapshot.capacity as u64),
        ];
        let mut writer = self.writer.lock();
        for (kind, suffix, value) in metrics {
            Self::write_metric(&mut *writer, kind, &self.metric_name(suffix), value)?;
        }
        writer.flush()
    }

    fn metric_name(&self, suffix: &str) -> String {
        if self.prefix.is_empty() {
            suffix.to_string()
        } else {
            format!("{}_{}", self.prefix, suffix)
        }
    }
}

impl<W: Write + Send> MetricsExporter<RingMetricsSnapshot> for PrometheusTextExporter<W> {
    /// Writes every metric; the first I/O error aborts the export and is
    /// logged.
    fn export(&self, snapshot: &RingMetricsSnapshot) {
        if let Err(err) = self.write_snapshot(snapshot) {
            log::warn!("failed to export ring metrics with prefix {:?}: {}", self.prefix, err);
        }
    }
}
