//! Per-operation API metrics for a single disk
//!
//! Each [`StorageMetric`] owns one slot holding a lock-free call counter
//! and an exponentially weighted moving average of latency. Slots are
//! allocated once, at construction, and never added or removed.
//!
//! # Prometheus Metrics
//! - `objectio_disk_api_calls_total` - Calls per operation (counter)
//! - `objectio_disk_api_latency_seconds` - Moving average latency per operation

use objectio_common::{DiskCheckConfig, DiskMetrics};
use parking_lot::RwLock;
use std::fmt::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Kind of storage API call, used as the metrics index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum StorageMetric {
    MakeVolBulk,
    MakeVol,
    ListVols,
    StatVol,
    DeleteVol,
    WalkDir,
    ListDir,
    ReadFile,
    AppendFile,
    CreateFile,
    ReadFileStream,
    RenameFile,
    RenameData,
    CheckParts,
    CheckFile,
    Delete,
    DeleteVersions,
    VerifyFile,
    WriteAll,
    DeleteVersion,
    WriteMetadata,
    ReadVersion,
    ReadAll,
}

/// External names, indexed by discriminant. Dashboards key on these.
const METRIC_NAMES: [&str; StorageMetric::COUNT] = [
    "MakeVolBulk",
    "MakeVol",
    "ListVols",
    "StatVol",
    "DeleteVol",
    "WalkDir",
    "ListDir",
    "ReadFile",
    "AppendFile",
    "CreateFile",
    "ReadFileStream",
    "RenameFile",
    "RenameData",
    "CheckParts",
    "CheckFile",
    "Delete",
    "DeleteVersions",
    "VerifyFile",
    "WriteAll",
    "DeleteVersion",
    "WriteMetadata",
    "ReadVersion",
    "ReadAll",
];

impl StorageMetric {
    /// Number of operation kinds
    pub const COUNT: usize = 23;

    /// All operation kinds in discriminant order
    pub const ALL: [Self; Self::COUNT] = [
        Self::MakeVolBulk,
        Self::MakeVol,
        Self::ListVols,
        Self::StatVol,
        Self::DeleteVol,
        Self::WalkDir,
        Self::ListDir,
        Self::ReadFile,
        Self::AppendFile,
        Self::CreateFile,
        Self::ReadFileStream,
        Self::RenameFile,
        Self::RenameData,
        Self::CheckParts,
        Self::CheckFile,
        Self::Delete,
        Self::DeleteVersions,
        Self::VerifyFile,
        Self::WriteAll,
        Self::DeleteVersion,
        Self::WriteMetadata,
        Self::ReadVersion,
        Self::ReadAll,
    ];

    /// Stable external name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        METRIC_NAMES[self as usize]
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for StorageMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Simple EWMA guarded by a reader-writer lock
///
/// The first sample seeds the average; later samples are blended in with
/// weight `alpha`.
#[derive(Debug)]
pub struct LockedEwma {
    alpha: f64,
    value: RwLock<f64>,
}

impl LockedEwma {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            value: RwLock::new(0.0),
        }
    }

    pub fn add(&self, sample: f64) {
        let mut value = self.value.write();
        if *value == 0.0 {
            *value = sample;
        } else {
            *value = self.alpha.mul_add(sample - *value, *value);
        }
    }

    pub fn set(&self, value: f64) {
        *self.value.write() = value;
    }

    pub fn value(&self) -> f64 {
        *self.value.read()
    }
}

/// Counter and latency average for one operation kind
#[derive(Debug)]
struct MetricSlot {
    calls: AtomicU64,
    latency_nanos: LockedEwma,
}

impl MetricSlot {
    fn new(alpha: f64) -> Self {
        Self {
            calls: AtomicU64::new(0),
            latency_nanos: LockedEwma::new(alpha),
        }
    }
}

/// Fixed table of per-operation metric slots
#[derive(Debug)]
pub struct MetricsRecorder {
    slots: [MetricSlot; StorageMetric::COUNT],
}

impl MetricsRecorder {
    /// Create a recorder whose averages use the given smoothing factor
    pub fn new(alpha: f64) -> Self {
        Self {
            slots: std::array::from_fn(|_| MetricSlot::new(alpha)),
        }
    }

    pub fn with_config(config: &DiskCheckConfig) -> Self {
        Self::new(config.latency_ewma_alpha)
    }

    /// Start timing one call. The sample is committed when the returned
    /// handle is dropped, whichever way the call exits.
    pub fn begin(&self, metric: StorageMetric) -> MetricTimer<'_> {
        MetricTimer {
            recorder: self,
            metric,
            start: Instant::now(),
        }
    }

    fn record(&self, metric: StorageMetric, elapsed: Duration) {
        let slot = &self.slots[metric.index()];
        slot.calls.fetch_add(1, Ordering::Relaxed);
        slot.latency_nanos.add(elapsed.as_nanos() as f64);
    }

    /// Cumulative call count for one operation kind
    pub fn calls(&self, metric: StorageMetric) -> u64 {
        self.slots[metric.index()].calls.load(Ordering::Relaxed)
    }

    /// Current moving average latency for one operation kind
    pub fn average_latency(&self, metric: StorageMetric) -> Duration {
        let nanos = self.slots[metric.index()].latency_nanos.value();
        Duration::from_nanos(nanos.max(0.0) as u64)
    }

    /// Immutable copy of all counters and averages, keyed by name
    pub fn snapshot(&self) -> DiskMetrics {
        let mut metrics = DiskMetrics::default();
        for metric in StorageMetric::ALL {
            metrics
                .api_latencies
                .insert(metric.as_str().to_string(), format!("{:?}", self.average_latency(metric)));
            metrics
                .api_calls
                .insert(metric.as_str().to_string(), self.calls(metric));
        }
        metrics
    }

    /// Render counters and averages in Prometheus text format
    pub fn render_prometheus(&self, disk: &str) -> String {
        let mut output = String::with_capacity(4 * 1024);

        let _ = writeln!(
            output,
            "# HELP objectio_disk_api_calls_total Storage API calls per operation"
        );
        let _ = writeln!(output, "# TYPE objectio_disk_api_calls_total counter");
        for metric in StorageMetric::ALL {
            let _ = writeln!(
                output,
                "objectio_disk_api_calls_total{{disk=\"{}\",api=\"{}\"}} {}",
                disk,
                metric,
                self.calls(metric)
            );
        }

        let _ = writeln!(
            output,
            "# HELP objectio_disk_api_latency_seconds Moving average storage API latency"
        );
        let _ = writeln!(output, "# TYPE objectio_disk_api_latency_seconds gauge");
        for metric in StorageMetric::ALL {
            let _ = writeln!(
                output,
                "objectio_disk_api_latency_seconds{{disk=\"{}\",api=\"{}\"}} {}",
                disk,
                metric,
                self.average_latency(metric).as_secs_f64()
            );
        }

        output
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::with_config(&DiskCheckConfig::default())
    }
}

/// Completion handle returned by [`MetricsRecorder::begin`]
#[must_use = "the call is recorded when the timer is dropped"]
pub struct MetricTimer<'a> {
    recorder: &'a MetricsRecorder,
    metric: StorageMetric,
    start: Instant,
}

impl MetricTimer<'_> {
    /// Commit the sample now
    pub fn finish(self) {}
}

impl Drop for MetricTimer<'_> {
    fn drop(&mut self) {
        self.recorder.record(self.metric, self.start.elapsed());
    }
}
