//! ObjectIO Disk Check - identity guard and API metrics for local disks
//!
//! This crate sits directly in front of a local storage backend:
//! - [`StorageApi`]: the capability set of a single disk
//! - [`StaleDiskGuard`]: detects a disk that was swapped, reformatted or
//!   remounted since its identity was bound
//! - [`MetricsRecorder`]: per-operation call counts and moving average
//!   latencies
//! - [`DiskIdCheck`]: a drop-in [`StorageApi`] that applies cancellation,
//!   staleness and metrics to every call before forwarding it

pub mod api;
pub mod guard;
pub mod metrics;
pub mod proxy;

#[cfg(test)]
mod mock;

// Re-exports
pub use api::{FileReader, StorageApi};
pub use guard::StaleDiskGuard;
pub use metrics::{LockedEwma, MetricTimer, MetricsRecorder, StorageMetric};
pub use proxy::DiskIdCheck;
