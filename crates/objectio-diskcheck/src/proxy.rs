//! Disk identity check proxy
//!
//! [`DiskIdCheck`] wraps a local disk and implements the same
//! [`StorageApi`] surface. Every I/O call goes through one protocol:
//!
//! 1. start the metrics timer for the call's [`StorageMetric`]
//! 2. return `Error::Cancelled` if the caller's token already fired
//! 3. return the staleness error if the disk's identity drifted
//! 4. forward to the disk, arguments and result untouched
//! 5. commit one call and one latency sample, on every exit path
//!
//! `disk_info` and `ns_scanner` are not timed; lifecycle accessors are
//! forwarded without any checks.

use crate::api::{FileReader, StorageApi};
use crate::guard::StaleDiskGuard;
use crate::metrics::{MetricsRecorder, StorageMetric};
use async_trait::async_trait;
use objectio_common::{
    BitrotVerifier, DataUsageCache, DiskCheckConfig, DiskInfo, DiskLocation, DiskMetrics,
    Endpoint, Error, FileInfo, HealingTracker, Result, VolInfo,
};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Detects a change of the underlying disk and records API metrics
pub struct DiskIdCheck {
    storage: Arc<dyn StorageApi>,
    guard: StaleDiskGuard,
    metrics: MetricsRecorder,
}

impl DiskIdCheck {
    /// Wrap a disk using the default metrics configuration
    pub fn new(storage: Arc<dyn StorageApi>) -> Self {
        Self::with_config(storage, &DiskCheckConfig::default())
    }

    pub fn with_config(storage: Arc<dyn StorageApi>, config: &DiskCheckConfig) -> Self {
        Self {
            guard: StaleDiskGuard::new(Arc::clone(&storage)),
            metrics: MetricsRecorder::with_config(config),
            storage,
        }
    }

    /// The wrapped disk
    pub fn storage(&self) -> &Arc<dyn StorageApi> {
        &self.storage
    }

    pub fn guard(&self) -> &StaleDiskGuard {
        &self.guard
    }

    pub fn recorder(&self) -> &MetricsRecorder {
        &self.metrics
    }

    /// Snapshot of per-operation call counts and average latencies
    pub fn metrics(&self) -> DiskMetrics {
        self.metrics.snapshot()
    }

    /// Prometheus text for this disk's API metrics
    pub fn render_prometheus(&self) -> String {
        self.metrics.render_prometheus(&self.storage.to_string())
    }

    pub async fn check_disk_stale(&self) -> Result<()> {
        self.guard.check_stale().await
    }

    /// Cancellation and staleness checks, in that order
    async fn precheck(&self, ctx: &CancellationToken) -> Result<()> {
        if ctx.is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.guard.check_stale().await
    }

    /// Run one backend call under the timer and the entry checks
    async fn guarded<T, F, Fut>(
        &self,
        metric: StorageMetric,
        ctx: &CancellationToken,
        call: F,
    ) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let _timer = self.metrics.begin(metric);
        self.precheck(ctx).await?;
        call().await
    }
}

impl fmt::Display for DiskIdCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.storage)
    }
}

#[async_trait]
impl StorageApi for DiskIdCheck {
    async fn is_online(&self) -> bool {
        self.guard.is_online().await
    }

    fn is_local(&self) -> bool {
        self.storage.is_local()
    }

    fn endpoint(&self) -> Endpoint {
        self.storage.endpoint()
    }

    fn hostname(&self) -> String {
        self.storage.hostname()
    }

    fn healing(&self) -> Option<HealingTracker> {
        self.storage.healing()
    }

    fn disk_location(&self) -> Option<DiskLocation> {
        self.storage.disk_location()
    }

    fn set_disk_location(&self, location: DiskLocation) {
        self.storage.set_disk_location(location);
    }

    fn close(&self) -> Result<()> {
        self.storage.close()
    }

    async fn get_disk_id(&self) -> Result<String> {
        self.storage.get_disk_id().await
    }

    fn set_disk_id(&self, id: &str) {
        self.guard.bind(id);
    }

    async fn disk_info(&self, ctx: &CancellationToken) -> Result<DiskInfo> {
        if ctx.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let mut info = self.storage.disk_info(ctx).await?;
        info.metrics = self.metrics.snapshot();

        // Validate against the identity in the payload, no second read
        if let Some(expected) = self.guard.bound() {
            if expected != info.id {
                warn!(
                    "disk {} reports id {}, expected {}",
                    self.storage, info.id, expected
                );
                return Err(Error::DiskStale {
                    expected: expected.to_string(),
                    found: info.id,
                });
            }
        }
        Ok(info)
    }

    async fn ns_scanner(
        &self,
        ctx: &CancellationToken,
        cache: DataUsageCache,
    ) -> Result<DataUsageCache> {
        self.precheck(ctx).await?;
        self.storage.ns_scanner(ctx, cache).await
    }

    async fn make_vol_bulk(&self, ctx: &CancellationToken, volumes: &[String]) -> Result<()> {
        self.guarded(StorageMetric::MakeVolBulk, ctx, move || {
            self.storage.make_vol_bulk(ctx, volumes)
        })
        .await
    }

    async fn make_vol(&self, ctx: &CancellationToken, volume: &str) -> Result<()> {
        self.guarded(StorageMetric::MakeVol, ctx, move || {
            self.storage.make_vol(ctx, volume)
        })
        .await
    }

    async fn list_vols(&self, ctx: &CancellationToken) -> Result<Vec<VolInfo>> {
        self.guarded(StorageMetric::ListVols, ctx, move || {
            self.storage.list_vols(ctx)
        })
        .await
    }

    async fn stat_vol(&self, ctx: &CancellationToken, volume: &str) -> Result<VolInfo> {
        self.guarded(StorageMetric::StatVol, ctx, move || {
            self.storage.stat_vol(ctx, volume)
        })
        .await
    }

    async fn delete_vol(
        &self,
        ctx: &CancellationToken,
        volume: &str,
        force_delete: bool,
    ) -> Result<()> {
        self.guarded(StorageMetric::DeleteVol, ctx, move || {
            self.storage.delete_vol(ctx, volume, force_delete)
        })
        .await
    }

    async fn walk_dir(
        &self,
        ctx: &CancellationToken,
        volume: &str,
        base_dir: &str,
        recursive: bool,
    ) -> Result<Vec<String>> {
        self.guarded(StorageMetric::WalkDir, ctx, move || {
            self.storage.walk_dir(ctx, volume, base_dir, recursive)
        })
        .await
    }

    async fn list_dir(
        &self,
        ctx: &CancellationToken,
        volume: &str,
        dir_path: &str,
        count: Option<usize>,
    ) -> Result<Vec<String>> {
        self.guarded(StorageMetric::ListDir, ctx, move || {
            self.storage.list_dir(ctx, volume, dir_path, count)
        })
        .await
    }

    async fn read_file(
        &self,
        ctx: &CancellationToken,
        volume: &str,
        path: &str,
        offset: u64,
        buf: &mut [u8],
        verifier: Option<&BitrotVerifier>,
    ) -> Result<usize> {
        self.guarded(StorageMetric::ReadFile, ctx, move || {
            self.storage
                .read_file(ctx, volume, path, offset, buf, verifier)
        })
        .await
    }

    async fn append_file(
        &self,
        ctx: &CancellationToken,
        volume: &str,
        path: &str,
        buf: &[u8],
    ) -> Result<()> {
        self.guarded(StorageMetric::AppendFile, ctx, move || {
            self.storage.append_file(ctx, volume, path, buf)
        })
        .await
    }

    async fn create_file(
        &self,
        ctx: &CancellationToken,
        volume: &str,
        path: &str,
        size: u64,
        reader: FileReader,
    ) -> Result<()> {
        self.guarded(StorageMetric::CreateFile, ctx, move || {
            self.storage.create_file(ctx, volume, path, size, reader)
        })
        .await
    }

    async fn read_file_stream(
        &self,
        ctx: &CancellationToken,
        volume: &str,
        path: &str,
        offset: u64,
        length: u64,
    ) -> Result<FileReader> {
        self.guarded(StorageMetric::ReadFileStream, ctx, move || {
            self.storage
                .read_file_stream(ctx, volume, path, offset, length)
        })
        .await
    }

    async fn rename_file(
        &self,
        ctx: &CancellationToken,
        src_volume: &str,
        src_path: &str,
        dst_volume: &str,
        dst_path: &str,
    ) -> Result<()> {
        self.guarded(StorageMetric::RenameFile, ctx, move || {
            self.storage
                .rename_file(ctx, src_volume, src_path, dst_volume, dst_path)
        })
        .await
    }

    async fn rename_data(
        &self,
        ctx: &CancellationToken,
        src_volume: &str,
        src_path: &str,
        data_dir: &str,
        dst_volume: &str,
        dst_path: &str,
    ) -> Result<()> {
        self.guarded(StorageMetric::RenameData, ctx, move || {
            self.storage
                .rename_data(ctx, src_volume, src_path, data_dir, dst_volume, dst_path)
        })
        .await
    }

    async fn check_parts(
        &self,
        ctx: &CancellationToken,
        volume: &str,
        path: &str,
        fi: &FileInfo,
    ) -> Result<()> {
        self.guarded(StorageMetric::CheckParts, ctx, move || {
            self.storage.check_parts(ctx, volume, path, fi)
        })
        .await
    }

    async fn check_file(&self, ctx: &CancellationToken, volume: &str, path: &str) -> Result<()> {
        self.guarded(StorageMetric::CheckFile, ctx, move || {
            self.storage.check_file(ctx, volume, path)
        })
        .await
    }

    async fn delete(
        &self,
        ctx: &CancellationToken,
        volume: &str,
        path: &str,
        recursive: bool,
    ) -> Result<()> {
        self.guarded(StorageMetric::Delete, ctx, move || {
            self.storage.delete(ctx, volume, path, recursive)
        })
        .await
    }

    async fn delete_versions(
        &self,
        ctx: &CancellationToken,
        volume: &str,
        versions: &[FileInfo],
    ) -> Vec<Result<()>> {
        let _timer = self.metrics.begin(StorageMetric::DeleteVersions);

        // One result per requested version, even when rejected up front
        if let Err(err) = self.precheck(ctx).await {
            return vec![Err(err); versions.len()];
        }
        self.storage.delete_versions(ctx, volume, versions).await
    }

    async fn verify_file(
        &self,
        ctx: &CancellationToken,
        volume: &str,
        path: &str,
        fi: &FileInfo,
    ) -> Result<()> {
        self.guarded(StorageMetric::VerifyFile, ctx, move || {
            self.storage.verify_file(ctx, volume, path, fi)
        })
        .await
    }

    async fn write_all(
        &self,
        ctx: &CancellationToken,
        volume: &str,
        path: &str,
        data: &[u8],
    ) -> Result<()> {
        self.guarded(StorageMetric::WriteAll, ctx, move || {
            self.storage.write_all(ctx, volume, path, data)
        })
        .await
    }

    async fn delete_version(
        &self,
        ctx: &CancellationToken,
        volume: &str,
        path: &str,
        fi: &FileInfo,
        force_del_marker: bool,
    ) -> Result<()> {
        self.guarded(StorageMetric::DeleteVersion, ctx, move || {
            self.storage
                .delete_version(ctx, volume, path, fi, force_del_marker)
        })
        .await
    }

    async fn write_metadata(
        &self,
        ctx: &CancellationToken,
        volume: &str,
        path: &str,
        fi: &FileInfo,
    ) -> Result<()> {
        self.guarded(StorageMetric::WriteMetadata, ctx, move || {
            self.storage.write_metadata(ctx, volume, path, fi)
        })
        .await
    }

    async fn read_version(
        &self,
        ctx: &CancellationToken,
        volume: &str,
        path: &str,
        version_id: &str,
        read_data: bool,
    ) -> Result<FileInfo> {
        self.guarded(StorageMetric::ReadVersion, ctx, move || {
            self.storage
                .read_version(ctx, volume, path, version_id, read_data)
        })
        .await
    }

    async fn read_all(
        &self,
        ctx: &CancellationToken,
        volume: &str,
        path: &str,
    ) -> Result<Vec<u8>> {
        self.guarded(StorageMetric::ReadAll, ctx, move || {
            self.storage.read_all(ctx, volume, path)
        })
        .await
    }
}
