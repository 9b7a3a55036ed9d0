//! Storage backend capability set
//!
//! [`StorageApi`] is the contract of a single local disk: volume and file
//! primitives plus a handful of lifecycle accessors. The raw backend and
//! the [`DiskIdCheck`](crate::DiskIdCheck) proxy in front of it both
//! implement it, so callers cannot tell them apart.

use async_trait::async_trait;
use objectio_common::{
    BitrotVerifier, DataUsageCache, DiskInfo, DiskLocation, Endpoint, FileInfo, HealingTracker,
    Result, VolInfo,
};
use std::fmt;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

/// Byte stream produced by `read_file_stream` or consumed by `create_file`
pub type FileReader = Box<dyn AsyncRead + Send + Unpin>;

/// Operations supported by a local disk
///
/// Every I/O method takes the caller's cancellation token first. The
/// `Display` impl is the disk's string form (usually its endpoint).
#[async_trait]
pub trait StorageApi: fmt::Display + Send + Sync {
    // Lifecycle and metadata

    /// Whether the disk is reachable and formatted as expected
    async fn is_online(&self) -> bool;

    fn is_local(&self) -> bool;

    fn endpoint(&self) -> Endpoint;

    fn hostname(&self) -> String;

    /// Heal progress, if the disk is being healed
    fn healing(&self) -> Option<HealingTracker>;

    /// Position in the erasure layout, `None` until assigned
    fn disk_location(&self) -> Option<DiskLocation>;

    fn set_disk_location(&self, location: DiskLocation);

    fn close(&self) -> Result<()>;

    /// Identity persisted in the disk's format metadata
    async fn get_disk_id(&self) -> Result<String>;

    fn set_disk_id(&self, id: &str);

    async fn disk_info(&self, ctx: &CancellationToken) -> Result<DiskInfo>;

    async fn ns_scanner(
        &self,
        ctx: &CancellationToken,
        cache: DataUsageCache,
    ) -> Result<DataUsageCache>;

    // Volume operations

    async fn make_vol_bulk(&self, ctx: &CancellationToken, volumes: &[String]) -> Result<()>;

    async fn make_vol(&self, ctx: &CancellationToken, volume: &str) -> Result<()>;

    async fn list_vols(&self, ctx: &CancellationToken) -> Result<Vec<VolInfo>>;

    async fn stat_vol(&self, ctx: &CancellationToken, volume: &str) -> Result<VolInfo>;

    async fn delete_vol(
        &self,
        ctx: &CancellationToken,
        volume: &str,
        force_delete: bool,
    ) -> Result<()>;

    // Directory operations

    /// Walk `base_dir`, returning entry paths relative to the volume
    async fn walk_dir(
        &self,
        ctx: &CancellationToken,
        volume: &str,
        base_dir: &str,
        recursive: bool,
    ) -> Result<Vec<String>>;

    /// List at most `count` entries of `dir_path` (`None` for all)
    async fn list_dir(
        &self,
        ctx: &CancellationToken,
        volume: &str,
        dir_path: &str,
        count: Option<usize>,
    ) -> Result<Vec<String>>;

    // File operations

    /// Read into `buf` from `offset`, returning the number of bytes read
    async fn read_file(
        &self,
        ctx: &CancellationToken,
        volume: &str,
        path: &str,
        offset: u64,
        buf: &mut [u8],
        verifier: Option<&BitrotVerifier>,
    ) -> Result<usize>;

    async fn append_file(
        &self,
        ctx: &CancellationToken,
        volume: &str,
        path: &str,
        buf: &[u8],
    ) -> Result<()>;

    async fn create_file(
        &self,
        ctx: &CancellationToken,
        volume: &str,
        path: &str,
        size: u64,
        reader: FileReader,
    ) -> Result<()>;

    async fn read_file_stream(
        &self,
        ctx: &CancellationToken,
        volume: &str,
        path: &str,
        offset: u64,
        length: u64,
    ) -> Result<FileReader>;

    async fn rename_file(
        &self,
        ctx: &CancellationToken,
        src_volume: &str,
        src_path: &str,
        dst_volume: &str,
        dst_path: &str,
    ) -> Result<()>;

    /// Commit a version's data directory and metadata into place
    async fn rename_data(
        &self,
        ctx: &CancellationToken,
        src_volume: &str,
        src_path: &str,
        data_dir: &str,
        dst_volume: &str,
        dst_path: &str,
    ) -> Result<()>;

    async fn check_parts(
        &self,
        ctx: &CancellationToken,
        volume: &str,
        path: &str,
        fi: &FileInfo,
    ) -> Result<()>;

    async fn check_file(&self, ctx: &CancellationToken, volume: &str, path: &str) -> Result<()>;

    async fn delete(
        &self,
        ctx: &CancellationToken,
        volume: &str,
        path: &str,
        recursive: bool,
    ) -> Result<()>;

    /// Delete a batch of versions; always yields one result per input
    async fn delete_versions(
        &self,
        ctx: &CancellationToken,
        volume: &str,
        versions: &[FileInfo],
    ) -> Vec<Result<()>>;

    async fn verify_file(
        &self,
        ctx: &CancellationToken,
        volume: &str,
        path: &str,
        fi: &FileInfo,
    ) -> Result<()>;

    async fn write_all(
        &self,
        ctx: &CancellationToken,
        volume: &str,
        path: &str,
        data: &[u8],
    ) -> Result<()>;

    async fn delete_version(
        &self,
        ctx: &CancellationToken,
        volume: &str,
        path: &str,
        fi: &FileInfo,
        force_del_marker: bool,
    ) -> Result<()>;

    async fn write_metadata(
        &self,
        ctx: &CancellationToken,
        volume: &str,
        path: &str,
        fi: &FileInfo,
    ) -> Result<()>;

    async fn read_version(
        &self,
        ctx: &CancellationToken,
        volume: &str,
        path: &str,
        version_id: &str,
        read_data: bool,
    ) -> Result<FileInfo>;

    async fn read_all(&self, ctx: &CancellationToken, volume: &str, path: &str)
    -> Result<Vec<u8>>;
}
