//! In-memory disk used by the unit tests

use crate::api::{FileReader, StorageApi};
use async_trait::async_trait;
use objectio_common::{
    BitrotVerifier, DataUsageCache, DataUsageEntry, DiskInfo, DiskLocation, Endpoint, Error,
    FileInfo, HealingTracker, Result, VolInfo,
};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

type Volume = BTreeMap<String, Vec<u8>>;

/// Fake disk keeping volumes and files in memory
pub struct MockDisk {
    identity: Mutex<String>,
    /// Identity embedded in `disk_info`, when it should differ from the
    /// format metadata
    info_identity: Mutex<Option<String>>,
    fail_identity: AtomicBool,
    fail_io: AtomicBool,
    identity_reads: AtomicU64,
    backend_calls: AtomicU64,
    location: Mutex<Option<DiskLocation>>,
    volumes: Mutex<BTreeMap<String, Volume>>,
    versions: Mutex<BTreeMap<(String, String, String), FileInfo>>,
}

impl MockDisk {
    pub fn new(identity: &str) -> Self {
        Self {
            identity: Mutex::new(identity.to_string()),
            info_identity: Mutex::new(None),
            fail_identity: AtomicBool::new(false),
            fail_io: AtomicBool::new(false),
            identity_reads: AtomicU64::new(0),
            backend_calls: AtomicU64::new(0),
            location: Mutex::new(None),
            volumes: Mutex::new(BTreeMap::new()),
            versions: Mutex::new(BTreeMap::new()),
        }
    }

    /// Simulate a device swap
    pub fn set_identity(&self, identity: &str) {
        *self.identity.lock() = identity.to_string();
    }

    pub fn set_info_identity(&self, identity: &str) {
        *self.info_identity.lock() = Some(identity.to_string());
    }

    /// Make identity reads fail with `UnformattedDisk`
    pub fn fail_identity(&self, fail: bool) {
        self.fail_identity.store(fail, Ordering::SeqCst);
    }

    /// Make every I/O call fail with `DiskFull`
    pub fn fail_io(&self, fail: bool) {
        self.fail_io.store(fail, Ordering::SeqCst);
    }

    pub fn identity_reads(&self) -> u64 {
        self.identity_reads.load(Ordering::SeqCst)
    }

    /// Number of I/O calls that reached this disk
    pub fn backend_calls(&self) -> u64 {
        self.backend_calls.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Result<()> {
        self.backend_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_io.load(Ordering::SeqCst) {
            return Err(Error::DiskFull);
        }
        Ok(())
    }

    fn file(&self, volume: &str, path: &str) -> Result<Vec<u8>> {
        self.volumes
            .lock()
            .get(volume)
            .ok_or_else(|| Error::VolumeNotFound(volume.to_string()))?
            .get(path)
            .cloned()
            .ok_or_else(|| Error::FileNotFound {
                volume: volume.to_string(),
                path: path.to_string(),
            })
    }

    fn put(&self, volume: &str, path: &str, data: Vec<u8>, append: bool) -> Result<()> {
        let mut volumes = self.volumes.lock();
        let vol = volumes
            .get_mut(volume)
            .ok_or_else(|| Error::VolumeNotFound(volume.to_string()))?;
        if append {
            vol.entry(path.to_string()).or_default().extend(data);
        } else {
            vol.insert(path.to_string(), data);
        }
        Ok(())
    }

    fn entries(&self, volume: &str, dir: &str, recursive: bool) -> Result<Vec<String>> {
        let volumes = self.volumes.lock();
        let vol = volumes
            .get(volume)
            .ok_or_else(|| Error::VolumeNotFound(volume.to_string()))?;
        let prefix = if dir.is_empty() || dir.ends_with('/') {
            dir.to_string()
        } else {
            format!("{dir}/")
        };
        let mut out: Vec<String> = Vec::new();
        for key in vol.keys().filter(|k| k.starts_with(&prefix)) {
            let rest = &key[prefix.len()..];
            let entry = match rest.find('/') {
                Some(i) if !recursive => format!("{}/", &rest[..i]),
                _ => rest.to_string(),
            };
            if out.last() != Some(&entry) {
                out.push(entry);
            }
        }
        Ok(out)
    }
}

impl fmt::Display for MockDisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/mock/{}", self.identity.lock())
    }
}

#[async_trait]
impl StorageApi for MockDisk {
    async fn is_online(&self) -> bool {
        !self.fail_identity.load(Ordering::SeqCst)
    }

    fn is_local(&self) -> bool {
        true
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint {
            host: String::new(),
            path: "/mock".to_string(),
            is_local: true,
        }
    }

    fn hostname(&self) -> String {
        "mock-host".to_string()
    }

    fn healing(&self) -> Option<HealingTracker> {
        None
    }

    fn disk_location(&self) -> Option<DiskLocation> {
        *self.location.lock()
    }

    fn set_disk_location(&self, location: DiskLocation) {
        *self.location.lock() = Some(location);
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }

    async fn get_disk_id(&self) -> Result<String> {
        self.identity_reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_identity.load(Ordering::SeqCst) {
            return Err(Error::UnformattedDisk);
        }
        Ok(self.identity.lock().clone())
    }

    fn set_disk_id(&self, _id: &str) {}

    async fn disk_info(&self, _ctx: &CancellationToken) -> Result<DiskInfo> {
        self.enter()?;
        let id = self
            .info_identity
            .lock()
            .clone()
            .unwrap_or_else(|| self.identity.lock().clone());
        Ok(DiskInfo {
            total: 1 << 30,
            free: 1 << 29,
            used: 1 << 29,
            fs_type: "xfs".to_string(),
            endpoint: "/mock".to_string(),
            mount_path: "/mock".to_string(),
            id,
            ..DiskInfo::default()
        })
    }

    async fn ns_scanner(
        &self,
        _ctx: &CancellationToken,
        mut cache: DataUsageCache,
    ) -> Result<DataUsageCache> {
        self.enter()?;
        for (name, vol) in self.volumes.lock().iter() {
            let entry = cache.entries.entry(name.clone()).or_insert_with(DataUsageEntry::default);
            entry.objects = vol.len() as u64;
            entry.size = vol.values().map(|d| d.len() as u64).sum();
        }
        cache.next_cycle += 1;
        Ok(cache)
    }

    async fn make_vol_bulk(&self, ctx: &CancellationToken, volumes: &[String]) -> Result<()> {
        for volume in volumes {
            self.make_vol(ctx, volume).await?;
        }
        Ok(())
    }

    async fn make_vol(&self, _ctx: &CancellationToken, volume: &str) -> Result<()> {
        self.enter()?;
        let mut volumes = self.volumes.lock();
        if volumes.contains_key(volume) {
            return Err(Error::VolumeExists(volume.to_string()));
        }
        volumes.insert(volume.to_string(), Volume::new());
        Ok(())
    }

    async fn list_vols(&self, _ctx: &CancellationToken) -> Result<Vec<VolInfo>> {
        self.enter()?;
        Ok(self.volumes.lock().keys().map(VolInfo::new).collect())
    }

    async fn stat_vol(&self, _ctx: &CancellationToken, volume: &str) -> Result<VolInfo> {
        self.enter()?;
        if self.volumes.lock().contains_key(volume) {
            Ok(VolInfo::new(volume))
        } else {
            Err(Error::VolumeNotFound(volume.to_string()))
        }
    }

    async fn delete_vol(
        &self,
        _ctx: &CancellationToken,
        volume: &str,
        force_delete: bool,
    ) -> Result<()> {
        self.enter()?;
        let mut volumes = self.volumes.lock();
        match volumes.get(volume) {
            None => Err(Error::VolumeNotFound(volume.to_string())),
            Some(vol) if !vol.is_empty() && !force_delete => {
                Err(Error::VolumeNotEmpty(volume.to_string()))
            }
            Some(_) => {
                volumes.remove(volume);
                Ok(())
            }
        }
    }

    async fn walk_dir(
        &self,
        _ctx: &CancellationToken,
        volume: &str,
        base_dir: &str,
        recursive: bool,
    ) -> Result<Vec<String>> {
        self.enter()?;
        self.entries(volume, base_dir, recursive)
    }

    async fn list_dir(
        &self,
        _ctx: &CancellationToken,
        volume: &str,
        dir_path: &str,
        count: Option<usize>,
    ) -> Result<Vec<String>> {
        self.enter()?;
        let mut entries = self.entries(volume, dir_path, false)?;
        if let Some(count) = count {
            entries.truncate(count);
        }
        Ok(entries)
    }

    async fn read_file(
        &self,
        _ctx: &CancellationToken,
        volume: &str,
        path: &str,
        offset: u64,
        buf: &mut [u8],
        _verifier: Option<&BitrotVerifier>,
    ) -> Result<usize> {
        self.enter()?;
        let data = self.file(volume, path)?;
        let start = usize::try_from(offset)
            .map_err(|_| Error::invalid_argument("offset"))?
            .min(data.len());
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        Ok(n)
    }

    async fn append_file(
        &self,
        _ctx: &CancellationToken,
        volume: &str,
        path: &str,
        buf: &[u8],
    ) -> Result<()> {
        self.enter()?;
        self.put(volume, path, buf.to_vec(), true)
    }

    async fn create_file(
        &self,
        _ctx: &CancellationToken,
        volume: &str,
        path: &str,
        size: u64,
        mut reader: FileReader,
    ) -> Result<()> {
        self.enter()?;
        let mut data = Vec::new();
        reader.read_to_end(&mut data).await?;
        if data.len() as u64 != size {
            return Err(Error::invalid_argument(format!(
                "expected {size} bytes, got {}",
                data.len()
            )));
        }
        self.put(volume, path, data, false)
    }

    async fn read_file_stream(
        &self,
        _ctx: &CancellationToken,
        volume: &str,
        path: &str,
        offset: u64,
        length: u64,
    ) -> Result<FileReader> {
        self.enter()?;
        let data = self.file(volume, path)?;
        let start = (offset as usize).min(data.len());
        let end = (start + length as usize).min(data.len());
        Ok(Box::new(std::io::Cursor::new(data[start..end].to_vec())))
    }

    async fn rename_file(
        &self,
        _ctx: &CancellationToken,
        src_volume: &str,
        src_path: &str,
        dst_volume: &str,
        dst_path: &str,
    ) -> Result<()> {
        self.enter()?;
        let data = self.file(src_volume, src_path)?;
        self.put(dst_volume, dst_path, data, false)?;
        if let Some(vol) = self.volumes.lock().get_mut(src_volume) {
            vol.remove(src_path);
        }
        Ok(())
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
        let src = format!("{src_path}/{data_dir}");
        let dst = format!("{dst_path}/{data_dir}");
        self.rename_file(ctx, src_volume, &src, dst_volume, &dst).await
    }

    async fn check_parts(
        &self,
        _ctx: &CancellationToken,
        volume: &str,
        path: &str,
        fi: &FileInfo,
    ) -> Result<()> {
        self.enter()?;
        for part in &fi.parts {
            let name = format!("{path}/{}/part.{}", fi.data_dir, part.number);
            let data = self.file(volume, &name)?;
            if data.len() as u64 != part.size {
                return Err(Error::FileCorrupt(name));
            }
        }
        Ok(())
    }

    async fn check_file(&self, _ctx: &CancellationToken, volume: &str, path: &str) -> Result<()> {
        self.enter()?;
        self.file(volume, path).map(|_| ())
    }

    async fn delete(
        &self,
        _ctx: &CancellationToken,
        volume: &str,
        path: &str,
        recursive: bool,
    ) -> Result<()> {
        self.enter()?;
        let mut volumes = self.volumes.lock();
        let vol = volumes
            .get_mut(volume)
            .ok_or_else(|| Error::VolumeNotFound(volume.to_string()))?;
        if recursive {
            let prefix = format!("{path}/");
            vol.retain(|k, _| k != path && !k.starts_with(&prefix));
            return Ok(());
        }
        vol.remove(path).map(|_| ()).ok_or_else(|| Error::FileNotFound {
            volume: volume.to_string(),
            path: path.to_string(),
        })
    }

    async fn delete_versions(
        &self,
        ctx: &CancellationToken,
        volume: &str,
        versions: &[FileInfo],
    ) -> Vec<Result<()>> {
        let mut results = Vec::with_capacity(versions.len());
        for fi in versions {
            results.push(self.delete_version(ctx, volume, &fi.name, fi, false).await);
        }
        results
    }

    async fn verify_file(
        &self,
        ctx: &CancellationToken,
        volume: &str,
        path: &str,
        fi: &FileInfo,
    ) -> Result<()> {
        self.check_parts(ctx, volume, path, fi).await
    }

    async fn write_all(
        &self,
        _ctx: &CancellationToken,
        volume: &str,
        path: &str,
        data: &[u8],
    ) -> Result<()> {
        self.enter()?;
        self.put(volume, path, data.to_vec(), false)
    }

    async fn delete_version(
        &self,
        _ctx: &CancellationToken,
        volume: &str,
        path: &str,
        fi: &FileInfo,
        _force_del_marker: bool,
    ) -> Result<()> {
        self.enter()?;
        let key = (volume.to_string(), path.to_string(), fi.version_id.clone());
        self.versions
            .lock()
            .remove(&key)
            .map(|_| ())
            .ok_or_else(|| Error::FileVersionNotFound {
                volume: volume.to_string(),
                path: path.to_string(),
                version_id: fi.version_id.clone(),
            })
    }

    async fn write_metadata(
        &self,
        _ctx: &CancellationToken,
        volume: &str,
        path: &str,
        fi: &FileInfo,
    ) -> Result<()> {
        self.enter()?;
        if !self.volumes.lock().contains_key(volume) {
            return Err(Error::VolumeNotFound(volume.to_string()));
        }
        let key = (volume.to_string(), path.to_string(), fi.version_id.clone());
        self.versions.lock().insert(key, fi.clone());
        Ok(())
    }

    async fn read_version(
        &self,
        _ctx: &CancellationToken,
        volume: &str,
        path: &str,
        version_id: &str,
        read_data: bool,
    ) -> Result<FileInfo> {
        self.enter()?;
        let key = (volume.to_string(), path.to_string(), version_id.to_string());
        let mut fi = self.versions.lock().get(&key).cloned().ok_or_else(|| {
            Error::FileVersionNotFound {
                volume: volume.to_string(),
                path: path.to_string(),
                version_id: version_id.to_string(),
            }
        })?;
        if !read_data {
            fi.data = None;
        }
        Ok(fi)
    }

    async fn read_all(
        &self,
        _ctx: &CancellationToken,
        volume: &str,
        path: &str,
    ) -> Result<Vec<u8>> {
        self.enter()?;
        self.file(volume, path)
    }
}
