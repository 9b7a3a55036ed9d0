//! Core type definitions for ObjectIO
//!
//! Value types exchanged with a local storage backend: disk and volume
//! descriptions, file version metadata, scanner state and the per-disk
//! API metrics attached to [`DiskInfo`].

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::SystemTime;

/// Per-disk API metrics reported alongside [`DiskInfo`]
///
/// Keys are the stable operation names (`ReadFile`, `MakeVol`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskMetrics {
    /// Operation name -> formatted average latency
    pub api_latencies: BTreeMap<String, String>,
    /// Operation name -> cumulative call count
    pub api_calls: BTreeMap<String, u64>,
}

/// Disk usage and identity as reported by the backend
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiskInfo {
    pub total: u64,
    pub free: u64,
    pub used: u64,
    pub used_inodes: u64,
    pub fs_type: String,
    pub root_disk: bool,
    pub healing: bool,
    pub endpoint: String,
    pub mount_path: String,
    /// Identity persisted in the disk's format metadata
    pub id: String,
    /// Filled in by the disk check layer, never by the backend
    pub metrics: DiskMetrics,
    pub error: Option<String>,
}

/// A volume (bucket directory) on a single disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolInfo {
    pub name: String,
    pub created: SystemTime,
}

impl VolInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created: SystemTime::now(),
        }
    }
}

/// One part of a multipart object version
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectPartInfo {
    pub number: u32,
    pub size: u64,
    pub actual_size: u64,
}

/// Metadata of a single object version on disk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileInfo {
    pub volume: String,
    pub name: String,
    /// Empty for the null version
    pub version_id: String,
    pub is_latest: bool,
    /// Delete marker
    pub deleted: bool,
    /// Directory holding the version's part files
    pub data_dir: String,
    pub mod_time: Option<SystemTime>,
    pub size: u64,
    pub metadata: HashMap<String, String>,
    pub parts: Vec<ObjectPartInfo>,
    /// Inlined object data for small objects
    #[serde(skip)]
    pub data: Option<Bytes>,
}

impl FileInfo {
    pub fn new(volume: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            volume: volume.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_version(mut self, version_id: impl Into<String>) -> Self {
        self.version_id = version_id.into();
        self
    }
}

/// Bitrot protection algorithm
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BitrotAlgorithm {
    #[default]
    HighwayHash256S,
    Sha256,
    Blake2b512,
}

/// Expected checksum for a whole-file bitrot verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitrotVerifier {
    pub algorithm: BitrotAlgorithm,
    pub sum: Vec<u8>,
}

/// Usage accumulated for one prefix by the namespace scanner
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataUsageEntry {
    pub size: u64,
    pub objects: u64,
    pub versions: u64,
}

/// Namespace scanner state, threaded through successive scan cycles
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataUsageCache {
    pub name: String,
    pub next_cycle: u32,
    pub last_update: Option<SystemTime>,
    pub entries: HashMap<String, DataUsageEntry>,
}

/// Network location of a disk
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub path: String,
    pub is_local: bool,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.is_empty() {
            write!(f, "{}", self.path)
        } else {
            write!(f, "http://{}{}", self.host, self.path)
        }
    }
}

/// Position of a disk within the erasure set layout
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskLocation {
    pub pool_idx: usize,
    pub set_idx: usize,
    pub disk_idx: usize,
}

/// Progress of an ongoing heal of a freshly replaced disk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealingTracker {
    pub id: String,
    pub endpoint: String,
    pub started: Option<SystemTime>,
    pub objects_healed: u64,
    pub objects_failed: u64,
    pub bytes_done: u64,
    pub bytes_failed: u64,
    /// Bucket and object currently being healed
    pub bucket: String,
    pub object: String,
}
