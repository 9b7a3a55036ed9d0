//! Stale disk detection
//!
//! A disk's identity lives in its format metadata. Once the server has
//! validated a disk it binds that identity here; from then on any
//! difference between the bound value and what the disk reports means
//! the device was swapped, reformatted or remounted, and the disk must
//! be treated as gone.

use crate::api::StorageApi;
use objectio_common::{Error, Result};
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

/// Holds the identity bound to a disk and compares it with the disk's
/// current one
///
/// The guard starts unbound. Binding is publish-once: the first
/// non-empty identity wins and is immutable for the guard's lifetime.
pub struct StaleDiskGuard {
    storage: Arc<dyn StorageApi>,
    disk_id: OnceLock<String>,
}

impl StaleDiskGuard {
    pub fn new(storage: Arc<dyn StorageApi>) -> Self {
        Self {
            storage,
            disk_id: OnceLock::new(),
        }
    }

    /// Bind the disk identity.
    ///
    /// Returns `true` if the guard is now bound to `id`. An empty `id`
    /// leaves the guard unbound; an attempt to rebind to a different
    /// identity is refused.
    pub fn bind(&self, id: &str) -> bool {
        if id.is_empty() {
            return false;
        }
        let bound = self.disk_id.get_or_init(|| {
            debug!("binding disk {} to id {}", self.storage, id);
            id.to_string()
        });
        if bound != id {
            warn!(
                "refusing to rebind disk {} from id {} to {}",
                self.storage, bound, id
            );
            return false;
        }
        true
    }

    /// Bound identity, `None` while unbound
    pub fn bound(&self) -> Option<&str> {
        self.disk_id.get().map(String::as_str)
    }

    /// Identity currently persisted on the disk
    pub async fn current_identity(&self) -> Result<String> {
        self.storage.get_disk_id().await
    }

    /// Fail if the disk no longer carries the bound identity.
    ///
    /// Unbound guards always pass: the server may be coming up and
    /// reading or creating the format metadata. Errors reading the
    /// identity are returned unchanged.
    pub async fn check_stale(&self) -> Result<()> {
        let Some(expected) = self.bound() else {
            return Ok(());
        };
        let found = self.current_identity().await?;
        if found == expected {
            return Ok(());
        }
        warn!(
            "disk {} is stale: expected id {}, found {}",
            self.storage, expected, found
        );
        Err(Error::DiskStale {
            expected: expected.to_string(),
            found,
        })
    }

    /// Strict check: bound, readable, and equal. Unbound is offline.
    pub async fn is_online(&self) -> bool {
        let Some(expected) = self.bound() else {
            return false;
        };
        matches!(self.current_identity().await, Ok(found) if found == expected)
    }
}
