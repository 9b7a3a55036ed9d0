//! Error types for ObjectIO
//!
//! This module defines the common error types returned by storage
//! backends and by the disk identity check layer in front of them.

use std::sync::Arc;
use thiserror::Error;

/// Common result type for ObjectIO operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for ObjectIO
///
/// Errors are `Clone` so a single rejection can be fanned out across a
/// batch (see `delete_versions`). I/O errors are shared behind an `Arc`.
#[derive(Debug, Clone, Error)]
pub enum Error {
    // Request lifecycle
    #[error("operation cancelled")]
    Cancelled,

    // Disk identity errors
    #[error("disk changed underneath: expected id {expected}, found {found}")]
    DiskStale { expected: String, found: String },

    #[error("disk not found: {0}")]
    DiskNotFound(String),

    #[error("disk is not formatted")]
    UnformattedDisk,

    // Storage errors
    #[error("disk I/O error: {0}")]
    DiskIo(#[source] Arc<std::io::Error>),

    #[error("disk is full")]
    DiskFull,

    #[error("volume not found: {0}")]
    VolumeNotFound(String),

    #[error("volume already exists: {0}")]
    VolumeExists(String),

    #[error("volume not empty: {0}")]
    VolumeNotEmpty(String),

    #[error("file not found: {volume}/{path}")]
    FileNotFound { volume: String, path: String },

    #[error("file version not found: {volume}/{path} ({version_id})")]
    FileVersionNotFound {
        volume: String,
        path: String,
        version_id: String,
    },

    #[error("file is corrupted: {0}")]
    FileCorrupt(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // Internal errors
    #[error("internal error: {0}")]
    Internal(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::DiskIo(Arc::new(err))
    }
}

impl Error {
    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Check if the caller's cancellation signal caused this error
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Check if this error means the disk should be treated as offline
    #[must_use]
    pub const fn is_disk_offline(&self) -> bool {
        matches!(
            self,
            Self::DiskStale { .. } | Self::DiskNotFound(_) | Self::UnformattedDisk
        )
    }

    /// Check if this is a not found error
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::DiskNotFound(_)
                | Self::VolumeNotFound(_)
                | Self::FileNotFound { .. }
                | Self::FileVersionNotFound { .. }
        )
    }
}
