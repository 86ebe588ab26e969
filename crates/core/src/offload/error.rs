//! Offload error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::storage::StorageError;

/// Media offload errors.
///
/// None of these reach the caller of an offload operation: they are logged
/// and turned into a pass-through.
#[derive(Debug, Error)]
pub enum OffloadError {
    /// Store endpoint or credentials are not configured.
    #[error("object store credentials are not configured")]
    ConfigurationMissing,

    /// The local file never became readable.
    #[error("timed out waiting for {path} to become readable")]
    NotReadable {
        /// Local path.
        path: PathBuf,
    },

    /// The store rejected the request.
    #[error(transparent)]
    RemoteStore(#[from] StorageError),
}

impl OffloadError {
    /// Create a not readable error.
    #[must_use]
    pub fn not_readable(path: impl Into<PathBuf>) -> Self {
        Self::NotReadable { path: path.into() }
    }
}
