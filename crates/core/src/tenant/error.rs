//! Tenant resolution error types.

use thiserror::Error;

/// Tenant resolution errors.
#[derive(Debug, Error)]
pub enum TenantError {
    /// The configured home URL has no usable host.
    #[error("invalid home URL: {0}")]
    InvalidHomeUrl(String),

    /// The tenant directory could not be queried.
    #[error("tenant directory lookup failed: {0}")]
    Directory(String),
}

impl TenantError {
    /// Create a directory error.
    #[must_use]
    pub fn directory(msg: impl Into<String>) -> Self {
        Self::Directory(msg.into())
    }
}
