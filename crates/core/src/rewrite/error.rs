//! Rewrite configuration errors.

use thiserror::Error;

/// Errors raised while building the rewrite configuration.
///
/// Rewriting itself never fails: unparseable URLs pass through unchanged.
#[derive(Debug, Error)]
pub enum RewriteError {
    /// The home URL has no scheme or host.
    #[error("invalid home URL: {0}")]
    InvalidHomeUrl(String),
}

impl RewriteError {
    /// Create an invalid home URL error.
    #[must_use]
    pub fn invalid_home_url(url: impl Into<String>) -> Self {
        Self::InvalidHomeUrl(url.into())
    }
}
