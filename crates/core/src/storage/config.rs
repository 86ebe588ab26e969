//! Storage configuration types.

use wharf_shared::StorageSettings;

use super::error::StorageError;

/// Connection settings for the S3-compatible store.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Endpoint URL, without trailing slash.
    pub endpoint: String,
    /// Bucket name.
    pub bucket: String,
    /// Access key id.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: String,
    /// Signing region.
    pub region: String,
    /// Whether the store accepts the client's default checksum headers.
    pub checksums: bool,
}

impl StorageConfig {
    /// Region used when none is configured.
    pub const DEFAULT_REGION: &'static str = "us-west-000";

    /// Create a config with the default region and checksums disabled.
    #[must_use]
    pub fn new(
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            bucket: bucket.into(),
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            region: Self::DEFAULT_REGION.to_string(),
            checksums: false,
        }
    }

    /// Set the signing region.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Enable or disable the client's default checksum headers.
    #[must_use]
    pub fn with_checksums(mut self, checksums: bool) -> Self {
        self.checksums = checksums;
        self
    }

    /// Build from application settings.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the endpoint, bucket, key or
    /// secret is missing.
    pub fn from_settings(settings: &StorageSettings) -> Result<Self, StorageError> {
        let missing: Vec<&str> = [
            ("endpoint", &settings.endpoint),
            ("bucket", &settings.bucket),
            ("access_key", &settings.access_key),
            ("secret_key", &settings.secret_key),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(StorageError::configuration(format!(
                "missing storage settings: {}",
                missing.join(", ")
            )));
        }

        let config = Self::new(
            settings.endpoint.trim(),
            settings.bucket.trim(),
            settings.access_key.trim(),
            settings.secret_key.trim(),
        )
        .with_checksums(settings.checksums);

        Ok(match settings.region.as_deref().map(str::trim) {
            Some(region) if !region.is_empty() => config.with_region(region),
            _ => config,
        })
    }

    /// Public URL of an object: `{endpoint}/{bucket}/{key}`.
    #[must_use]
    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket, key.trim_start_matches('/'))
    }
}
