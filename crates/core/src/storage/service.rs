//! Object store abstraction and its OpenDAL S3 implementation.

use std::path::Path;

use opendal::layers::HttpClientLayer;
use opendal::raw::{HttpClient, OpDelete};
use opendal::{Operator, Writer, services};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use super::compat::CompatFetcher;
use super::config::StorageConfig;
use super::error::StorageError;

/// One version (or delete marker) of an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectVersion {
    /// Object key.
    pub key: String,
    /// Version id, when the store is versioned.
    pub version_id: Option<String>,
    /// True for delete markers.
    pub delete_marker: bool,
}

/// Operations the media offloader needs from an object store.
pub trait ObjectStore: Send + Sync {
    /// Streams the file at `local_path` to `key` and returns the number of
    /// bytes written.
    fn put_file(
        &self,
        key: &str,
        local_path: &Path,
        content_type: Option<&str>,
    ) -> impl std::future::Future<Output = Result<u64, StorageError>> + Send;

    /// Lists every version and delete marker whose key starts with `prefix`.
    fn list_object_versions(
        &self,
        prefix: &str,
    ) -> impl std::future::Future<Output = Result<Vec<ObjectVersion>, StorageError>> + Send;

    /// Deletes the given versions in as few requests as the store allows.
    fn delete_object_versions(
        &self,
        versions: Vec<ObjectVersion>,
    ) -> impl std::future::Future<Output = Result<(), StorageError>> + Send;

    /// Public URL of `key`.
    fn object_url(&self, key: &str) -> String;
}

/// Bytes read from disk per write call.
const READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Part size once an upload turns multipart.
const UPLOAD_CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// S3-compatible object store.
pub struct S3ObjectStore {
    operator: Operator,
    config: StorageConfig,
}

impl S3ObjectStore {
    /// Create a store from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the operator cannot be built.
    pub fn from_config(config: StorageConfig) -> Result<Self, StorageError> {
        let operator = Self::create_operator(&config)?;
        Ok(Self { operator, config })
    }

    fn create_operator(config: &StorageConfig) -> Result<Operator, StorageError> {
        let builder = services::S3::default()
            .endpoint(&config.endpoint)
            .bucket(&config.bucket)
            .access_key_id(&config.access_key_id)
            .secret_access_key(&config.secret_access_key)
            .region(&config.region)
            .enable_versioning(true);

        let client = HttpClient::new().map_err(|e| StorageError::configuration(e.to_string()))?;
        let fetcher = CompatFetcher::new(client, config);

        Ok(Operator::new(builder)
            .map_err(|e| StorageError::configuration(e.to_string()))?
            .layer(HttpClientLayer::new(HttpClient::with(fetcher)))
            .finish())
    }

    /// The bucket name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }
}

impl ObjectStore for S3ObjectStore {
    async fn put_file(
        &self,
        key: &str,
        local_path: &Path,
        content_type: Option<&str>,
    ) -> Result<u64, StorageError> {
        let mut file = File::open(local_path).await?;
        let mut write = self.operator.writer_with(key).chunk(UPLOAD_CHUNK_SIZE);
        if let Some(content_type) = content_type {
            write = write.content_type(content_type);
        }
        let mut writer = write.await?;

        match copy_to_writer(&mut file, &mut writer).await {
            Ok(size) => {
                writer.close().await?;
                Ok(size)
            }
            Err(e) => {
                if let Err(abort) = writer.abort().await {
                    tracing::warn!(key, error = %abort, "failed to abort partial upload");
                }
                Err(e)
            }
        }
    }

    async fn list_object_versions(&self, prefix: &str) -> Result<Vec<ObjectVersion>, StorageError> {
        let entries = self
            .operator
            .list_with(prefix)
            .recursive(true)
            .versions(true)
            .deleted(true)
            .await?;

        Ok(entries
            .into_iter()
            .filter(|entry| entry.path().starts_with(prefix))
            .map(|entry| {
                let meta = entry.metadata();
                ObjectVersion {
                    key: entry.path().to_string(),
                    version_id: meta.version().map(str::to_string),
                    delete_marker: meta.is_deleted(),
                }
            })
            .collect())
    }

    async fn delete_object_versions(&self, versions: Vec<ObjectVersion>) -> Result<(), StorageError> {
        if versions.is_empty() {
            return Ok(());
        }
        let inputs = versions.into_iter().map(|v| {
            let args = match v.version_id.as_deref() {
                Some(id) => OpDelete::new().with_version(id),
                None => OpDelete::new(),
            };
            (v.key, args)
        });
        self.operator.delete_iter(inputs).await?;
        Ok(())
    }

    fn object_url(&self, key: &str) -> String {
        self.config.object_url(key)
    }
}

/// Copies `file` into `writer` one buffer at a time.
async fn copy_to_writer(file: &mut File, writer: &mut Writer) -> Result<u64, StorageError> {
    let mut buf = vec![0_u8; READ_BUFFER_SIZE];
    let mut total: u64 = 0;
    loop {
        let read = file.read(&mut buf).await?;
        if read == 0 {
            return Ok(total);
        }
        writer.write(buf[..read].to_vec()).await?;
        total += u64::try_from(read).unwrap_or(u64::MAX);
    }
}
