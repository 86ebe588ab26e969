//! Media offload service.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use wharf_shared::{SiteConfig, StorageSettings};

use super::error::OffloadError;
use super::fingerprint::{is_edited, purge_prefix};
use super::types::{
    AttachmentMetadata, MetadataContext, PurgeReport, SizeVariant, UploadResult, UploadedFile,
};
use super::uploads::{UploadDir, tenant_basedir};
use crate::rewrite::RewriteEngine;
use crate::storage::ObjectStore;
use crate::tenant::RequestContext;

/// Local paths and retry policy of the offloader.
#[derive(Debug, Clone)]
pub struct OffloadSettings {
    /// Local uploads root of the main tenant.
    pub uploads_root: PathBuf,
    /// Public URL of the content directory.
    pub content_url: String,
    /// Readability checks before giving up on a file.
    pub max_retries: u32,
    /// Delay between readability checks.
    pub retry_interval: Duration,
}

impl OffloadSettings {
    /// Default number of readability checks.
    pub const DEFAULT_MAX_RETRIES: u32 = 10;
    /// Default delay between readability checks.
    pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(100);

    /// Create settings with the default retry policy.
    #[must_use]
    pub fn new(uploads_root: impl Into<PathBuf>, content_url: impl Into<String>) -> Self {
        Self {
            uploads_root: uploads_root.into(),
            content_url: content_url.into(),
            max_retries: Self::DEFAULT_MAX_RETRIES,
            retry_interval: Self::DEFAULT_RETRY_INTERVAL,
        }
    }

    /// Set the retry policy.
    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, interval: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_interval = interval;
        self
    }

    /// Build from application settings.
    #[must_use]
    pub fn from_settings(site: &SiteConfig, storage: &StorageSettings) -> Self {
        Self::new(&site.uploads_root, site.content_url()).with_retry(
            storage
                .upload_retries
                .unwrap_or(Self::DEFAULT_MAX_RETRIES),
            storage
                .upload_retry_interval_ms
                .map_or(Self::DEFAULT_RETRY_INTERVAL, Duration::from_millis),
        )
    }
}

/// Copies tenant media to the object store and keeps it in step with edits
/// and deletes.
///
/// Without a store every operation is a pass-through; the missing
/// configuration is logged once.
pub struct MediaOffloader<S: ObjectStore> {
    store: Option<Arc<S>>,
    settings: OffloadSettings,
    warned_missing: AtomicBool,
}

impl<S: ObjectStore> MediaOffloader<S> {
    /// Create an offloader. `store` is `None` when credentials are missing.
    #[must_use]
    pub fn new(store: Option<Arc<S>>, settings: OffloadSettings) -> Self {
        Self {
            store,
            settings,
            warned_missing: AtomicBool::new(false),
        }
    }

    /// Returns true when a store is configured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// The offloader settings.
    #[must_use]
    pub const fn settings(&self) -> &OffloadSettings {
        &self.settings
    }

    fn store(&self) -> Option<&S> {
        if self.store.is_none() && !self.warned_missing.swap(true, Ordering::Relaxed) {
            tracing::warn!("{}, skipping offload", OffloadError::ConfigurationMissing);
        }
        self.store.as_deref()
    }

    /// The tenant's uploads directory for the current month, with its URLs
    /// passed through the rewrite engine.
    pub fn upload_dir(&self, engine: &mut RewriteEngine<'_>) -> UploadDir {
        UploadDir::for_tenant(
            &self.settings.uploads_root,
            &self.settings.content_url,
            engine.context().tenant(),
            Utc::now(),
        )
        .rewritten(engine)
    }

    /// Returns true when `path` lies below the uploads root without `..`
    /// segments.
    #[must_use]
    pub fn is_within_uploads(&self, path: &Path) -> bool {
        path.strip_prefix(&self.settings.uploads_root)
            .is_ok_and(|rest| rest.components().all(|c| matches!(c, Component::Normal(_))))
    }

    /// Object key of a local file: the tenant prefix followed by the path
    /// relative to the tenant uploads directory.
    #[must_use]
    pub fn object_key(&self, ctx: &RequestContext, local_path: &Path) -> String {
        let tenant = ctx.tenant();
        let basedir = tenant_basedir(&self.settings.uploads_root, tenant);
        let relative = local_path.strip_prefix(&basedir).unwrap_or(local_path);

        let parts: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();

        format!("{}/{}", tenant.upload_prefix(), parts.join("/"))
    }

    /// Uploads one local file.
    ///
    /// Waits for the file to become readable first. Failures are logged and
    /// yield `None`; the local file is left in place.
    pub async fn upload(
        &self,
        ctx: &RequestContext,
        local_path: &Path,
        content_type: Option<&str>,
    ) -> Option<UploadResult> {
        let store = self.store()?;
        match self.try_upload(store, ctx, local_path, content_type).await {
            Ok(result) => {
                tracing::info!(
                    key = %result.key,
                    url = %result.remote_url,
                    size = %human_readable_size(result.byte_size),
                    "uploaded media"
                );
                Some(result)
            }
            Err(e) => {
                tracing::error!(path = %local_path.display(), error = %e, "media upload failed");
                None
            }
        }
    }

    async fn try_upload(
        &self,
        store: &S,
        ctx: &RequestContext,
        local_path: &Path,
        content_type: Option<&str>,
    ) -> Result<UploadResult, OffloadError> {
        if !self.wait_until_readable(local_path).await {
            return Err(OffloadError::not_readable(local_path));
        }

        let key = self.object_key(ctx, local_path);
        let byte_size = store.put_file(&key, local_path, content_type).await?;

        Ok(UploadResult {
            remote_url: store.object_url(&key),
            key,
            byte_size,
        })
    }

    /// Checks readability up to `max_retries` times, sleeping in between.
    async fn wait_until_readable(&self, path: &Path) -> bool {
        for attempt in 0..self.settings.max_retries {
            if tokio::fs::File::open(path).await.is_ok() {
                return true;
            }
            if attempt + 1 < self.settings.max_retries {
                tokio::time::sleep(self.settings.retry_interval).await;
            }
        }
        false
    }

    /// Post-upload event: offloads the new file and points its URL at the
    /// store. The local copy is kept for thumbnail generation.
    pub async fn handle_upload(&self, ctx: &RequestContext, mut file: UploadedFile) -> UploadedFile {
        if let Some(result) = self
            .upload(ctx, &file.file, file.mime_type.as_deref())
            .await
        {
            file.url = result.remote_url;
        }
        file
    }

    /// Metadata-generated event: offloads every size variant once.
    ///
    /// Only runs for [`MetadataContext::Create`].
    pub async fn offload_metadata(
        &self,
        ctx: &RequestContext,
        mut metadata: AttachmentMetadata,
        attached_file: &Path,
        context: MetadataContext,
    ) -> AttachmentMetadata {
        if self.store().is_none() {
            return metadata;
        }
        if context != MetadataContext::Create {
            tracing::debug!(?context, file = %metadata.file, "not a create context, skipping size offload");
            return metadata;
        }

        let base_dir = parent_dir(attached_file);
        self.offload_sizes(ctx, &mut metadata.sizes, &base_dir).await;
        metadata
    }

    /// Metadata-updated event: after an image edit, offloads the edited main
    /// file and its sizes.
    pub async fn update_metadata(
        &self,
        ctx: &RequestContext,
        mut metadata: AttachmentMetadata,
        attached_file: &Path,
    ) -> AttachmentMetadata {
        if self.store().is_none() || metadata.sizes.is_empty() || !is_edited(&metadata.file) {
            return metadata;
        }

        let base_dir = parent_dir(attached_file);
        let main_name = metadata
            .file
            .rsplit('/')
            .next()
            .unwrap_or(&metadata.file)
            .to_string();
        let main_local = base_dir.join(&main_name);

        if let Some(result) = self.upload(ctx, &main_local, None).await {
            metadata.url = Some(result.remote_url);
            remove_local(&main_local).await;
        }

        self.offload_sizes(ctx, &mut metadata.sizes, &base_dir).await;
        metadata
    }

    /// Image-editor-save event: offloads the file the editor wrote and
    /// removes the local copy once stored.
    pub async fn offload_edited_image(
        &self,
        ctx: &RequestContext,
        local_file: &Path,
        mime_type: Option<&str>,
    ) -> Option<UploadResult> {
        let result = self.upload(ctx, local_file, mime_type).await?;
        remove_local(local_file).await;
        Some(result)
    }

    /// Attachment-deleted event: purges every version and delete marker of
    /// the main file, its sizes and their edits, in a single batched delete.
    pub async fn delete(
        &self,
        ctx: &RequestContext,
        metadata: &AttachmentMetadata,
    ) -> Option<PurgeReport> {
        let store = self.store()?;
        if metadata.file.is_empty() {
            tracing::warn!("attachment has no file, nothing to purge");
            return None;
        }

        let upload_prefix = ctx.tenant().upload_prefix();
        let date_dir = metadata.file.rsplit_once('/').map(|(dir, _)| dir);

        let mut prefixes = vec![purge_prefix(&upload_prefix, &metadata.file)];
        for size in metadata.sizes.values() {
            let file = match date_dir {
                Some(dir) => format!("{dir}/{}", size.file),
                None => size.file.clone(),
            };
            let prefix = purge_prefix(&upload_prefix, &file);
            if !prefixes.contains(&prefix) {
                prefixes.push(prefix);
            }
        }

        let mut seen = BTreeSet::new();
        let mut versions = Vec::new();
        for prefix in &prefixes {
            match store.list_object_versions(prefix).await {
                Ok(found) => versions.extend(
                    found
                        .into_iter()
                        .filter(|v| seen.insert((v.key.clone(), v.version_id.clone()))),
                ),
                Err(e) => tracing::error!(prefix = %prefix, error = %e, "failed to list object versions"),
            }
        }

        let deleted = versions.len();
        if deleted > 0 {
            if let Err(e) = store.delete_object_versions(versions).await {
                tracing::error!(file = %metadata.file, error = %e, "failed to purge object versions");
                return None;
            }
        }

        tracing::info!(
            file = %metadata.file,
            thumbnails = metadata.sizes.len(),
            deleted,
            "purged all versions"
        );
        Some(PurgeReport { prefixes, deleted })
    }

    /// Uploads each distinct size file once and shares its URL between
    /// sizes with the same file name.
    async fn offload_sizes(
        &self,
        ctx: &RequestContext,
        sizes: &mut BTreeMap<String, SizeVariant>,
        base_dir: &Path,
    ) {
        let mut uploaded: BTreeMap<String, String> = BTreeMap::new();

        for size in sizes.values_mut() {
            if let Some(url) = uploaded.get(&size.file) {
                size.url = Some(url.clone());
                continue;
            }

            let local = base_dir.join(&size.file);
            if let Some(result) = self.upload(ctx, &local, size.mime_type.as_deref()).await {
                size.url = Some(result.remote_url.clone());
                uploaded.insert(size.file.clone(), result.remote_url);
                remove_local(&local).await;
            }
        }
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

async fn remove_local(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!(path = %path.display(), error = %e, "failed to remove local copy");
    }
}

/// Formats a byte count with two decimals, e.g. `1.50 KB`.
///
/// The unit is chosen by the number of decimal digits, so 1000 bytes print
/// as `0.98 KB`.
#[must_use]
pub fn human_readable_size(bytes: u64) -> String {
    const UNITS: [&str; 7] = ["B", "KB", "MB", "GB", "TB", "PB", "EB"];

    let digits = usize::try_from(bytes.checked_ilog10().unwrap_or(0)).unwrap_or(0) + 1;
    let factor = ((digits - 1) / 3).min(UNITS.len() - 1);
    let divisor = 1024u128.pow(u32::try_from(factor).unwrap_or(0));
    let hundredths = (u128::from(bytes) * 100 + divisor / 2) / divisor;

    format!("{}.{:02} {}", hundredths / 100, hundredths % 100, UNITS[factor])
}
