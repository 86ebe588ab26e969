//! Tests for the media offloader against an in-memory versioned store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;

use super::*;
use crate::storage::{ObjectStore, ObjectVersion, StorageError};
use crate::tenant::{CookieDomain, RequestContext, Tenant};

/// Versioned store double: every put adds a version.
#[derive(Default)]
struct MemoryStore {
    versions: Mutex<Vec<ObjectVersion>>,
    puts: Mutex<Vec<String>>,
    delete_calls: AtomicUsize,
    fail_puts: bool,
}

impl MemoryStore {
    fn failing() -> Self {
        Self {
            fail_puts: true,
            ..Self::default()
        }
    }

    fn seed(&self, key: &str, version: &str, delete_marker: bool) {
        self.versions.lock().expect("lock").push(ObjectVersion {
            key: key.to_string(),
            version_id: Some(version.to_string()),
            delete_marker,
        });
    }

    fn puts(&self) -> Vec<String> {
        self.puts.lock().expect("lock").clone()
    }

    fn keys(&self) -> Vec<String> {
        self.versions
            .lock()
            .expect("lock")
            .iter()
            .map(|v| v.key.clone())
            .collect()
    }
}

impl ObjectStore for MemoryStore {
    async fn put_file(
        &self,
        key: &str,
        local_path: &Path,
        _content_type: Option<&str>,
    ) -> Result<u64, StorageError> {
        let size = tokio::fs::metadata(local_path).await?.len();
        if self.fail_puts {
            return Err(StorageError::operation("connection reset"));
        }
        self.puts.lock().expect("lock").push(key.to_string());
        let mut versions = self.versions.lock().expect("lock");
        let version = format!("v{}", versions.len() + 1);
        versions.push(ObjectVersion {
            key: key.to_string(),
            version_id: Some(version),
            delete_marker: false,
        });
        Ok(size)
    }

    async fn list_object_versions(&self, prefix: &str) -> Result<Vec<ObjectVersion>, StorageError> {
        Ok(self
            .versions
            .lock()
            .expect("lock")
            .iter()
            .filter(|v| v.key.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn delete_object_versions(&self, targets: Vec<ObjectVersion>) -> Result<(), StorageError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.versions
            .lock()
            .expect("lock")
            .retain(|v| !targets.contains(v));
        Ok(())
    }

    fn object_url(&self, key: &str) -> String {
        format!("https://store.example.com/assets/{key}")
    }
}

struct Fixture {
    root: TempDir,
    store: Arc<MemoryStore>,
    offloader: MediaOffloader<MemoryStore>,
    ctx: RequestContext,
}

impl Fixture {
    fn new(store: MemoryStore, tenant_id: i64) -> Self {
        let root = TempDir::new().expect("temp dir");
        let store = Arc::new(store);
        let settings = OffloadSettings::new(root.path(), "http://localhost:81/app")
            .with_retry(3, Duration::from_millis(1));
        let offloader = MediaOffloader::new(Some(Arc::clone(&store)), settings);
        let ctx = RequestContext::new(
            Tenant::new(tenant_id, 1, "shop-dev.localhost:81", "/"),
            CookieDomain::new(),
        );
        Self {
            root,
            store,
            offloader,
            ctx,
        }
    }

    fn month_dir(&self) -> PathBuf {
        let basedir = tenant_basedir(self.root.path(), self.ctx.tenant());
        basedir.join("2024").join("11")
    }

    fn write(&self, name: &str, body: &[u8]) -> PathBuf {
        let dir = self.month_dir();
        std::fs::create_dir_all(&dir).expect("create dir");
        let path = dir.join(name);
        std::fs::write(&path, body).expect("write file");
        path
    }
}

fn size(file: &str) -> SizeVariant {
    SizeVariant {
        file: file.to_string(),
        width: 150,
        height: 150,
        mime_type: Some("image/jpeg".to_string()),
        url: None,
    }
}

fn metadata(file: &str, sizes: &[(&str, &str)]) -> AttachmentMetadata {
    AttachmentMetadata {
        file: file.to_string(),
        width: 1200,
        height: 800,
        sizes: sizes
            .iter()
            .map(|(name, file)| ((*name).to_string(), size(file)))
            .collect::<BTreeMap<_, _>>(),
        url: None,
    }
}

#[tokio::test]
async fn test_upload_builds_tenant_key_and_url() {
    let fx = Fixture::new(MemoryStore::default(), 3);
    let path = fx.write("a.jpg", b"jpeg bytes");

    let result = fx
        .offloader
        .upload(&fx.ctx, &path, Some("image/jpeg"))
        .await
        .expect("upload succeeds");

    assert_eq!(result.key, "uploads/sites/3/2024/11/a.jpg");
    assert_eq!(
        result.remote_url,
        "https://store.example.com/assets/uploads/sites/3/2024/11/a.jpg"
    );
    assert_eq!(result.byte_size, 10);
    assert!(path.exists(), "upload alone keeps the local file");
}

#[tokio::test]
async fn test_upload_main_tenant_key() {
    let fx = Fixture::new(MemoryStore::default(), 1);
    let path = fx.write("a.jpg", b"x");

    let result = fx.offloader.upload(&fx.ctx, &path, None).await.expect("upload succeeds");

    assert_eq!(result.key, "uploads/2024/11/a.jpg");
}

#[tokio::test]
async fn test_upload_gives_up_on_missing_file() {
    let fx = Fixture::new(MemoryStore::default(), 3);
    let path = fx.month_dir().join("never-written.jpg");

    assert!(fx.offloader.upload(&fx.ctx, &path, None).await.is_none());
    assert!(fx.store.puts().is_empty());
}

#[tokio::test]
async fn test_upload_picks_up_late_file() {
    let root = TempDir::new().expect("temp dir");
    let store = Arc::new(MemoryStore::default());
    let settings = OffloadSettings::new(root.path(), "http://localhost:81/app")
        .with_retry(50, Duration::from_millis(10));
    let offloader = MediaOffloader::new(Some(Arc::clone(&store)), settings);
    let ctx = RequestContext::new(Tenant::new(1, 1, "localhost:81", "/"), CookieDomain::new());
    let path = root.path().join("late.jpg");

    let writer_path = path.clone();
    let writer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        tokio::fs::write(&writer_path, b"late").await.expect("write file");
    });

    let result = offloader.upload(&ctx, &path, None).await;
    writer.await.expect("writer task");

    assert_eq!(result.map(|r| r.key), Some("uploads/late.jpg".to_string()));
}

#[tokio::test]
async fn test_store_failure_keeps_local_file() {
    let fx = Fixture::new(MemoryStore::failing(), 3);
    let path = fx.write("a.jpg", b"x");

    let uploaded = fx
        .offloader
        .handle_upload(
            &fx.ctx,
            UploadedFile {
                file: path.clone(),
                url: "http://localhost:81/app/uploads/sites/3/2024/11/a.jpg".to_string(),
                mime_type: Some("image/jpeg".to_string()),
            },
        )
        .await;

    assert_eq!(uploaded.url, "http://localhost:81/app/uploads/sites/3/2024/11/a.jpg");
    assert!(path.exists());
}

#[tokio::test]
async fn test_missing_credentials_pass_through() {
    let root = TempDir::new().expect("temp dir");
    let offloader: MediaOffloader<MemoryStore> =
        MediaOffloader::new(None, OffloadSettings::new(root.path(), "http://localhost:81/app"));
    let ctx = RequestContext::new(Tenant::new(1, 1, "localhost:81", "/"), CookieDomain::new());
    let path = root.path().join("a.jpg");
    std::fs::write(&path, b"x").expect("write file");

    assert!(!offloader.is_enabled());
    assert!(offloader.upload(&ctx, &path, None).await.is_none());

    let meta = metadata("a.jpg", &[("thumbnail", "a-150x150.jpg")]);
    let out = offloader
        .offload_metadata(&ctx, meta.clone(), &path, MetadataContext::Create)
        .await;
    assert_eq!(out, meta);
    assert!(offloader.delete(&ctx, &meta).await.is_none());
    assert!(path.exists());
}

#[tokio::test]
async fn test_handle_upload_replaces_url() {
    let fx = Fixture::new(MemoryStore::default(), 3);
    let path = fx.write("a.jpg", b"x");

    let uploaded = fx
        .offloader
        .handle_upload(
            &fx.ctx,
            UploadedFile {
                file: path.clone(),
                url: "http://localhost:81/app/uploads/sites/3/2024/11/a.jpg".to_string(),
                mime_type: None,
            },
        )
        .await;

    assert_eq!(
        uploaded.url,
        "https://store.example.com/assets/uploads/sites/3/2024/11/a.jpg"
    );
    assert!(path.exists(), "original stays for thumbnail generation");
}

#[tokio::test]
async fn test_shared_size_file_is_uploaded_once() {
    let fx = Fixture::new(MemoryStore::default(), 3);
    let main = fx.write("a.jpg", b"main");
    let thumb = fx.write("a-150x150.jpg", b"thumb");
    let large = fx.write("a-1024x683.jpg", b"large");

    let meta = metadata(
        "2024/11/a.jpg",
        &[
            ("thumbnail", "a-150x150.jpg"),
            ("woocommerce_thumbnail", "a-150x150.jpg"),
            ("large", "a-1024x683.jpg"),
        ],
    );
    let out = fx
        .offloader
        .offload_metadata(&fx.ctx, meta, &main, MetadataContext::Create)
        .await;

    let mut puts = fx.store.puts();
    puts.sort();
    assert_eq!(
        puts,
        vec![
            "uploads/sites/3/2024/11/a-1024x683.jpg".to_string(),
            "uploads/sites/3/2024/11/a-150x150.jpg".to_string(),
        ]
    );
    let thumb_url = "https://store.example.com/assets/uploads/sites/3/2024/11/a-150x150.jpg";
    assert_eq!(out.sizes["thumbnail"].url.as_deref(), Some(thumb_url));
    assert_eq!(out.sizes["woocommerce_thumbnail"].url.as_deref(), Some(thumb_url));
    assert!(out.sizes["large"].url.is_some());
    assert!(!thumb.exists());
    assert!(!large.exists());
    assert!(main.exists(), "main file is not part of size offload");
}

#[tokio::test]
async fn test_offload_metadata_skips_update_context() {
    let fx = Fixture::new(MemoryStore::default(), 3);
    let main = fx.write("a.jpg", b"main");
    fx.write("a-150x150.jpg", b"thumb");

    let meta = metadata("2024/11/a.jpg", &[("thumbnail", "a-150x150.jpg")]);
    let out = fx
        .offloader
        .offload_metadata(&fx.ctx, meta.clone(), &main, MetadataContext::Update)
        .await;

    assert_eq!(out, meta);
    assert!(fx.store.puts().is_empty());
}

#[tokio::test]
async fn test_update_metadata_ignores_unedited_files() {
    let fx = Fixture::new(MemoryStore::default(), 3);
    let main = fx.write("a.jpg", b"main");
    fx.write("a-150x150.jpg", b"thumb");

    let meta = metadata("2024/11/a.jpg", &[("thumbnail", "a-150x150.jpg")]);
    let out = fx.offloader.update_metadata(&fx.ctx, meta.clone(), &main).await;

    assert_eq!(out, meta);
    assert!(fx.store.puts().is_empty());
}

#[tokio::test]
async fn test_update_metadata_offloads_edit() {
    let fx = Fixture::new(MemoryStore::default(), 3);
    let original = fx.write("a.jpg", b"main");
    let edited = fx.write("a-e1715012345678.jpg", b"edited");
    let thumb = fx.write("a-e1715012345678-150x150.jpg", b"thumb");

    let meta = metadata(
        "2024/11/a-e1715012345678.jpg",
        &[("thumbnail", "a-e1715012345678-150x150.jpg")],
    );
    let out = fx.offloader.update_metadata(&fx.ctx, meta, &original).await;

    assert_eq!(
        out.url.as_deref(),
        Some("https://store.example.com/assets/uploads/sites/3/2024/11/a-e1715012345678.jpg")
    );
    assert_eq!(
        out.sizes["thumbnail"].url.as_deref(),
        Some("https://store.example.com/assets/uploads/sites/3/2024/11/a-e1715012345678-150x150.jpg")
    );
    assert!(!edited.exists());
    assert!(!thumb.exists());
    assert_eq!(fx.store.puts().len(), 2);
}

#[tokio::test]
async fn test_offload_edited_image_removes_local_copy() {
    let fx = Fixture::new(MemoryStore::default(), 1);
    let edited = fx.write("a-e1715012345678.png", b"png");

    let result = fx
        .offloader
        .offload_edited_image(&fx.ctx, &edited, Some("image/png"))
        .await
        .expect("upload succeeds");

    assert_eq!(result.key, "uploads/2024/11/a-e1715012345678.png");
    assert!(!edited.exists());
}

#[tokio::test]
async fn test_delete_leaves_no_versions() {
    let fx = Fixture::new(MemoryStore::default(), 3);
    let store = &fx.store;
    store.seed("uploads/sites/3/2024/11/a.jpg", "1", false);
    store.seed("uploads/sites/3/2024/11/a.jpg", "2", false);
    store.seed("uploads/sites/3/2024/11/a.jpg", "3", true);
    store.seed("uploads/sites/3/2024/11/a-e1715012345678.jpg", "4", false);
    store.seed("uploads/sites/3/2024/11/a-150x150.jpg", "5", false);
    store.seed("uploads/sites/3/2024/11/a-e1715012345678-150x150.jpg", "6", false);
    store.seed("uploads/sites/3/2024/11/b.jpg", "7", false);
    store.seed("uploads/2024/11/a.jpg", "8", false);

    let meta = metadata(
        "2024/11/a-e1715012345678.jpg",
        &[("thumbnail", "a-e1715012345678-150x150.jpg")],
    );
    let report = fx.offloader.delete(&fx.ctx, &meta).await.expect("purge runs");

    assert_eq!(
        report.prefixes,
        vec![
            "uploads/sites/3/2024/11/a".to_string(),
            "uploads/sites/3/2024/11/a-150x150".to_string(),
        ]
    );
    assert_eq!(report.deleted, 6);
    assert_eq!(store.delete_calls.load(Ordering::SeqCst), 1);

    for prefix in &report.prefixes {
        let left = store.list_object_versions(prefix).await.expect("list");
        assert!(left.is_empty(), "versions left under {prefix}: {left:?}");
    }
    let mut survivors = store.keys();
    survivors.sort();
    assert_eq!(
        survivors,
        vec![
            "uploads/2024/11/a.jpg".to_string(),
            "uploads/sites/3/2024/11/b.jpg".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_delete_without_file_is_noop() {
    let fx = Fixture::new(MemoryStore::default(), 3);
    fx.store.seed("uploads/sites/3/a.jpg", "1", false);

    assert!(fx.offloader.delete(&fx.ctx, &metadata("", &[])).await.is_none());
    assert_eq!(fx.store.delete_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_object_key_outside_basedir() {
    let fx = Fixture::new(MemoryStore::default(), 3);
    assert_eq!(
        fx.offloader.object_key(&fx.ctx, Path::new("/tmp/elsewhere/a.jpg")),
        "uploads/sites/3/tmp/elsewhere/a.jpg"
    );
}

#[test]
fn test_human_readable_size() {
    assert_eq!(human_readable_size(0), "0.00 B");
    assert_eq!(human_readable_size(512), "512.00 B");
    assert_eq!(human_readable_size(1000), "0.98 KB");
    assert_eq!(human_readable_size(1536), "1.50 KB");
    assert_eq!(human_readable_size(5 * 1024 * 1024), "5.00 MB");
}

#[test]
fn test_settings_from_config() {
    let site = wharf_shared::SiteConfig::default();
    let storage = wharf_shared::StorageSettings {
        upload_retries: Some(4),
        upload_retry_interval_ms: Some(250),
        ..wharf_shared::StorageSettings::default()
    };
    let settings = OffloadSettings::from_settings(&site, &storage);
    assert_eq!(settings.max_retries, 4);
    assert_eq!(settings.retry_interval, Duration::from_millis(250));
    assert_eq!(settings.uploads_root, PathBuf::from("web/app/uploads"));
    assert_eq!(settings.content_url, "http://localhost/app");

    let defaults =
        OffloadSettings::from_settings(&site, &wharf_shared::StorageSettings::default());
    assert_eq!(defaults.max_retries, 10);
    assert_eq!(defaults.retry_interval, Duration::from_millis(100));
}

#[test]
fn test_is_within_uploads() {
    let fx = Fixture::new(MemoryStore::default(), 3);
    let root = fx.root.path();

    assert!(fx.offloader.is_within_uploads(&root.join("sites/3/2024/11/a.jpg")));
    assert!(!fx.offloader.is_within_uploads(&root.join("sites/3/../../../etc/passwd")));
    assert!(!fx.offloader.is_within_uploads(Path::new("/etc/passwd")));
}
