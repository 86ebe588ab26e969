//! Per-tenant uploads directory.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::rewrite::RewriteEngine;
use crate::tenant::Tenant;

/// Where new uploads of a tenant land, locally and publicly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadDir {
    /// Local directory for this month.
    pub path: PathBuf,
    /// Public URL of this month's directory.
    pub url: String,
    /// Month subdirectory, e.g. `/2024/11`.
    pub subdir: String,
    /// Local uploads root of the tenant.
    pub basedir: PathBuf,
    /// Public URL of the tenant uploads root.
    pub baseurl: String,
}

impl UploadDir {
    /// Computes the uploads directory of `tenant` for the month of `now`.
    #[must_use]
    pub fn for_tenant(
        uploads_root: &Path,
        content_url: &str,
        tenant: &Tenant,
        now: DateTime<Utc>,
    ) -> Self {
        let basedir = tenant_basedir(uploads_root, tenant);
        let baseurl = format!(
            "{}/{}",
            content_url.trim_end_matches('/'),
            tenant.upload_prefix()
        );
        let subdir = now.format("/%Y/%m").to_string();

        Self {
            path: basedir.join(subdir.trim_start_matches('/')),
            url: format!("{baseurl}{subdir}"),
            subdir,
            basedir,
            baseurl,
        }
    }

    /// Passes both public URLs through the rewrite engine.
    #[must_use]
    pub fn rewritten(mut self, engine: &mut RewriteEngine<'_>) -> Self {
        self.url = engine.rewrite_url(&self.url);
        self.baseurl = engine.rewrite_url(&self.baseurl);
        self
    }
}

/// Local uploads root of `tenant`: the uploads root itself for the main
/// tenant, `sites/{id}` below it otherwise.
#[must_use]
pub fn tenant_basedir(uploads_root: &Path, tenant: &Tenant) -> PathBuf {
    if tenant.is_main() {
        uploads_root.to_path_buf()
    } else {
        uploads_root
            .join("sites")
            .join(tenant.tenant_id.to_string())
    }
}
