//! Immutable rewrite configuration, built once at startup.

use url::Url;
use wharf_shared::{Environment, RewriteSettings, SiteConfig, StorageSettings};

use super::bypass::BypassMatcher;
use super::error::RewriteError;
use crate::domain::{BaseDomain, resolve_base_domain};
use crate::tenant::Tenant;

/// Public location of offloaded media.
#[derive(Debug, Clone, Default)]
pub struct MediaTarget {
    /// Store endpoint, without trailing slash.
    pub endpoint: String,
    /// Bucket name.
    pub bucket: String,
    /// CDN or proxy fronting the bucket, without trailing slash.
    pub proxy: String,
    /// Store port used for public URLs when the site runs on localhost.
    pub dev_port: Option<u16>,
}

impl MediaTarget {
    /// Builds the target from storage settings.
    #[must_use]
    pub fn from_settings(storage: &StorageSettings) -> Self {
        Self {
            endpoint: storage.endpoint.trim().trim_end_matches('/').to_string(),
            bucket: storage.bucket.trim().to_string(),
            proxy: storage.proxy.trim().trim_end_matches('/').to_string(),
            dev_port: storage.dev_port,
        }
    }

    /// Media rewriting needs both an endpoint and a bucket.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.endpoint.is_empty() && !self.bucket.is_empty()
    }
}

/// Everything the rewrite engine needs, independent of the request.
#[derive(Debug, Clone)]
pub struct RewriteConfig {
    /// Deployment environment.
    pub environment: Environment,
    /// Scheme of the home URL, lowercased.
    pub scheme: String,
    /// Base domain of the home URL (proxy port included).
    pub base_domain: BaseDomain,
    /// Production domain, lowercased. May be empty.
    pub production_domain: String,
    /// Suffix carried by non-production subdomains.
    pub subdomain_suffix: String,
    /// Proxy port of the site.
    pub proxy_port: Option<u16>,
    /// Public URL of the content directory.
    pub content_url: String,
    /// Offloaded media location.
    pub media: MediaTarget,
    /// URLs that are never rewritten.
    pub bypass: BypassMatcher,
    /// Log every rewrite decision.
    pub log_rewrites: bool,
    store_authorities: Vec<(String, Option<u16>)>,
}

impl RewriteConfig {
    /// Builds the configuration from the application settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the home URL cannot be parsed.
    pub fn from_settings(
        site: &SiteConfig,
        storage: &StorageSettings,
        rewrite: &RewriteSettings,
    ) -> Result<Self, RewriteError> {
        let home = site.home_url_with_port();
        let home_url = Url::parse(&home).map_err(|_| RewriteError::invalid_home_url(&home))?;
        let base_domain =
            resolve_base_domain(&home).ok_or_else(|| RewriteError::invalid_home_url(&home))?;

        if site.production_domain.trim().is_empty() {
            tracing::warn!("production domain is not configured, production URLs will not be mapped");
        }

        let media = MediaTarget::from_settings(storage);
        let bypass = BypassMatcher::from_patterns(&rewrite.bypass_patterns());

        let mut config = Self {
            environment: site.environment,
            scheme: home_url.scheme().to_ascii_lowercase(),
            base_domain,
            production_domain: site.production_domain.trim().to_ascii_lowercase(),
            subdomain_suffix: site.subdomain_suffix.clone(),
            proxy_port: site.proxy_port,
            content_url: site.content_url(),
            media,
            bypass,
            log_rewrites: rewrite.log_rewrites,
            store_authorities: Vec::new(),
        };
        config.store_authorities = config.collect_store_authorities();
        Ok(config)
    }

    /// Store endpoint used in public URLs.
    ///
    /// On localhost with a dev port configured, the store is reached at
    /// `{scheme}://localhost:{dev_port}`.
    #[must_use]
    pub fn public_endpoint(&self) -> String {
        match self.media.dev_port {
            Some(port) if self.base_domain.is_localhost() => {
                format!("{}://localhost:{port}", self.scheme)
            }
            _ => self.media.endpoint.clone(),
        }
    }

    /// Base URL offloaded media is served from: the proxy when set, else
    /// `{endpoint}/{bucket}`.
    #[must_use]
    pub fn cdn_base(&self) -> String {
        if self.media.proxy.is_empty() {
            format!("{}/{}", self.public_endpoint(), self.media.bucket)
        } else {
            self.media.proxy.clone()
        }
    }

    /// Public URL of the tenant's uploads directory.
    #[must_use]
    pub fn uploads_base_url(&self, tenant: &Tenant) -> String {
        format!(
            "{}/{}",
            self.content_url.trim_end_matches('/'),
            tenant.upload_prefix()
        )
    }

    /// Returns true when `host` and `port` name the store, its dev endpoint,
    /// or its proxy. Such URLs are already rewritten.
    #[must_use]
    pub fn is_store_authority(&self, host: &str, port: Option<u16>) -> bool {
        self.store_authorities
            .iter()
            .any(|(h, p)| h == host && *p == port)
    }

    fn collect_store_authorities(&self) -> Vec<(String, Option<u16>)> {
        [
            self.media.endpoint.clone(),
            self.media.proxy.clone(),
            self.public_endpoint(),
        ]
        .iter()
        .filter(|u| !u.is_empty())
        .filter_map(|u| Url::parse(u).ok())
        .filter_map(|u| {
            let host = u.host_str()?.to_ascii_lowercase();
            Some((host, u.port_or_known_default()))
        })
        .collect()
    }
}
