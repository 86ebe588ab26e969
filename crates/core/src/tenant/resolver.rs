//! Tenant resolution from the request host.

use std::sync::Arc;

use wharf_shared::{Environment, SiteConfig};

use super::context::{CookieDomain, RequestContext, Tenant};
use super::error::TenantError;
use crate::domain::{BaseDomain, resolve_base_domain, split_host_port};

/// A tenant row matched by the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantRecord {
    /// Tenant (blog) id.
    pub tenant_id: i64,
    /// Network (site) id.
    pub network_id: i64,
}

/// Lookup of tenants by domain.
///
/// This trait is implemented by the db crate against the tenant table.
pub trait TenantDirectory: Send + Sync {
    /// Finds the tenant whose domain starts with `subdomain` (case-insensitive)
    /// and whose path is `/`.
    fn find_by_domain_prefix(
        &self,
        subdomain: &str,
    ) -> impl std::future::Future<Output = Result<Option<TenantRecord>, TenantError>> + Send;
}

/// Inputs of tenant resolution, derived from the site configuration.
#[derive(Debug, Clone)]
pub struct TenantSettings {
    /// Deployment environment.
    pub environment: Environment,
    /// Base domain of the home URL.
    pub base_domain: BaseDomain,
    /// Production domain.
    pub production_domain: String,
    /// Suffix carried by non-production subdomains.
    pub subdomain_suffix: String,
    /// Site path.
    pub path: String,
    /// Fallback tenant id.
    pub default_tenant_id: i64,
    /// Fallback network id.
    pub default_network_id: i64,
    /// Cookie domain fixed by configuration.
    pub cookie_domain: Option<String>,
}

impl TenantSettings {
    /// Derives resolution settings from the site configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the home URL has no host.
    pub fn from_site(site: &SiteConfig) -> Result<Self, TenantError> {
        let home = site.home_url_with_port();
        let base_domain =
            resolve_base_domain(&home).ok_or_else(|| TenantError::InvalidHomeUrl(home.clone()))?;

        Ok(Self {
            environment: site.environment,
            base_domain,
            production_domain: site.production_domain.to_ascii_lowercase(),
            subdomain_suffix: site.subdomain_suffix.clone(),
            path: site.path.clone(),
            default_tenant_id: site.default_tenant_id,
            default_network_id: site.default_network_id,
            cookie_domain: site.cookie_domain.clone().filter(|d| !d.is_empty()),
        })
    }
}

/// Maps a request host to its tenant before any request handling happens.
pub struct TenantResolver<D: TenantDirectory> {
    directory: Arc<D>,
    settings: TenantSettings,
}

impl<D: TenantDirectory> TenantResolver<D> {
    /// Creates a resolver.
    #[must_use]
    pub fn new(directory: Arc<D>, settings: TenantSettings) -> Self {
        Self {
            directory,
            settings,
        }
    }

    /// The resolution settings.
    #[must_use]
    pub const fn settings(&self) -> &TenantSettings {
        &self.settings
    }

    /// Suffix carried by tenant subdomains in this environment. Production
    /// hosts carry none.
    fn suffix(&self) -> &str {
        if self.settings.environment.is_production() {
            ""
        } else {
            &self.settings.subdomain_suffix
        }
    }

    /// Returns the tenant subdomain carried by `host`, without the suffix.
    ///
    /// Only hosts that are a strict subdomain of the base or production domain
    /// qualify; the first label is taken.
    #[must_use]
    pub fn candidate_subdomain(&self, host: &str) -> Option<String> {
        let host = host.trim().to_ascii_lowercase();
        let (bare, _) = split_host_port(&host);

        let domains = [
            self.settings.base_domain.without_port.as_str(),
            self.settings.production_domain.as_str(),
        ];
        let prefix = domains
            .iter()
            .filter(|d| !d.is_empty())
            .find_map(|d| bare.strip_suffix(&format!(".{d}")))?;

        let label = prefix.split('.').next().unwrap_or_default();
        let label = strip_suffix(label, self.suffix());
        (!label.is_empty()).then(|| label.to_string())
    }

    /// Resolves the tenant for `host`.
    ///
    /// At most one directory lookup is made; lookup failures and misses fall
    /// back to the default tenant.
    pub async fn resolve(&self, host: &str) -> RequestContext {
        let settings = &self.settings;
        let suffix = self.suffix();
        let subdomain = self.candidate_subdomain(host);

        let tenant_domain = subdomain.as_ref().map_or_else(
            || settings.base_domain.with_port.clone(),
            |sub| {
                format!("{sub}{suffix}.{}", settings.base_domain.with_port)
            },
        );
        let expected_cookie = subdomain.as_ref().map_or_else(
            || settings.base_domain.without_port.clone(),
            |sub| {
                format!("{sub}{suffix}.{}", settings.base_domain.without_port)
            },
        );

        let mut tenant = Tenant::new(
            settings.default_tenant_id,
            settings.default_network_id,
            tenant_domain,
            settings.path.clone(),
        );

        if let Some(sub) = subdomain.as_deref() {
            tracing::debug!(host = %host, subdomain = %sub, "detected tenant subdomain");
            match self.directory.find_by_domain_prefix(sub).await {
                Ok(Some(record)) => {
                    tenant.tenant_id = record.tenant_id;
                    tenant.network_id = record.network_id;
                }
                Ok(None) => {
                    tracing::debug!(subdomain = %sub, "no tenant matched, using default");
                }
                Err(e) => {
                    tracing::error!(subdomain = %sub, error = %e, "tenant lookup failed, using default");
                }
            }
        }

        let cookie_domain = settings
            .cookie_domain
            .as_ref()
            .map_or_else(CookieDomain::new, CookieDomain::fixed);
        cookie_domain.ensure(&expected_cookie);

        tracing::debug!(
            tenant_id = tenant.tenant_id,
            network_id = tenant.network_id,
            domain = %tenant.domain,
            "tenant resolved"
        );

        RequestContext::new(tenant, cookie_domain)
    }
}

fn strip_suffix<'a>(label: &'a str, suffix: &str) -> &'a str {
    if suffix.is_empty() {
        label
    } else {
        label.strip_suffix(suffix).unwrap_or(label)
    }
}
