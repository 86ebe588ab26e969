//! Per-request tenant context.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// Id of the main tenant, whose uploads live at the root of the uploads tree.
pub const MAIN_TENANT_ID: i64 = 1;

/// Cookie path of the admin area.
pub const ADMIN_COOKIE_PATH: &str = "/wp-admin";

/// The tenant serving the current request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    /// Tenant (blog) id.
    pub tenant_id: i64,
    /// Network (site) id.
    pub network_id: i64,
    /// Public domain, including a non-standard port.
    pub domain: String,
    /// Site path.
    pub path: String,
}

impl Tenant {
    /// Creates a tenant.
    #[must_use]
    pub fn new(
        tenant_id: i64,
        network_id: i64,
        domain: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id,
            network_id,
            domain: domain.into(),
            path: path.into(),
        }
    }

    /// Returns true for the main tenant.
    #[must_use]
    pub const fn is_main(&self) -> bool {
        self.tenant_id == MAIN_TENANT_ID
    }

    /// Uploads path relative to the content directory, also used as the
    /// object key prefix: `uploads` or `uploads/sites/{id}`.
    #[must_use]
    pub fn upload_prefix(&self) -> String {
        if self.is_main() {
            "uploads".to_string()
        } else {
            format!("uploads/sites/{}", self.tenant_id)
        }
    }
}

/// Cookie domain for the request, settable once.
#[derive(Debug, Default)]
pub struct CookieDomain {
    value: OnceLock<String>,
}

impl CookieDomain {
    /// An unset cookie domain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A cookie domain already fixed by configuration.
    #[must_use]
    pub fn fixed(value: impl Into<String>) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(value.into());
        Self { value: cell }
    }

    /// Sets the cookie domain if unset. An existing, different value is kept
    /// and the mismatch is logged.
    ///
    /// Returns true when the stored value equals `expected`.
    pub fn ensure(&self, expected: &str) -> bool {
        let stored = self.value.get_or_init(|| expected.to_string());
        if stored == expected {
            true
        } else {
            tracing::warn!(
                current = %stored,
                expected = %expected,
                "cookie domain already set to a different value"
            );
            false
        }
    }

    /// The cookie domain, once set.
    #[must_use]
    pub fn get(&self) -> Option<&str> {
        self.value.get().map(String::as_str)
    }
}

impl Clone for CookieDomain {
    fn clone(&self) -> Self {
        self.get().map_or_else(Self::new, Self::fixed)
    }
}

/// Everything resolved about the tenant before a request is handled.
#[derive(Debug, Clone)]
pub struct RequestContext {
    tenant: Tenant,
    cookie_domain: CookieDomain,
}

impl RequestContext {
    /// Creates a context for `tenant`.
    #[must_use]
    pub fn new(tenant: Tenant, cookie_domain: CookieDomain) -> Self {
        Self {
            tenant,
            cookie_domain,
        }
    }

    /// The resolved tenant.
    #[must_use]
    pub const fn tenant(&self) -> &Tenant {
        &self.tenant
    }

    /// The request cookie domain.
    #[must_use]
    pub const fn cookie_domain(&self) -> &CookieDomain {
        &self.cookie_domain
    }

    /// Cookie path of the admin area.
    #[must_use]
    pub const fn admin_cookie_path(&self) -> &'static str {
        ADMIN_COOKIE_PATH
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_prefix() {
        assert_eq!(Tenant::new(1, 1, "localhost:81", "/").upload_prefix(), "uploads");
        assert_eq!(
            Tenant::new(3, 1, "shop-dev.localhost:81", "/").upload_prefix(),
            "uploads/sites/3"
        );
    }

    #[test]
    fn test_cookie_domain_set_once() {
        let cookie = CookieDomain::new();
        assert_eq!(cookie.get(), None);
        assert!(cookie.ensure("shop-dev.localhost"));
        assert!(cookie.ensure("shop-dev.localhost"));
        assert!(!cookie.ensure("other.localhost"));
        assert_eq!(cookie.get(), Some("shop-dev.localhost"));
    }

    #[test]
    fn test_fixed_cookie_domain_is_kept() {
        let cookie = CookieDomain::fixed(".example.com");
        assert!(!cookie.ensure("shop.example.com"));
        assert_eq!(cookie.get(), Some(".example.com"));
        assert_eq!(cookie.clone().get(), Some(".example.com"));
    }
}
