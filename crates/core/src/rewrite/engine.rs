//! The URL rewrite pipeline.
//!
//! Each URL goes through, in order:
//!
//! 1. bypass rules (first match wins, URL returned unchanged)
//! 2. terminal shapes: relative, non-HTTP, or already pointing at the store
//! 3. removal of a `/wp` path segment, then re-entry
//! 4. scheme alignment with the home URL, then re-entry
//! 5. media rewriting for uploads paths
//! 6. outside production, development domain mapping
//!
//! Every result is memoized for the rest of the request.

use std::sync::LazyLock;

use regex::Regex;

use super::cache::RewriteCache;
use super::config::RewriteConfig;
use super::parts::UrlParts;
use super::value::{UrlHook, UrlValue};
use crate::domain::{extract_subdomain, resolve_base_domain};
use crate::tenant::RequestContext;

/// A `/wp` path segment, followed by `/` or the end of the path.
static WP_SEGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/wp(?:/|$)").expect("wp segment pattern is valid"));

/// Paths served from the uploads directory.
static UPLOADS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:app|wp-content|wp-includes)/uploads(?:/|$)").expect("uploads pattern is valid")
});

/// Request-scoped URL rewriter.
pub struct RewriteEngine<'a> {
    config: &'a RewriteConfig,
    context: &'a RequestContext,
    cache: RewriteCache,
}

impl<'a> RewriteEngine<'a> {
    /// Creates an engine with an empty cache.
    #[must_use]
    pub fn new(config: &'a RewriteConfig, context: &'a RequestContext) -> Self {
        Self {
            config,
            context,
            cache: RewriteCache::new(),
        }
    }

    /// The request context.
    #[must_use]
    pub const fn context(&self) -> &RequestContext {
        self.context
    }

    /// The memoized results so far.
    #[must_use]
    pub const fn cache(&self) -> &RewriteCache {
        &self.cache
    }

    /// Rewrites a value produced by `hook`.
    pub fn rewrite_hook(&mut self, hook: UrlHook, value: UrlValue) -> UrlValue {
        if self.config.log_rewrites {
            tracing::info!(hook = hook.name(), "rewriting hook output");
        }
        self.rewrite(value)
    }

    /// Rewrites every URL in `value`, recursing into sequences.
    pub fn rewrite(&mut self, value: UrlValue) -> UrlValue {
        value.map_scalars(&mut |url: &str| self.rewrite_url(url))
    }

    /// Rewrites a single URL.
    pub fn rewrite_url(&mut self, url: &str) -> String {
        if let Some(hit) = self.cache.get(url) {
            return hit.to_string();
        }
        let rewritten = self.compute(url);
        self.cache.insert(url, rewritten).to_string()
    }

    fn compute(&mut self, url: &str) -> String {
        let config = self.config;

        if let Some(rule) = config.bypass.find(url) {
            self.log("bypass", url, url, Some(rule.pattern()));
            return url.to_string();
        }

        let Some(parts) = UrlParts::parse(url) else {
            return url.to_string();
        };
        if !parts.is_http() || config.is_store_authority(&parts.host, parts.effective_port()) {
            return url.to_string();
        }

        if let Some(stripped) = strip_wp_segment(url, &parts) {
            self.log("strip /wp", url, &stripped, None);
            return self.rewrite_url(&stripped);
        }

        if parts.scheme != config.scheme {
            let fixed = format!("{}{}", config.scheme, &url[parts.scheme.len()..]);
            self.log("scheme", url, &fixed, None);
            return self.rewrite_url(&fixed);
        }

        if UPLOADS_RE.is_match(parts.path) {
            return self.rewrite_media(url);
        }

        if !config.environment.is_production() {
            if let Some(mapped) = self.rewrite_dev_domain(url, &parts) {
                return mapped;
            }
        }

        url.to_string()
    }

    /// Points an uploads URL at the store or its proxy, preserving the query.
    fn rewrite_media(&self, url: &str) -> String {
        let config = self.config;
        if !config.media.is_configured() {
            return url.to_string();
        }

        let tenant = self.context.tenant();
        let local_base = config.uploads_base_url(tenant);
        let remote_base = format!("{}/{}", config.cdn_base(), tenant.upload_prefix());

        let (head, tail) = match url.find('?') {
            Some(idx) => url.split_at(idx),
            None => (url, ""),
        };
        if !head.contains(&local_base) {
            return url.to_string();
        }

        let rewritten = format!("{}{tail}", head.replacen(&local_base, &remote_base, 1));
        self.log("media", url, &rewritten, None);
        rewritten
    }

    /// Maps production and local URLs onto the development domain.
    ///
    /// Returns `None` when the URL does not belong to the site.
    fn rewrite_dev_domain(&self, url: &str, parts: &UrlParts<'_>) -> Option<String> {
        let config = self.config;
        let base = &config.base_domain;

        let url_base = resolve_base_domain(url)?;
        let belongs = (!config.production_domain.is_empty()
            && url_base.with_port == config.production_domain)
            || base.matches(&url_base.with_port);
        if !belongs {
            return None;
        }

        let missing_port = parts.port.is_none()
            && config.proxy_port.is_some_and(|p| p != 80 && p != 443)
            && base.is_localhost()
            && !parts.host_port().ends_with(&base.with_port);
        let with_port = match config.proxy_port {
            Some(port) if missing_port => format!(
                "{}://{}:{port}{}",
                &url[..parts.scheme.len()],
                parts.authority,
                parts.rest
            ),
            _ => url.to_string(),
        };

        let subdomain = extract_subdomain(&parts.host_port());
        let suffix = &config.subdomain_suffix;
        if subdomain.as_ref().is_some_and(|s| s.ends_with(suffix.as_str())) {
            self.log("dev port", url, &with_port, None);
            return Some(with_port);
        }

        let Some(label) = self.site_label(&parts.host) else {
            return Some(with_port);
        };
        let host = match label {
            Some(label) => format!("{label}{suffix}.{}", base.with_port),
            None => base.with_port.clone(),
        };
        let mapped = format!("{}://{host}{}", config.scheme, parts.rest);
        self.log("dev domain", url, &mapped, None);
        Some(mapped)
    }

    /// Splits `host` into its leading label relative to the production or
    /// base domain.
    ///
    /// `Some(None)` is the bare domain, `Some(Some(label))` a single-label
    /// subdomain. Anything else yields `None`.
    fn site_label<'h>(&self, host: &'h str) -> Option<Option<&'h str>> {
        let config = self.config;
        let domains = [
            config.production_domain.as_str(),
            config.base_domain.without_port.as_str(),
        ];

        for domain in domains.into_iter().filter(|d| !d.is_empty()) {
            if host == domain {
                return Some(None);
            }
            if let Some(prefix) = host.strip_suffix(domain).and_then(|p| p.strip_suffix('.')) {
                return (!prefix.is_empty() && !prefix.contains('.')).then_some(Some(prefix));
            }
        }
        None
    }

    fn log(&self, step: &str, from: &str, to: &str, rule: Option<&str>) {
        if self.config.log_rewrites {
            tracing::info!(step, from, to, rule, "url rewrite");
        }
    }
}

/// Removes the first `/wp` path segment, e.g. `/wp/wp-admin/` to `/wp-admin/`.
fn strip_wp_segment(url: &str, parts: &UrlParts<'_>) -> Option<String> {
    let found = WP_SEGMENT_RE.find(parts.path)?;
    let start = parts.path_start + found.start();
    Some(format!("{}{}", &url[..start], &url[start + 3..]))
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
