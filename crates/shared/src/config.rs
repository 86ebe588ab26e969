//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Site and domain configuration.
    #[serde(default)]
    pub site: SiteConfig,
    /// Object storage configuration.
    #[serde(default)]
    pub storage: StorageSettings,
    /// URL rewrite configuration.
    #[serde(default)]
    pub rewrite: RewriteSettings,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development.
    Development,
    /// Pre-production staging.
    Staging,
    /// Production.
    #[default]
    Production,
}

impl Environment {
    /// Returns true for the production environment.
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }

    /// Returns the lowercase environment name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }
}

/// Site and domain configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Deployment environment.
    #[serde(default)]
    pub environment: Environment,
    /// Home URL without the proxy port, e.g. `http://localhost`.
    #[serde(default = "default_home_url")]
    pub home_url: String,
    /// Port of the fronting proxy, appended to the home URL when set.
    #[serde(default)]
    pub proxy_port: Option<u16>,
    /// Production domain, e.g. `example.com`.
    #[serde(default)]
    pub production_domain: String,
    /// Suffix appended to tenant subdomains outside production, e.g. `-dev`.
    #[serde(default)]
    pub subdomain_suffix: String,
    /// Content directory below the web root.
    #[serde(default = "default_content_dir")]
    pub content_dir: String,
    /// Local filesystem root of the uploads directory.
    #[serde(default = "default_uploads_root")]
    pub uploads_root: String,
    /// Site path of the network.
    #[serde(default = "default_site_path")]
    pub path: String,
    /// Tenant id used when no tenant matches the request host.
    #[serde(default = "default_site_id")]
    pub default_tenant_id: i64,
    /// Network id used when no tenant matches the request host.
    #[serde(default = "default_site_id")]
    pub default_network_id: i64,
    /// Cookie domain fixed ahead of tenant resolution.
    #[serde(default)]
    pub cookie_domain: Option<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            home_url: default_home_url(),
            proxy_port: None,
            production_domain: String::new(),
            subdomain_suffix: String::new(),
            content_dir: default_content_dir(),
            uploads_root: default_uploads_root(),
            path: default_site_path(),
            default_tenant_id: default_site_id(),
            default_network_id: default_site_id(),
            cookie_domain: None,
        }
    }
}

/// Drops an explicit `:port` from an authority. Bracketed IPv6 literals are
/// kept whole.
fn strip_port(authority: &str) -> &str {
    if authority.ends_with(']') {
        return authority;
    }
    match authority.rsplit_once(':') {
        Some((host, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => host,
        _ => authority,
    }
}

impl SiteConfig {
    /// Home URL including the proxy port, when one is configured.
    ///
    /// The proxy port replaces any port already present in the home URL.
    #[must_use]
    pub fn home_url_with_port(&self) -> String {
        let home = self.home_url.trim_end_matches('/');
        let Some(port) = self.proxy_port else {
            return home.to_string();
        };

        let (scheme, rest) = home.split_once("://").unwrap_or(("", home));
        let (authority, path) = rest.find('/').map_or((rest, ""), |i| rest.split_at(i));
        let host = strip_port(authority);

        if scheme.is_empty() {
            format!("{host}:{port}{path}")
        } else {
            format!("{scheme}://{host}:{port}{path}")
        }
    }

    /// Public URL of the content directory.
    #[must_use]
    pub fn content_url(&self) -> String {
        format!("{}{}", self.home_url_with_port(), self.content_dir)
    }
}

fn default_home_url() -> String {
    "http://localhost".to_string()
}

fn default_content_dir() -> String {
    "/app".to_string()
}

fn default_uploads_root() -> String {
    "web/app/uploads".to_string()
}

fn default_site_path() -> String {
    "/".to_string()
}

fn default_site_id() -> i64 {
    1
}

/// Object storage configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageSettings {
    /// S3-compatible endpoint URL.
    #[serde(default)]
    pub endpoint: String,
    /// Bucket name.
    #[serde(default)]
    pub bucket: String,
    /// Access key id.
    #[serde(default)]
    pub access_key: String,
    /// Secret access key.
    #[serde(default)]
    pub secret_key: String,
    /// Signing region.
    #[serde(default)]
    pub region: Option<String>,
    /// Public CDN/proxy endpoint serving the bucket.
    #[serde(default)]
    pub proxy: String,
    /// Store port used for public URLs when the site runs on localhost.
    #[serde(default)]
    pub dev_port: Option<u16>,
    /// Whether the store accepts the client's default checksum headers.
    #[serde(default)]
    pub checksums: bool,
    /// Attempts made while waiting for a local file to become readable.
    #[serde(default)]
    pub upload_retries: Option<u32>,
    /// Delay between readability attempts, in milliseconds.
    #[serde(default)]
    pub upload_retry_interval_ms: Option<u64>,
}

/// URL rewrite configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RewriteSettings {
    /// Comma-separated bypass patterns.
    #[serde(default)]
    pub bypass_urls: String,
    /// Log every rewrite decision.
    #[serde(default)]
    pub log_rewrites: bool,
}

impl RewriteSettings {
    /// Splits the configured bypass list into trimmed, non-empty patterns.
    #[must_use]
    pub fn bypass_patterns(&self) -> Vec<String> {
        self.bypass_urls
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from)
            .collect()
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("WHARF").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
