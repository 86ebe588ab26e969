//! Rewrite inputs and the runtime URL hooks that produce them.

use serde::{Deserialize, Serialize};

/// A value handed to the rewrite engine by a URL hook.
///
/// Hooks pass either a single URL or a list (a `srcset`, for instance).
/// Anything that is neither a string nor a list passes through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UrlValue {
    /// A single URL.
    Scalar(String),
    /// A list of values, rewritten element by element.
    Sequence(Vec<UrlValue>),
    /// Any other value.
    Other(serde_json::Value),
}

impl UrlValue {
    /// Applies `f` to every scalar, recursing into sequences.
    pub fn map_scalars<F>(self, f: &mut F) -> Self
    where
        F: FnMut(&str) -> String,
    {
        match self {
            Self::Scalar(url) => Self::Scalar(f(&url)),
            Self::Sequence(values) => {
                Self::Sequence(values.into_iter().map(|v| v.map_scalars(f)).collect())
            }
            other @ Self::Other(_) => other,
        }
    }
}

impl From<&str> for UrlValue {
    fn from(url: &str) -> Self {
        Self::Scalar(url.to_string())
    }
}

impl From<String> for UrlValue {
    fn from(url: String) -> Self {
        Self::Scalar(url)
    }
}

/// Extension points whose generated URLs go through the rewrite engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlHook {
    /// Home URL option.
    #[default]
    Home,
    /// Site URL option.
    SiteUrl,
    /// Network site URL (multi-tenant installs).
    NetworkSiteUrl,
    /// Network admin URL (multi-tenant installs).
    NetworkAdminUrl,
    /// Redirect after login.
    LoginRedirect,
    /// Generic redirect.
    Redirect,
    /// Script asset source.
    ScriptLoaderSrc,
    /// Stylesheet asset source.
    StyleLoaderSrc,
    /// Plugin asset URL.
    PluginsUrl,
    /// Uploads directory URLs.
    UploadDir,
}

impl UrlHook {
    /// Hook name as used in logs and the API.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::SiteUrl => "site_url",
            Self::NetworkSiteUrl => "network_site_url",
            Self::NetworkAdminUrl => "network_admin_url",
            Self::LoginRedirect => "login_redirect",
            Self::Redirect => "redirect",
            Self::ScriptLoaderSrc => "script_loader_src",
            Self::StyleLoaderSrc => "style_loader_src",
            Self::PluginsUrl => "plugins_url",
            Self::UploadDir => "upload_dir",
        }
    }
}
