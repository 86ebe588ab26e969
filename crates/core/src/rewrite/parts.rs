//! Raw URL splitting that keeps the original text intact.
//!
//! `url::Url` normalizes what it parses (default ports, trailing slashes,
//! percent-encoding), so it is only used to validate. Every rewrite slices the
//! original string instead.

use url::Url;

use crate::domain::split_host_port;

/// Borrowed view over the components of an absolute URL.
#[derive(Debug, Clone)]
pub(crate) struct UrlParts<'a> {
    /// Scheme, lowercased.
    pub scheme: String,
    /// Authority exactly as written (may include userinfo and port).
    pub authority: &'a str,
    /// Host, lowercased, without port.
    pub host: String,
    /// Explicit port, if written.
    pub port: Option<u16>,
    /// Byte offset of the path within the original URL.
    pub path_start: usize,
    /// Path, query and fragment.
    pub rest: &'a str,
    /// Path only.
    pub path: &'a str,
}

impl<'a> UrlParts<'a> {
    /// Splits `url`, returning `None` for relative or host-less URLs.
    pub fn parse(url: &'a str) -> Option<Self> {
        let parsed = Url::parse(url).ok()?;
        if parsed.host_str().is_none_or(str::is_empty) {
            return None;
        }

        let (scheme, after) = url.split_once("://")?;
        let authority_len = after.find(['/', '?', '#']).unwrap_or(after.len());
        let authority = &after[..authority_len];
        let rest = &after[authority_len..];
        let path = &rest[..rest.find(['?', '#']).unwrap_or(rest.len())];

        let host_port = authority.rsplit('@').next().unwrap_or(authority);
        let (host, port) = split_host_port(host_port);
        if host.is_empty() {
            return None;
        }

        Some(Self {
            scheme: scheme.to_ascii_lowercase(),
            authority,
            host: host.to_ascii_lowercase(),
            port,
            path_start: scheme.len() + 3 + authority_len,
            rest,
            path,
        })
    }

    /// Host plus explicit port, e.g. `shop.localhost:81`.
    pub fn host_port(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{port}", self.host),
            None => self.host.clone(),
        }
    }

    /// Port to compare against other endpoints, defaulting by scheme.
    pub fn effective_port(&self) -> Option<u16> {
        self.port.or(match self.scheme.as_str() {
            "http" => Some(80),
            "https" => Some(443),
            _ => None,
        })
    }

    /// Returns true for `http` and `https`.
    pub fn is_http(&self) -> bool {
        self.scheme == "http" || self.scheme == "https"
    }
}
