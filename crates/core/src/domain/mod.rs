//! Host classification: base domain resolution and subdomain extraction.
//!
//! Both functions are pure. They never touch the network and only log when
//! the input cannot be interpreted as a host at all.

use std::net::IpAddr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use url::Url;

/// Second-level labels that mark a three-label registrable domain (`example.co.uk`).
const SECOND_LEVEL_LABELS: [&str; 3] = ["co", "gov", "ac"];

/// A single leading label followed by a two-level domain (or `localhost`), optional port.
static SUBDOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^([a-z0-9\-]+\.)((?:[a-z0-9\-]{2,}\.[a-z]{2,6})|localhost)(?::\d+)?$")
        .expect("subdomain pattern is valid")
});

/// Registrable domain of a host, with and without a non-standard port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BaseDomain {
    /// Base domain plus `:<port>` unless the port is absent, 80 or 443.
    pub with_port: String,
    /// Base domain alone.
    pub without_port: String,
}

impl BaseDomain {
    /// Returns true when `candidate` equals either form.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        candidate == self.with_port || candidate == self.without_port
    }

    /// Returns true when the base domain is `localhost`.
    #[must_use]
    pub fn is_localhost(&self) -> bool {
        self.without_port == "localhost"
    }
}

/// Splits `host[:port]` into its host and explicit port.
///
/// Bracketed IPv6 literals keep their brackets.
#[must_use]
pub fn split_host_port(authority: &str) -> (&str, Option<u16>) {
    if authority.starts_with('[') {
        if let Some(end) = authority.find(']') {
            let host = &authority[..=end];
            let port = authority[end + 1..]
                .strip_prefix(':')
                .and_then(|p| p.parse().ok());
            return (host, port);
        }
        return (authority, None);
    }
    match authority.rsplit_once(':') {
        Some((host, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => {
            (host, port.parse().ok())
        }
        _ => (authority, None),
    }
}

/// Extracts host and port from a full URL or a bare `host[:port][/path]`.
fn host_and_port(input: &str) -> Option<(String, Option<u16>)> {
    if let Ok(url) = Url::parse(input) {
        if let Some(host) = url.host_str() {
            return Some((host.to_ascii_lowercase(), url.port()));
        }
    }

    // Bare host: drop an optional `//`, any path, and userinfo.
    let bare = input.trim().trim_start_matches("//");
    let authority = bare.split(['/', '?', '#']).next().unwrap_or_default();
    let authority = authority.rsplit('@').next().unwrap_or_default();
    let (host, port) = split_host_port(authority);
    if host.is_empty()
        || host.contains(char::is_whitespace)
        || (host.contains(':') && !host.starts_with('['))
    {
        return None;
    }
    Some((host.to_ascii_lowercase(), port))
}

/// Resolves the base domain of a URL or bare host.
///
/// `localhost` (and `*.localhost`) resolve to `localhost`. Hosts with more
/// than two labels keep their last two labels, or their last three when the
/// second-to-last label is a known second-level label such as `co`.
///
/// Returns `None` (and logs) when no host can be found in `input`.
#[must_use]
pub fn resolve_base_domain(input: &str) -> Option<BaseDomain> {
    let Some((host, port)) = host_and_port(input) else {
        tracing::warn!(input = %input, "invalid URL, cannot resolve base domain");
        return None;
    };

    let labels: Vec<&str> = host.split('.').collect();
    let count = labels.len();

    let base = if host == "localhost" || host.ends_with(".localhost") {
        "localhost".to_string()
    } else if host.parse::<IpAddr>().is_ok() || host.starts_with('[') {
        host.clone()
    } else if count > 2 && SECOND_LEVEL_LABELS.contains(&labels[count - 2]) {
        labels[count - 3..].join(".")
    } else if count > 2 {
        labels[count - 2..].join(".")
    } else {
        host.clone()
    };

    let with_port = match port {
        Some(p) if p != 80 && p != 443 => format!("{base}:{p}"),
        _ => base.clone(),
    };

    Some(BaseDomain {
        with_port,
        without_port: base,
    })
}

/// Extracts the single leading label of a host such as `docs.example.com[:port]`.
///
/// IP literals and `localhost` have no subdomain. Hosts with more than one
/// label before the domain do not match and yield `None`.
#[must_use]
pub fn extract_subdomain(host: &str) -> Option<String> {
    if host.is_empty() {
        return None;
    }
    let (bare, _) = split_host_port(host);
    let unbracketed = bare.trim_start_matches('[').trim_end_matches(']');
    if bare == "localhost" || unbracketed.parse::<IpAddr>().is_ok() {
        return None;
    }

    SUBDOMAIN_RE
        .captures(host)
        .and_then(|caps| caps.get(1))
        .map(|label| label.as_str().trim_end_matches('.').to_string())
}
