//! Bypass rules: URLs that must never be rewritten.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static SCHEME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://").expect("scheme pattern is valid"));

static SCHEME_OR_SLASHES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:https?://|//)").expect("scheme pattern is valid"));

/// How a bypass pattern is compared against a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BypassKind {
    /// Exact equality after trimming trailing slashes.
    Exact,
    /// Equality ignoring a leading `http://`, `https://` or `//`.
    SchemeAgnostic,
    /// Prefix match for patterns ending in `/*`.
    Wildcard,
    /// Regular expression delimited by `/`.
    Regex,
}

/// A single bypass pattern.
#[derive(Debug, Clone)]
pub struct BypassRule {
    pattern: String,
    kind: BypassKind,
    regex: Option<Regex>,
}

impl BypassRule {
    /// Parses a pattern and classifies it.
    ///
    /// Invalid regular expressions are logged; such rules still take part in
    /// exact matching but never match as a regex.
    #[must_use]
    pub fn parse(pattern: &str) -> Self {
        let pattern = pattern.trim().to_string();

        let kind = if pattern.len() > 2 && pattern.starts_with('/') && pattern.ends_with('/') {
            BypassKind::Regex
        } else if pattern.ends_with("/*") {
            BypassKind::Wildcard
        } else if !has_explicit_scheme(&pattern) || pattern.starts_with("//") {
            BypassKind::SchemeAgnostic
        } else {
            BypassKind::Exact
        };

        let regex = if kind == BypassKind::Regex {
            let inner = &pattern[1..pattern.len() - 1];
            match Regex::new(inner) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::warn!(pattern = %pattern, error = %e, "invalid bypass regex");
                    None
                }
            }
        } else {
            None
        };

        Self {
            pattern,
            kind,
            regex,
        }
    }

    /// Parses an ordered list of patterns.
    #[must_use]
    pub fn parse_all<S: AsRef<str>>(patterns: &[S]) -> Vec<Self> {
        patterns
            .iter()
            .map(AsRef::as_ref)
            .filter(|p| !p.trim().is_empty())
            .map(Self::parse)
            .collect()
    }

    /// The raw pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The pattern classification.
    #[must_use]
    pub const fn kind(&self) -> BypassKind {
        self.kind
    }

    /// Checks the rule against a URL already normalized by [`NormalizedUrl`].
    fn matches(&self, url: &NormalizedUrl<'_>) -> bool {
        if self.pattern.trim_end_matches('/') == url.normalized {
            return true;
        }

        match self.kind {
            BypassKind::Exact => false,
            BypassKind::SchemeAgnostic => {
                strip_scheme(&self.pattern).trim_end_matches('/') == url.scheme_agnostic
            }
            BypassKind::Wildcard => {
                let prefix = &self.pattern[..self.pattern.len() - 1];
                if has_explicit_scheme(prefix) {
                    url.normalized.starts_with(prefix)
                } else {
                    url.scheme_agnostic.starts_with(strip_scheme(prefix))
                }
            }
            BypassKind::Regex => self
                .regex
                .as_ref()
                .is_some_and(|re| re.is_match(url.normalized)),
        }
    }
}

/// A URL prepared for bypass comparison.
struct NormalizedUrl<'a> {
    normalized: &'a str,
    scheme_agnostic: &'a str,
}

impl<'a> NormalizedUrl<'a> {
    fn new(url: &'a str) -> Self {
        let normalized = url.trim_end_matches('/');
        let scheme_agnostic = SCHEME_RE
            .find(normalized)
            .map_or(normalized, |m| &normalized[m.end()..]);
        Self {
            normalized,
            scheme_agnostic,
        }
    }
}

fn has_explicit_scheme(pattern: &str) -> bool {
    SCHEME_RE.is_match(pattern)
}

fn strip_scheme(pattern: &str) -> &str {
    SCHEME_OR_SLASHES_RE
        .find(pattern)
        .map_or(pattern, |m| &pattern[m.end()..])
}

/// Ordered bypass rule set; the first matching rule wins.
#[derive(Debug, Clone, Default)]
pub struct BypassMatcher {
    rules: Vec<BypassRule>,
}

impl BypassMatcher {
    /// Creates a matcher over already parsed rules.
    #[must_use]
    pub fn new(rules: Vec<BypassRule>) -> Self {
        Self { rules }
    }

    /// Creates a matcher from raw patterns.
    #[must_use]
    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> Self {
        Self::new(BypassRule::parse_all(patterns))
    }

    /// Returns the first rule matching `url`, if any.
    #[must_use]
    pub fn find(&self, url: &str) -> Option<&BypassRule> {
        if self.rules.is_empty() {
            return None;
        }
        let normalized = NormalizedUrl::new(url);
        self.rules.iter().find(|rule| rule.matches(&normalized))
    }

    /// Returns true when `url` must skip rewriting.
    #[must_use]
    pub fn is_bypassed(&self, url: &str) -> bool {
        self.find(url).is_some()
    }

    /// The configured rules, in declaration order.
    #[must_use]
    pub fn rules(&self) -> &[BypassRule] {
        &self.rules
    }
}
