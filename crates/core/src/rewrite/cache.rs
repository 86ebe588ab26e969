//! Request-scoped memoization of rewrite results.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Maps an original URL to its rewritten form for the lifetime of one request.
///
/// An entry is written once and never replaced.
#[derive(Debug, Default)]
pub struct RewriteCache {
    entries: HashMap<String, String>,
}

impl RewriteCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the memoized result for `url`.
    #[must_use]
    pub fn get(&self, url: &str) -> Option<&str> {
        self.entries.get(url).map(String::as_str)
    }

    /// Records `rewritten` for `url` unless an entry already exists, and
    /// returns the stored value.
    pub fn insert(&mut self, url: &str, rewritten: String) -> &str {
        match self.entries.entry(url.to_string()) {
            Entry::Occupied(entry) => {
                if entry.get() != &rewritten {
                    tracing::warn!(
                        url = %url,
                        cached = %entry.get(),
                        computed = %rewritten,
                        "rewrite cache conflict, keeping first result"
                    );
                }
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(rewritten),
        }
    }

    /// Number of memoized URLs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when nothing has been memoized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
