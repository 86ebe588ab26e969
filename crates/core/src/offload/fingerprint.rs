//! Edit fingerprints: the `-e<hex>` token an image editor embeds in file names.

use std::sync::LazyLock;

use regex::Regex;

static EDITED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)-e[0-9a-f]{10,15}(?:-\d|\.)").expect("edit pattern is valid")
});

static FINGERPRINT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)-e[0-9a-f]{10,15}(-|\.|$)").expect("fingerprint pattern is valid")
});

/// Returns true when `filename` carries an edit fingerprint.
#[must_use]
pub fn is_edited(filename: &str) -> bool {
    EDITED_RE.is_match(filename)
}

/// Removes every edit fingerprint from `filename`.
///
/// `a-e1234567890ab-e1234567890cd-150x150.jpg` becomes `a-150x150.jpg`.
#[must_use]
pub fn strip_fingerprints(filename: &str) -> String {
    let mut current = filename.to_string();
    loop {
        let next = FINGERPRINT_RE.replace_all(&current, "$1").into_owned();
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Key prefix covering every object derived from `file`:
/// `{prefix}/{date dir}/{stem without fingerprints}`.
#[must_use]
pub fn purge_prefix(upload_prefix: &str, file: &str) -> String {
    let (dir, name) = match file.rsplit_once('/') {
        Some((dir, name)) => (dir.trim_matches('/'), name),
        None => ("", file),
    };
    let name = strip_fingerprints(name);
    let stem = name.rsplit_once('.').map_or(name.as_str(), |(stem, _)| stem);

    if dir.is_empty() {
        format!("{upload_prefix}/{stem}")
    } else {
        format!("{upload_prefix}/{dir}/{stem}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_edited() {
        assert!(is_edited("2024/11/photo-e1715012345678.jpg"));
        assert!(is_edited("2024/11/photo-e1715012345678-1.jpg"));
        assert!(is_edited("photo-EABCDEF0123.png"));
        assert!(!is_edited("2024/11/photo.jpg"));
        assert!(!is_edited("2024/11/photo-e123.jpg"));
        assert!(!is_edited("2024/11/photo-e1715012345678x.jpg"));
    }

    #[test]
    fn test_strip_fingerprints() {
        assert_eq!(strip_fingerprints("photo-e1715012345678.jpg"), "photo.jpg");
        assert_eq!(
            strip_fingerprints("photo-e1715012345678-150x150.jpg"),
            "photo-150x150.jpg"
        );
        assert_eq!(
            strip_fingerprints("photo-e1715012345678-e1715012349999-150x150.jpg"),
            "photo-150x150.jpg"
        );
        assert_eq!(strip_fingerprints("photo-e1715012345678"), "photo");
        assert_eq!(strip_fingerprints("photo-edit.jpg"), "photo-edit.jpg");
    }

    #[test]
    fn test_purge_prefix() {
        assert_eq!(
            purge_prefix("uploads/sites/3", "2024/11/photo-e1715012345678.jpg"),
            "uploads/sites/3/2024/11/photo"
        );
        assert_eq!(
            purge_prefix("uploads", "photo-150x150.jpg"),
            "uploads/photo-150x150"
        );
        assert_eq!(purge_prefix("uploads", "2024/11/README"), "uploads/2024/11/README");
    }
}
