//! Small string helpers shared by the text-based parsers.

use std::path::Path;

/// Trait extension utility for [`str`].
pub trait StrExtension {
    /// Returns `true` if `needle` is a prefix of the string regardless of its case.
    fn starts_with_ignore_case(&self, needle: &str) -> bool;

    /// Returns `true` if `needle` is a suffix of the string regardless of its case.
    fn ends_with_ignore_case(&self, needle: &str) -> bool;

    /// Returns a string slice with the prefix removed regardless of its case.
    fn strip_prefix_ignore_case(&self, prefix: &str) -> Option<&Self>;

    /// Returns a string slice with the suffix removed regardless of its case.
    fn strip_suffix_ignore_case(&self, suffix: &str) -> Option<&Self>;
}

impl StrExtension for str {
    fn starts_with_ignore_case(&self, needle: &str) -> bool {
        let n = needle.len();
        self.len() >= n && self.is_char_boundary(n) && needle.eq_ignore_ascii_case(&self[..n])
    }

    fn ends_with_ignore_case(&self, needle: &str) -> bool {
        let Some(start) = self.len().checked_sub(needle.len()) else {
            return false;
        };
        self.is_char_boundary(start) && needle.eq_ignore_ascii_case(&self[start..])
    }

    fn strip_prefix_ignore_case(&self, prefix: &str) -> Option<&Self> {
        self.starts_with_ignore_case(prefix)
            .then(|| &self[prefix.len()..])
            .filter(|s| !s.is_empty())
    }

    fn strip_suffix_ignore_case(&self, suffix: &str) -> Option<&Self> {
        self.ends_with_ignore_case(suffix)
            .then(|| &self[..self.len() - suffix.len()])
            .filter(|s| !s.is_empty())
    }
}

/// Returns `true` if the file name of `path` ends with `suffix`, ignoring ASCII case.
pub(crate) fn has_suffix(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with_ignore_case(suffix))
}

/// The file stem of `path` as UTF-8, or an empty string.
pub(crate) fn file_stem(path: &Path) -> &str {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default()
}
