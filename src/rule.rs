//! Folder rules and extension normalization.
//!
//! A [`FolderRule`] maps a set of file extensions to a destination directory.
//! Extensions are always stored normalized: lowercase with exactly one
//! leading `.` (for example `".jpg"`).

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// Separator that prefixes every normalized extension.
pub const EXTENSION_SEPARATOR: char = '.';

/// Stable identity of a rule within a [`RuleStore`](crate::RuleStore).
///
/// Ids are handed out when a rule enters the store and are never reused
/// during the lifetime of that store, so they stay valid across removals
/// of other rules. They are not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(pub(crate) u64);

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A destination folder together with the extensions routed to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderRule {
    pub(crate) id: RuleId,
    /// Display label, by default the last segment of `path`.
    pub name: String,
    /// Destination directory, created on demand when a file is moved.
    pub path: PathBuf,
    /// Normalized extensions, kept sorted.
    pub exts: BTreeSet<String>,
}

impl FolderRule {
    pub(crate) fn new(id: RuleId, name: String, path: PathBuf, exts: BTreeSet<String>) -> Self {
        Self {
            id,
            name,
            path,
            exts,
        }
    }

    /// Returns the stable identity of this rule.
    pub fn id(&self) -> RuleId {
        self.id
    }

    /// Returns true if `ext` (already normalized) is routed by this rule.
    pub fn matches(&self, ext: &str) -> bool {
        self.exts.contains(ext)
    }

    /// Label used when listing rules, e.g. `Images  [ .jpg, .png ]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use file_sorter::RuleStore;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let mut store = RuleStore::new(dir.path().join("rules.json"));
    /// store.load();
    /// let rule = store
    ///     .add(dir.path().join("Images"), file_sorter::parse_extensions("png, jpg"))
    ///     .unwrap();
    /// assert_eq!(rule.label(), "Images  [ .jpg, .png ]");
    /// ```
    pub fn label(&self) -> String {
        if self.exts.is_empty() {
            return self.name.clone();
        }
        let exts: Vec<&str> = self.exts.iter().map(String::as_str).collect();
        format!("{}  [ {} ]", self.name, exts.join(", "))
    }

    /// Extension list as editable text without separators, e.g. `jpg, png`.
    ///
    /// Feeding the result back through [`parse_extensions`] yields the same set.
    pub fn extensions_text(&self) -> String {
        self.exts
            .iter()
            .map(|ext| ext.trim_start_matches(EXTENSION_SEPARATOR))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Derives the display name of a rule from its destination path.
///
/// Uses the last path segment, or the whole path when there is none
/// (for example a filesystem root).
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Normalizes a single extension: trims whitespace, lowercases and
/// ensures exactly one leading separator.
///
/// An input that is empty (or consists only of separators) yields an
/// empty string, which no rule ever contains.
///
/// # Examples
///
/// ```
/// use file_sorter::normalize_extension;
///
/// assert_eq!(normalize_extension("JPG"), ".jpg");
/// assert_eq!(normalize_extension(".Png"), ".png");
/// assert_eq!(normalize_extension("..tar"), ".tar");
/// assert_eq!(normalize_extension(""), "");
/// ```
pub fn normalize_extension(ext: &str) -> String {
    let bare = ext.trim().trim_start_matches(EXTENSION_SEPARATOR);
    if bare.is_empty() {
        return String::new();
    }
    format!("{}{}", EXTENSION_SEPARATOR, bare.to_lowercase())
}

/// Parses comma-separated user input into a set of normalized extensions.
///
/// Empty tokens are discarded and duplicates collapse.
///
/// # Examples
///
/// ```
/// use file_sorter::parse_extensions;
///
/// let exts = parse_extensions("jpg, PNG , .pdf");
/// assert_eq!(
///     exts.into_iter().collect::<Vec<_>>(),
///     vec![".jpg", ".pdf", ".png"]
/// );
/// ```
pub fn parse_extensions(text: &str) -> BTreeSet<String> {
    text.split(',')
        .map(normalize_extension)
        .filter(|ext| !ext.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(exts: &str) -> FolderRule {
        FolderRule::new(
            RuleId(1),
            "Images".to_string(),
            PathBuf::from("/tmp/Images"),
            parse_extensions(exts),
        )
    }

    #[test]
    fn test_parse_extensions_normalizes_case_and_separator() {
        let exts = parse_extensions("jpg, PNG , .pdf");
        let expected: BTreeSet<String> = [".jpg", ".png", ".pdf"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(exts, expected);
    }

    #[test]
    fn test_parse_extensions_discards_empty_tokens() {
        assert!(parse_extensions("").is_empty());
        assert!(parse_extensions(" , ,, . ").is_empty());
        assert_eq!(parse_extensions(",jpg,,").len(), 1);
    }

    #[test]
    fn test_parse_extensions_collapses_duplicates() {
        let exts = parse_extensions("jpg, .JPG, Jpg, ..jpg");
        assert_eq!(exts.len(), 1);
        assert!(exts.contains(".jpg"));
    }

    #[test]
    fn test_normalize_extension_single_separator() {
        assert_eq!(normalize_extension("...Mp3"), ".mp3");
        assert_eq!(normalize_extension("  gz "), ".gz");
        assert_eq!(normalize_extension("."), "");
    }

    #[test]
    fn test_display_name_uses_last_segment() {
        assert_eq!(display_name(Path::new("/home/user/Images")), "Images");
        assert_eq!(display_name(Path::new("/")), "/");
    }

    #[test]
    fn test_label_and_extensions_text() {
        let r = rule("png, jpg");
        assert_eq!(r.label(), "Images  [ .jpg, .png ]");
        assert_eq!(r.extensions_text(), "jpg, png");
        assert_eq!(parse_extensions(&r.extensions_text()), r.exts);

        let empty = rule("");
        assert_eq!(empty.label(), "Images");
        assert_eq!(empty.extensions_text(), "");
    }

    #[test]
    fn test_matches_requires_normalized_input() {
        let r = rule("jpg");
        assert!(r.matches(".jpg"));
        assert!(!r.matches("jpg"));
        assert!(!r.matches(""));
    }

    #[test]
    fn test_rule_id_display() {
        assert_eq!(RuleId(7).to_string(), "#7");
    }
}
