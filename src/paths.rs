//! Centralized path and filename parsing for storage-relative paths.
//!
//! Every path handed to the [`Storage`](crate::storage::Storage) port is a
//! forward-slash separated path relative to the media root. This module is the
//! single place that splits such paths into their parts, so the file entity,
//! the namers and the version resolver agree on what `head`, `filename_root`
//! and `extension` mean:
//!
//! - `uploads/2024/photo.final.JPG` → head `uploads/2024`, filename
//!   `photo.final.JPG`, root `photo.final`, extension `.JPG`
//! - `photo` → head `""`, root `photo`, extension `""`
//! - `.hidden` → root `.hidden`, extension `""` (a leading dot is not an extension)

/// Result of splitting a storage path like `uploads/2024/photo.jpg`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPath {
    /// Normalized full path (forward slashes, no trailing slash).
    pub path: String,
    /// Parent directory, empty for top-level entries.
    pub head: String,
    /// Last path component.
    pub filename: String,
    /// Filename without its extension.
    pub root: String,
    /// Extension including the leading dot, case preserved. Empty if none.
    pub extension: String,
}

/// Normalize a storage path: backslashes become `/`, duplicate and trailing
/// separators are dropped, `.` segments are removed and `..` cancels the
/// segment before it. A `..` at the root is dropped, so a normalized path
/// never rises above the media root.
pub fn normalize(path: &str) -> String {
    let replaced = path.replace('\\', "/");
    let absolute = replaced.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for part in replaced.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            part => parts.push(part),
        }
    }
    let joined = parts.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Split a filename into `(root, extension)`.
///
/// Mirrors the usual `splitext` rules: the extension starts at the last dot,
/// unless that dot is the first character of the name.
pub fn split_extension(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(0) | None => (filename, ""),
        Some(idx) => filename.split_at(idx),
    }
}

/// Parse a storage path into its parts.
pub fn parse_path(path: &str) -> ParsedPath {
    let path = normalize(path);
    let (head, filename) = match path.rfind('/') {
        Some(idx) => (path[..idx].to_string(), path[idx + 1..].to_string()),
        None => (String::new(), path.clone()),
    };
    let (root, extension) = split_extension(&filename);
    ParsedPath {
        root: root.to_string(),
        extension: extension.to_string(),
        head,
        filename,
        path,
    }
}

/// Join path segments with `/`, skipping empty segments.
pub fn join<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let joined = parts
        .into_iter()
        .map(|p| p.as_ref().trim_matches('/').to_string())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    normalize(&joined)
}

/// Strip `root` from the front of `path`, comparing whole segments.
///
/// Returns `path` unchanged when it does not live under `root`.
pub fn strip_prefix<'a>(path: &'a str, root: &str) -> &'a str {
    let root = root.trim_matches('/');
    if root.is_empty() {
        return path.trim_start_matches('/');
    }
    let trimmed = path.trim_start_matches('/');
    match trimmed.strip_prefix(root) {
        Some("") => "",
        Some(rest) if rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => path,
    }
}

/// Whether `path` is `dir` itself or lives somewhere below it.
pub fn is_within(path: &str, dir: &str) -> bool {
    let dir = dir.trim_matches('/');
    if dir.is_empty() {
        return false;
    }
    let path = path.trim_matches('/');
    path == dir || path.starts_with(&format!("{dir}/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_nested_path() {
        let p = parse_path("uploads/2024/photo.jpg");
        assert_eq!(p.head, "uploads/2024");
        assert_eq!(p.filename, "photo.jpg");
        assert_eq!(p.root, "photo");
        assert_eq!(p.extension, ".jpg");
    }

    #[test]
    fn parse_keeps_extension_case() {
        let p = parse_path("photo.final.JPG");
        assert_eq!(p.root, "photo.final");
        assert_eq!(p.extension, ".JPG");
        assert_eq!(format!("{}{}", p.root, p.extension), p.filename);
    }

    #[test]
    fn parse_top_level_without_extension() {
        let p = parse_path("README");
        assert_eq!(p.head, "");
        assert_eq!(p.root, "README");
        assert_eq!(p.extension, "");
    }

    #[test]
    fn parse_hidden_file_has_no_extension() {
        let p = parse_path("uploads/.hidden");
        assert_eq!(p.root, ".hidden");
        assert_eq!(p.extension, "");
    }

    #[test]
    fn normalize_resolves_parent_segments() {
        assert_eq!(normalize("uploads/2024/../photo.jpg"), "uploads/photo.jpg");
        assert_eq!(normalize("uploads/../../etc/x"), "etc/x");
        assert_eq!(normalize("/../a"), "/a");
        assert_eq!(normalize(".."), "");
    }

    #[test]
    fn parse_normalizes_backslashes() {
        let p = parse_path(r"uploads\sub\photo.png");
        assert_eq!(p.path, "uploads/sub/photo.png");
        assert_eq!(p.head, "uploads/sub");
    }

    #[test]
    fn head_and_filename_rebuild_path() {
        for raw in ["a/b/c.jpg", "c.jpg", "a//b/./c.jpg", "a/b/"] {
            let p = parse_path(raw);
            let rebuilt = join([p.head.as_str(), p.filename.as_str()]);
            assert_eq!(rebuilt, p.path, "for {raw}");
        }
    }

    #[test]
    fn join_skips_empty_parts() {
        assert_eq!(join(["_versions", "", "sub/", "photo.jpg"]), "_versions/sub/photo.jpg");
        assert_eq!(join(["", "photo.jpg"]), "photo.jpg");
    }

    #[test]
    fn strip_prefix_whole_segments_only() {
        assert_eq!(strip_prefix("uploads/sub/a.jpg", "uploads/"), "sub/a.jpg");
        assert_eq!(strip_prefix("uploads", "uploads"), "");
        assert_eq!(strip_prefix("uploadsx/a.jpg", "uploads"), "uploadsx/a.jpg");
        assert_eq!(strip_prefix("a.jpg", ""), "a.jpg");
    }

    #[test]
    fn is_within_directory() {
        assert!(is_within("_versions/a.jpg", "_versions"));
        assert!(is_within("_versions", "_versions/"));
        assert!(!is_within("_versions2/a.jpg", "_versions"));
        assert!(!is_within("a.jpg", ""));
    }
}
