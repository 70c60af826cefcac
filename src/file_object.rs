//! The file entity: one storage path plus everything derived from it.
//!
//! A [`FileObject`] is immutable once built. Path parts are split eagerly;
//! properties that need storage or codec I/O (`filetype`, `filesize`,
//! `dimensions`, ...) are computed on first use and memoized in `OnceLock`s,
//! so a `FileObject` can be shared across rayon workers.
//!
//! Version helpers (`versions`, `version_path`, `original`) only compute
//! names and paths; they never check that the files exist.

use crate::config::{FOLDER, IMAGE};
use crate::generator::{GenerateOptions, VersionError, VersionGenerator};
use crate::imaging::Dimensions;
use crate::namers::NamingContext;
use crate::paths::{self, ParsedPath};
use crate::site::Site;
use crate::storage::StorageError;
use crate::versions::VersionSpec;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Landscape when width >= height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Landscape,
    Portrait,
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Landscape => f.write_str("landscape"),
            Orientation::Portrait => f.write_str("portrait"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct FileObject {
    site: Site,
    parsed: ParsedPath,
    filetype: OnceLock<Option<String>>,
    exists: OnceLock<bool>,
    filesize: OnceLock<Option<u64>>,
    modified: OnceLock<Option<DateTime<Utc>>>,
    dimensions: OnceLock<Option<Dimensions>>,
    version_id: OnceLock<Option<String>>,
}

impl FileObject {
    pub fn new(path: &str, site: &Site) -> Self {
        Self {
            site: site.clone(),
            parsed: paths::parse_path(path),
            filetype: OnceLock::new(),
            exists: OnceLock::new(),
            filesize: OnceLock::new(),
            modified: OnceLock::new(),
            dimensions: OnceLock::new(),
            version_id: OnceLock::new(),
        }
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    // =========================================================================
    // Path parts
    // =========================================================================

    pub fn path(&self) -> &str {
        &self.parsed.path
    }

    pub fn head(&self) -> &str {
        &self.parsed.head
    }

    pub fn filename(&self) -> &str {
        &self.parsed.filename
    }

    pub fn filename_lower(&self) -> String {
        self.parsed.filename.to_lowercase()
    }

    pub fn filename_root(&self) -> &str {
        &self.parsed.root
    }

    /// Extension with leading dot, case preserved.
    pub fn extension(&self) -> &str {
        &self.parsed.extension
    }

    pub fn url(&self) -> String {
        self.site.storage.url(self.path())
    }

    /// Path relative to the media directory.
    pub fn path_relative_directory(&self) -> &str {
        paths::strip_prefix(self.path(), &self.site.config.media_directory())
    }

    /// Parent directory relative to the media directory.
    pub fn folder(&self) -> &str {
        paths::strip_prefix(self.head(), &self.site.config.media_directory())
    }

    // =========================================================================
    // Storage-backed properties
    // =========================================================================

    /// Category from the extension table, `Folder` for directories.
    pub fn filetype(&self) -> Option<&str> {
        self.filetype
            .get_or_init(|| {
                if self.site.storage.isdir(self.path()) {
                    return Some(FOLDER.to_string());
                }
                self.site
                    .config
                    .category_for(self.extension())
                    .map(str::to_string)
            })
            .as_deref()
    }

    pub fn is_folder(&self) -> bool {
        self.filetype() == Some(FOLDER)
    }

    pub fn is_image(&self) -> bool {
        self.filetype() == Some(IMAGE)
    }

    /// True for a directory without entries.
    pub fn is_empty(&self) -> bool {
        self.is_folder()
            && self
                .site
                .storage
                .listdir(self.path())
                .is_ok_and(|(dirs, files)| dirs.is_empty() && files.is_empty())
    }

    pub fn exists(&self) -> bool {
        *self
            .exists
            .get_or_init(|| self.site.storage.exists(self.path()))
    }

    pub fn filesize(&self) -> Option<u64> {
        *self
            .filesize
            .get_or_init(|| self.site.storage.size(self.path()).ok())
    }

    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        *self
            .modified
            .get_or_init(|| self.site.storage.modified_time(self.path()).ok())
    }

    /// Modification time as a Unix timestamp.
    pub fn date(&self) -> Option<i64> {
        self.datetime().map(|dt| dt.timestamp())
    }

    /// Pixel size of an image; `None` for other files and unreadable images.
    pub fn dimensions(&self) -> Option<Dimensions> {
        *self.dimensions.get_or_init(|| {
            if !self.is_image() {
                return None;
            }
            let data = self.site.storage.read_bytes(self.path()).ok()?;
            match self.site.backend.identify(&data) {
                Ok(dims) => Some(dims),
                Err(e) => {
                    debug!(path = %self.path(), error = %e, "could not read image dimensions");
                    None
                }
            }
        })
    }

    pub fn width(&self) -> Option<u32> {
        self.dimensions().map(|d| d.width)
    }

    pub fn height(&self) -> Option<u32> {
        self.dimensions().map(|d| d.height)
    }

    pub fn aspectratio(&self) -> Option<f64> {
        self.dimensions()
            .filter(|d| d.height > 0)
            .map(|d| d.width as f64 / d.height as f64)
    }

    pub fn orientation(&self) -> Option<Orientation> {
        self.dimensions().map(|d| {
            if d.width >= d.height {
                Orientation::Landscape
            } else {
                Orientation::Portrait
            }
        })
    }

    // =========================================================================
    // Versions
    // =========================================================================

    /// Identifier of the version this file is, per the site's namer.
    pub fn version_id(&self) -> Option<&str> {
        self.version_id
            .get_or_init(|| {
                self.site
                    .namer
                    .version_id(self.filename_root(), &self.site.config.versions)
            })
            .as_deref()
    }

    pub fn is_version(&self) -> bool {
        self.version_id().is_some()
    }

    /// Directory the versions of this file are rooted at: the versions tree
    /// when configured and present, otherwise the file's own directory.
    pub fn versions_basedir(&self) -> String {
        self.site
            .versions_root()
            .unwrap_or_else(|| self.head().to_string())
    }

    /// Directory the versions of this file are written to.
    ///
    /// Inside a versions tree the original's position below the media
    /// directory is mirrored.
    pub fn version_dir(&self) -> String {
        match self.site.versions_root() {
            Some(root) => paths::join([root.as_str(), self.folder()]),
            None => self.head().to_string(),
        }
    }

    /// Filename of version `id` under a resolved `spec`.
    pub fn version_name_with(&self, id: &str, spec: &VersionSpec) -> String {
        self.site.namer.version_name(&NamingContext {
            root: self.filename_root(),
            extension: self.extension(),
            version_id: id,
            spec,
        })
    }

    pub fn version_path_with(&self, id: &str, spec: &VersionSpec) -> String {
        paths::join([self.version_dir(), self.version_name_with(id, spec)])
    }

    /// Expected storage path of version `id`.
    pub fn version_path(&self, id: &str) -> Result<String, VersionError> {
        let spec = self
            .site
            .config
            .versions
            .get(id)
            .ok_or_else(|| VersionError::UnknownVersion(id.to_string()))?;
        Ok(self.version_path_with(id, spec))
    }

    fn version_paths<'a>(&self, ids: impl Iterator<Item = &'a str>) -> Vec<String> {
        if !self.is_image() {
            return Vec::new();
        }
        ids.filter_map(|id| self.version_path(id).ok()).collect()
    }

    /// Expected paths of every configured version. Empty for non-images.
    pub fn versions(&self) -> Vec<String> {
        self.version_paths(self.site.config.versions.ids())
    }

    /// Expected paths of the admin versions. Empty for non-images.
    pub fn admin_versions(&self) -> Vec<String> {
        self.version_paths(self.site.config.admin_versions.iter().map(String::as_str))
    }

    /// The file this version was derived from, or `self` when not a version.
    ///
    /// The original is not checked for existence.
    pub fn original(&self) -> FileObject {
        if !self.is_version() {
            return self.clone();
        }
        let name = self.site.namer.original_name(
            self.filename_root(),
            self.extension(),
            &self.site.config.versions,
        );
        let head = match self.site.versions_root() {
            Some(root) if paths::is_within(self.head(), &root) => paths::join([
                self.site.config.media_directory().as_str(),
                paths::strip_prefix(self.head(), &root),
            ]),
            _ => self.head().to_string(),
        };
        FileObject::new(&paths::join([head, name]), &self.site)
    }

    pub fn original_filename(&self) -> String {
        self.original().filename().to_string()
    }

    /// Resolve version `id`, regenerating it when missing or stale.
    ///
    /// `Ok(None)` when no version is available (original missing or not
    /// decodable).
    pub fn version_generate(&self, id: &str) -> Result<Option<FileObject>, VersionError> {
        VersionGenerator::new(&self.site).generate(self, id, &GenerateOptions::default())
    }

    // =========================================================================
    // Deletion
    // =========================================================================

    /// Delete the file, or the whole tree for a directory.
    pub fn delete(&self) -> Result<(), StorageError> {
        if self.is_folder() {
            self.site.storage.rmtree(self.path())
        } else {
            self.site.storage.delete(self.path())
        }
    }

    fn delete_paths(&self, paths: Vec<String>) -> usize {
        let mut deleted = 0;
        for path in paths {
            if !self.site.storage.isfile(&path) {
                continue;
            }
            match self.site.storage.delete(&path) {
                Ok(()) => deleted += 1,
                Err(e) => warn!(path = %path, error = %e, "could not delete version"),
            }
        }
        deleted
    }

    /// Delete every existing version file. Returns how many were removed.
    pub fn delete_versions(&self) -> usize {
        self.delete_paths(self.versions())
    }

    pub fn delete_admin_versions(&self) -> usize {
        self.delete_paths(self.admin_versions())
    }
}

impl fmt::Display for FileObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl PartialEq for FileObject {
    fn eq(&self, other: &Self) -> bool {
        self.path() == other.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::namers::NamerKind;
    use crate::test_helpers::{TestMedia, write_jpeg};

    #[test]
    fn path_parts() {
        let media = TestMedia::new();
        let file = FileObject::new("uploads/2024/Photo.JPG", &media.site);
        assert_eq!(file.head(), "uploads/2024");
        assert_eq!(file.filename(), "Photo.JPG");
        assert_eq!(file.filename_lower(), "photo.jpg");
        assert_eq!(file.filename_root(), "Photo");
        assert_eq!(file.extension(), ".JPG");
        assert_eq!(file.folder(), "2024");
        assert_eq!(file.path_relative_directory(), "2024/Photo.JPG");
        assert_eq!(file.url(), "/media/uploads/2024/Photo.JPG");
        assert_eq!(file.to_string(), "uploads/2024/Photo.JPG");
    }

    #[test]
    fn filetype_by_extension_and_folder() {
        let media = TestMedia::new();
        media.mkdir("uploads/empty");
        media.write("uploads/doc.PDF", b"%PDF");

        assert_eq!(FileObject::new("uploads/doc.PDF", &media.site).filetype(), Some("Document"));
        assert_eq!(FileObject::new("uploads/x.jpg", &media.site).filetype(), Some(IMAGE));
        assert_eq!(FileObject::new("uploads/x.zzz", &media.site).filetype(), None);

        let folder = FileObject::new("uploads/empty", &media.site);
        assert!(folder.is_folder());
        assert!(folder.is_empty());
        assert!(!FileObject::new("uploads", &media.site).is_empty());
    }

    #[test]
    fn metadata_of_existing_file() {
        let media = TestMedia::new();
        media.write("uploads/a.txt", b"hello");
        let file = FileObject::new("uploads/a.txt", &media.site);
        assert!(file.exists());
        assert_eq!(file.filesize(), Some(5));
        assert!(file.datetime().is_some());
        assert_eq!(file.date(), file.datetime().map(|d| d.timestamp()));
        assert_eq!(file.dimensions(), None);
    }

    #[test]
    fn missing_file_has_no_metadata() {
        let media = TestMedia::new();
        let file = FileObject::new("uploads/missing.jpg", &media.site);
        assert!(!file.exists());
        assert_eq!(file.filesize(), None);
        assert_eq!(file.dimensions(), None);
        assert_eq!(file.orientation(), None);
    }

    #[test]
    fn image_dimensions_and_orientation() {
        let media = TestMedia::new();
        write_jpeg(&media.site, "uploads/photo.jpg", 100, 50);
        let file = FileObject::new("uploads/photo.jpg", &media.site);
        assert_eq!(file.width(), Some(100));
        assert_eq!(file.height(), Some(50));
        assert_eq!(file.aspectratio(), Some(2.0));
        assert_eq!(file.orientation(), Some(Orientation::Landscape));

        write_jpeg(&media.site, "uploads/tall.jpg", 50, 100);
        let tall = FileObject::new("uploads/tall.jpg", &media.site);
        assert_eq!(tall.orientation(), Some(Orientation::Portrait));
    }

    #[test]
    fn corrupt_image_swallows_decode_error() {
        let media = TestMedia::new();
        media.write("uploads/broken.jpg", b"not a jpeg");
        let file = FileObject::new("uploads/broken.jpg", &media.site);
        assert!(file.is_image());
        assert_eq!(file.dimensions(), None);
    }

    #[test]
    fn version_paths_next_to_original() {
        let media = TestMedia::new();
        let file = FileObject::new("uploads/sub/photo.jpg", &media.site);
        assert_eq!(file.versions_basedir(), "uploads/sub");
        assert_eq!(
            file.version_path("large").unwrap(),
            "uploads/sub/photo_large.jpg"
        );
        assert_eq!(file.versions().len(), 6);
        assert_eq!(
            file.admin_versions(),
            vec![
                "uploads/sub/photo_thumbnail.jpg",
                "uploads/sub/photo_small.jpg",
                "uploads/sub/photo_medium.jpg",
                "uploads/sub/photo_big.jpg",
                "uploads/sub/photo_large.jpg",
            ]
        );
    }

    #[test]
    fn version_paths_in_versions_tree() {
        let media = TestMedia::with_config(Config {
            versions_basedir: "_versions/".to_string(),
            ..Config::default()
        });
        media.mkdir("_versions");
        let file = FileObject::new("uploads/sub/photo.jpg", &media.site);
        assert_eq!(file.versions_basedir(), "_versions");
        assert_eq!(
            file.version_path("large").unwrap(),
            "_versions/sub/photo_large.jpg"
        );
    }

    #[test]
    fn versions_tree_ignored_until_it_exists() {
        let media = TestMedia::with_config(Config {
            versions_basedir: "_versions".to_string(),
            ..Config::default()
        });
        let file = FileObject::new("uploads/photo.jpg", &media.site);
        assert_eq!(file.version_path("small").unwrap(), "uploads/photo_small.jpg");
    }

    #[test]
    fn unknown_version_is_an_error() {
        let media = TestMedia::new();
        let file = FileObject::new("uploads/photo.jpg", &media.site);
        assert!(matches!(
            file.version_path("poster"),
            Err(VersionError::UnknownVersion(id)) if id == "poster"
        ));
    }

    #[test]
    fn non_images_have_no_versions() {
        let media = TestMedia::new();
        let file = FileObject::new("uploads/notes.txt", &media.site);
        assert!(file.versions().is_empty());
        assert!(file.admin_versions().is_empty());
    }

    #[test]
    fn original_of_version() {
        let media = TestMedia::new();
        let version = FileObject::new("uploads/photo_admin_thumbnail.jpg", &media.site);
        assert!(version.is_version());
        assert_eq!(version.version_id(), Some("admin_thumbnail"));
        assert_eq!(version.original().path(), "uploads/photo.jpg");
        assert_eq!(version.original_filename(), "photo.jpg");

        let plain = FileObject::new("uploads/my_holiday.jpg", &media.site);
        assert!(!plain.is_version());
        assert_eq!(plain.original(), plain);
    }

    #[test]
    fn original_of_version_in_versions_tree() {
        let media = TestMedia::with_config(Config {
            versions_basedir: "_versions".to_string(),
            namer: NamerKind::Options,
            ..Config::default()
        });
        media.mkdir("_versions");
        let file = FileObject::new("uploads/sub/photo.jpg", &media.site);
        let path = file.version_path("thumbnail").unwrap();
        assert_eq!(path, "_versions/sub/photo_thumbnail--60x60--crop.jpg");

        let version = FileObject::new(&path, &media.site);
        assert_eq!(version.version_id(), Some("thumbnail"));
        assert_eq!(version.original().path(), "uploads/sub/photo.jpg");
    }

    #[test]
    fn delete_versions_is_best_effort() {
        let media = TestMedia::new();
        write_jpeg(&media.site, "uploads/photo.jpg", 10, 10);
        media.write("uploads/photo_small.jpg", b"x");
        media.write("uploads/photo_large.jpg", b"x");

        let file = FileObject::new("uploads/photo.jpg", &media.site);
        assert_eq!(file.delete_admin_versions(), 2);
        assert!(!media.site.storage.exists("uploads/photo_small.jpg"));
        assert_eq!(file.delete_versions(), 0);
        assert!(media.site.storage.exists("uploads/photo.jpg"));
    }

    #[test]
    fn delete_folder_is_recursive() {
        let media = TestMedia::new();
        media.write("uploads/dir/sub/a.txt", b"a");
        let folder = FileObject::new("uploads/dir", &media.site);
        folder.delete().unwrap();
        assert!(!media.site.storage.exists("uploads/dir"));
    }
}
