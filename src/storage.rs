//! The storage port and its local filesystem implementation.
//!
//! All file I/O in the crate goes through the [`Storage`] trait: the file
//! entity asks it for metadata, the version resolver reads originals from it
//! and writes derived files back to it, and the batch commands walk it. Paths
//! are forward-slash separated and relative to the storage root; see
//! [`paths`](crate::paths).
//!
//! [`FileSystemStorage`] is the production implementation. Its `save` never
//! overwrites: when the requested name is taken it stores the bytes under
//! `{root}_{n}{ext}` and returns that name, so callers that need a fixed
//! destination must delete first or move the stored file into place.

use crate::paths;
use chrono::{DateTime, Utc};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl StorageError {
    fn io(path: &str, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            StorageError::NotFound(path.to_string())
        } else {
            StorageError::Io {
                path: path.to_string(),
                source,
            }
        }
    }
}

/// Abstract file storage rooted at a media directory.
///
/// Implementations must be safe to share between threads; the batch commands
/// call into one storage from a rayon pool.
pub trait Storage: Send + Sync {
    fn exists(&self, path: &str) -> bool;

    fn isdir(&self, path: &str) -> bool;

    fn isfile(&self, path: &str) -> bool;

    /// Open a file for reading.
    fn open(&self, path: &str) -> Result<Box<dyn Read + Send>, StorageError>;

    /// Store `content` at `path`, returning the name it was actually stored
    /// under (which differs from `path` when that name was already taken).
    fn save(&self, path: &str, content: &mut dyn Read) -> Result<String, StorageError>;

    fn delete(&self, path: &str) -> Result<(), StorageError>;

    /// Delete a directory and everything below it.
    fn rmtree(&self, path: &str) -> Result<(), StorageError>;

    /// Move a file. Fails with [`StorageError::AlreadyExists`] when `dst`
    /// exists and `allow_overwrite` is false.
    fn move_file(&self, src: &str, dst: &str, allow_overwrite: bool) -> Result<(), StorageError>;

    /// List a directory as `(directories, files)`, each sorted by name.
    fn listdir(&self, path: &str) -> Result<(Vec<String>, Vec<String>), StorageError>;

    fn modified_time(&self, path: &str) -> Result<DateTime<Utc>, StorageError>;

    fn size(&self, path: &str) -> Result<u64, StorageError>;

    fn url(&self, path: &str) -> String;

    /// Absolute filesystem path, for storages backed by a local disk.
    fn path(&self, path: &str) -> Option<PathBuf>;

    /// Read a whole file into memory.
    fn read_bytes(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.open(path)?;
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .map_err(|e| StorageError::io(path, e))?;
        Ok(buf)
    }

    /// All files below `path`, as storage-relative paths in sorted order.
    ///
    /// The default implementation recurses through [`Storage::listdir`].
    fn walk_files(&self, path: &str) -> Result<Vec<String>, StorageError> {
        let mut out = Vec::new();
        let (dirs, files) = self.listdir(path)?;
        for dir in dirs {
            out.extend(self.walk_files(&paths::join([path, dir.as_str()]))?);
        }
        out.extend(files.iter().map(|f| paths::join([path, f.as_str()])));
        out.sort();
        Ok(out)
    }
}

/// Storage on the local filesystem below `location`.
#[derive(Debug, Clone)]
pub struct FileSystemStorage {
    location: PathBuf,
    base_url: String,
}

impl FileSystemStorage {
    pub fn new(location: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            base_url: base_url.into(),
        }
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let clean = paths::normalize(path);
        self.location.join(clean.trim_start_matches('/'))
    }

    fn available_name(&self, path: &str) -> String {
        if !self.exists(path) {
            return path.to_string();
        }
        let parsed = paths::parse_path(path);
        (1..)
            .map(|n| {
                paths::join([
                    parsed.head.as_str(),
                    &format!("{}_{}{}", parsed.root, n, parsed.extension),
                ])
            })
            .find(|candidate| !self.exists(candidate))
            .unwrap_or_else(|| path.to_string())
    }
}

impl Storage for FileSystemStorage {
    fn exists(&self, path: &str) -> bool {
        self.resolve(path).exists()
    }

    fn isdir(&self, path: &str) -> bool {
        self.resolve(path).is_dir()
    }

    fn isfile(&self, path: &str) -> bool {
        self.resolve(path).is_file()
    }

    fn open(&self, path: &str) -> Result<Box<dyn Read + Send>, StorageError> {
        let file = fs::File::open(self.resolve(path)).map_err(|e| StorageError::io(path, e))?;
        Ok(Box::new(io::BufReader::new(file)))
    }

    fn save(&self, path: &str, content: &mut dyn Read) -> Result<String, StorageError> {
        let name = self.available_name(&paths::normalize(path));
        let full = self.resolve(&name);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(&name, e))?;
        }
        let mut file = fs::File::create(&full).map_err(|e| StorageError::io(&name, e))?;
        io::copy(content, &mut file).map_err(|e| StorageError::io(&name, e))?;
        Ok(name)
    }

    fn delete(&self, path: &str) -> Result<(), StorageError> {
        fs::remove_file(self.resolve(path)).map_err(|e| StorageError::io(path, e))
    }

    fn rmtree(&self, path: &str) -> Result<(), StorageError> {
        fs::remove_dir_all(self.resolve(path)).map_err(|e| StorageError::io(path, e))
    }

    fn move_file(&self, src: &str, dst: &str, allow_overwrite: bool) -> Result<(), StorageError> {
        if !self.exists(src) {
            return Err(StorageError::NotFound(src.to_string()));
        }
        if self.exists(dst) && !allow_overwrite {
            return Err(StorageError::AlreadyExists(dst.to_string()));
        }
        let (from, to) = (self.resolve(src), self.resolve(dst));
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(dst, e))?;
        }
        if fs::rename(&from, &to).is_err() {
            // rename fails across devices; fall back to copy + remove
            fs::copy(&from, &to).map_err(|e| StorageError::io(dst, e))?;
            fs::remove_file(&from).map_err(|e| StorageError::io(src, e))?;
        }
        Ok(())
    }

    fn listdir(&self, path: &str) -> Result<(Vec<String>, Vec<String>), StorageError> {
        let mut dirs = Vec::new();
        let mut files = Vec::new();
        for entry in fs::read_dir(self.resolve(path)).map_err(|e| StorageError::io(path, e))? {
            let entry = entry.map_err(|e| StorageError::io(path, e))?;
            let name = entry.file_name().to_string_lossy().to_string();
            if entry.path().is_dir() {
                dirs.push(name);
            } else {
                files.push(name);
            }
        }
        dirs.sort();
        files.sort();
        Ok((dirs, files))
    }

    fn modified_time(&self, path: &str) -> Result<DateTime<Utc>, StorageError> {
        let meta = fs::metadata(self.resolve(path)).map_err(|e| StorageError::io(path, e))?;
        let modified = meta.modified().map_err(|e| StorageError::io(path, e))?;
        Ok(DateTime::<Utc>::from(modified))
    }

    fn size(&self, path: &str) -> Result<u64, StorageError> {
        let meta = fs::metadata(self.resolve(path)).map_err(|e| StorageError::io(path, e))?;
        Ok(meta.len())
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            paths::normalize(path).trim_start_matches('/')
        )
    }

    fn path(&self, path: &str) -> Option<PathBuf> {
        Some(self.resolve(path))
    }

    /// Walks with `walkdir` without following symlinks, so link cycles
    /// cannot recurse forever.
    fn walk_files(&self, path: &str) -> Result<Vec<String>, StorageError> {
        let base = self.resolve(path);
        if !base.is_dir() {
            return Err(StorageError::NotFound(path.to_string()));
        }
        let mut out = Vec::new();
        for entry in WalkDir::new(&base).min_depth(1).follow_links(false) {
            let entry = entry.map_err(|e| StorageError::Io {
                path: path.to_string(),
                source: e.into(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(rel) = entry.path().strip_prefix(&self.location) {
                out.push(paths::normalize(&rel.to_string_lossy()));
            }
        }
        out.sort();
        Ok(out)
    }
}

/// Apply a Unix mode to a file on disk. A no-op on other platforms.
#[cfg(unix)]
pub fn apply_permissions(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
pub fn apply_permissions(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}
