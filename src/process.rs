//! Batch operations over a media tree.
//!
//! The library resolves versions one call at a time; this module drives that
//! across a whole directory for the management commands:
//!
//! - [`generate_versions`] regenerates all (or one) versions of every image,
//!   in parallel with [rayon](https://docs.rs/rayon), streaming a
//!   [`ProcessEvent`] per file.
//! - [`remove_versions`] deletes every file that is a version of one id.
//!
//! ## What counts as an original
//!
//! Files are listed through the [`Storage`](crate::storage::Storage) port.
//! A file is skipped when any path segment is hidden (`.name`), when it lies
//! inside the versions tree, when its name parses as a version, or when its
//! extension is not in the `Image` category or has no decoder compiled in.
//!
//! Per-version failures are recorded and reported; they never stop the batch.

use crate::file_object::FileObject;
use crate::generator::{GenerateOptions, Resolution, VersionGenerator};
use crate::imaging::is_supported_extension;
use crate::paths;
use crate::site::Site;
use crate::storage::StorageError;
use rayon::prelude::*;
use std::fmt;
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Unknown version: {0}")]
    UnknownVersion(String),
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Outcome of one version of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionStatus {
    Resolved(Resolution),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionOutcome {
    pub version: String,
    pub path: String,
    pub status: VersionStatus,
}

/// Progress event sent while a batch runs.
#[derive(Debug, Clone)]
pub enum ProcessEvent {
    /// Sent once, before any file is processed.
    Started { file_count: usize, version_count: usize },
    FileProcessed {
        /// 1-based position in the sorted file list.
        index: usize,
        path: String,
        outcomes: Vec<VersionOutcome>,
    },
}

/// Counts per resolution across a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerateStats {
    pub reused: u32,
    pub generated: u32,
    pub fallback: u32,
    pub unavailable: u32,
    pub failed: u32,
}

impl GenerateStats {
    pub fn record(&mut self, status: &VersionStatus) {
        match status {
            VersionStatus::Resolved(Resolution::Reused) => self.reused += 1,
            VersionStatus::Resolved(Resolution::Generated) => self.generated += 1,
            VersionStatus::Resolved(Resolution::Fallback) => self.fallback += 1,
            VersionStatus::Resolved(Resolution::Unavailable) => self.unavailable += 1,
            VersionStatus::Failed(_) => self.failed += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.reused + self.generated + self.fallback + self.unavailable + self.failed
    }
}

impl fmt::Display for GenerateStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.total() == 0 {
            return write!(f, "nothing to do");
        }
        let parts: Vec<String> = [
            (self.reused, "reused"),
            (self.generated, "generated"),
            (self.fallback, "fallback"),
            (self.unavailable, "unavailable"),
            (self.failed, "failed"),
        ]
        .into_iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, label)| format!("{n} {label}"))
        .collect();
        write!(f, "{} ({} total)", parts.join(", "), self.total())
    }
}

/// Result of [`generate_versions`].
#[derive(Debug)]
pub struct GenerateResult {
    pub files: usize,
    pub stats: GenerateStats,
}

/// Directory (or single file) a batch starts from; defaults to the media
/// directory.
fn start_path(site: &Site, target: Option<&str>) -> String {
    target
        .map(paths::normalize)
        .unwrap_or_else(|| site.config.media_directory())
}

fn is_hidden(path: &str) -> bool {
    path.split('/').any(|segment| segment.starts_with('.'))
}

/// Original images under `target`, sorted.
pub fn collect_originals(site: &Site, target: Option<&str>) -> Result<Vec<String>, ProcessError> {
    let start = start_path(site, target);
    let candidates = if site.storage.isfile(&start) {
        vec![start]
    } else if site.storage.isdir(&start) {
        site.storage.walk_files(&start)?
    } else {
        return Err(ProcessError::NotFound(start));
    };

    let versions_root = site.versions_root();
    Ok(candidates
        .into_iter()
        .filter(|path| !is_hidden(path))
        .filter(|path| {
            versions_root
                .as_deref()
                .is_none_or(|root| !paths::is_within(path, root))
        })
        .filter(|path| {
            let file = FileObject::new(path, site);
            if !file.is_image() || file.is_version() {
                return false;
            }
            if !is_supported_extension(file.extension()) {
                debug!(path = %path, "no decoder for extension, skipping");
                return false;
            }
            true
        })
        .collect())
}

/// Regenerate versions of every original under `target`.
///
/// `version` limits the batch to one id. With `force` every version is
/// rewritten, upscaling where needed.
pub fn generate_versions(
    site: &Site,
    target: Option<&str>,
    version: Option<&str>,
    force: bool,
    progress: Option<Sender<ProcessEvent>>,
) -> Result<GenerateResult, ProcessError> {
    let ids: Vec<&str> = match version {
        Some(id) if !site.config.versions.contains(id) => {
            return Err(ProcessError::UnknownVersion(id.to_string()));
        }
        Some(id) => vec![id],
        None => site.config.versions.ids().collect(),
    };
    let files = collect_originals(site, target)?;
    debug!(files = files.len(), versions = ids.len(), "starting batch");

    if let Some(tx) = &progress {
        tx.send(ProcessEvent::Started {
            file_count: files.len(),
            version_count: ids.len(),
        })
        .ok();
    }

    let options = GenerateOptions {
        force,
        ..GenerateOptions::default()
    };
    let outcomes: Vec<Vec<VersionOutcome>> = files
        .par_iter()
        .enumerate()
        .map(|(i, path)| {
            let original = FileObject::new(path, site);
            let outcomes = resolve_all(site, &original, &ids, &options);
            if let Some(tx) = &progress {
                tx.send(ProcessEvent::FileProcessed {
                    index: i + 1,
                    path: path.clone(),
                    outcomes: outcomes.clone(),
                })
                .ok();
            }
            outcomes
        })
        .collect();

    let mut stats = GenerateStats::default();
    for outcome in outcomes.iter().flatten() {
        stats.record(&outcome.status);
    }
    Ok(GenerateResult {
        files: files.len(),
        stats,
    })
}

fn resolve_all(
    site: &Site,
    original: &FileObject,
    ids: &[&str],
    options: &GenerateOptions,
) -> Vec<VersionOutcome> {
    let generator = VersionGenerator::new(site);
    ids.iter()
        .map(|&id| match generator.resolve(original, id, options) {
            Ok(resolved) => VersionOutcome {
                version: id.to_string(),
                path: resolved.path,
                status: VersionStatus::Resolved(resolved.resolution),
            },
            Err(e) => {
                warn!(path = %original.path(), version = id, error = %e, "version failed");
                VersionOutcome {
                    version: id.to_string(),
                    path: original.version_path(id).unwrap_or_default(),
                    status: VersionStatus::Failed(e.to_string()),
                }
            }
        })
        .collect()
}

/// Result of [`remove_versions`].
#[derive(Debug, Default)]
pub struct RemoveReport {
    pub version: String,
    pub dry_run: bool,
    /// Version files found (and deleted unless `dry_run`).
    pub removed: Vec<String>,
    /// Files that could not be deleted, with the reason.
    pub failed: Vec<(String, String)>,
}

/// Delete every version file of `version` under `target`.
///
/// When a versions tree exists, the mirrored directory inside it is searched
/// too. With `dry_run` nothing is deleted.
pub fn remove_versions(
    site: &Site,
    target: Option<&str>,
    version: &str,
    dry_run: bool,
) -> Result<RemoveReport, ProcessError> {
    if !site.config.versions.contains(version) {
        return Err(ProcessError::UnknownVersion(version.to_string()));
    }
    let start = start_path(site, target);
    let mut roots = vec![start.clone()];
    if let Some(versions_root) = site.versions_root() {
        let media = site.config.media_directory();
        let mirrored = if media.is_empty() || paths::is_within(&start, &media) {
            paths::join([versions_root.as_str(), paths::strip_prefix(&start, &media)])
        } else {
            versions_root
        };
        if mirrored != start {
            roots.push(mirrored);
        }
    }

    let mut found = Vec::new();
    for root in roots.iter().filter(|root| site.storage.isdir(root)) {
        for path in site.storage.walk_files(root)? {
            if is_hidden(&path) {
                continue;
            }
            if FileObject::new(&path, site).version_id() == Some(version) {
                found.push(path);
            }
        }
    }
    found.sort();
    found.dedup();

    let mut report = RemoveReport {
        version: version.to_string(),
        dry_run,
        ..RemoveReport::default()
    };
    for path in found {
        if dry_run {
            report.removed.push(path);
            continue;
        }
        match site.storage.delete(&path) {
            Ok(()) => {
                debug!(path = %path, version, "removed version");
                report.removed.push(path);
            }
            Err(e) => {
                warn!(path = %path, version, error = %e, "cannot remove version");
                report.failed.push((path, e.to_string()));
            }
        }
    }
    Ok(report)
}
