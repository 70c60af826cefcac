//! Version resolution: return a fresh derived file, regenerating when needed.
//!
//! For one (original, version) pair the lifecycle is
//!
//! ```text
//! Absent ──▶ Generating ──▶ Fresh ──(original touched)──▶ Stale ──▶ Generating ──▶ ...
//! ```
//!
//! Staleness is decided from modification times alone: a version is stale
//! when the original is strictly newer. A fresh version costs two metadata
//! reads and nothing else.
//!
//! Regeneration reads the original through the storage, scales it, runs the
//! post-processors, encodes and writes the result back. A missing or
//! undecodable original is not an error: the caller gets "no version".
//! Images smaller than a non-upscaling version are stored unscaled.
//!
//! There is no locking. Two callers regenerating the same stale version both
//! write it and the last writer wins.

use crate::file_object::FileObject;
use crate::imaging::{
    BackendError, EncodeParams, OutputFormat, ScaleOutcome, apply_processors,
    normalize_color_mode, scale_and_crop,
};
use crate::site::Site;
use crate::storage::{Storage, StorageError, apply_permissions};
use crate::versions::{OptionValue, VersionSpec};
use image::DynamicImage;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum VersionError {
    #[error("Unknown version: {0}")]
    UnknownVersion(String),
    #[error("Encoding {path} failed: {source}")]
    Encode {
        path: String,
        #[source]
        source: BackendError,
    },
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Per-call knobs for [`VersionGenerator::resolve`].
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Skip the staleness check and upscale instead of falling back.
    pub force: bool,
    /// Extra naming options merged into the version spec for this call.
    pub overrides: BTreeMap<String, OptionValue>,
}

impl GenerateOptions {
    pub fn forced() -> Self {
        Self {
            force: true,
            ..Self::default()
        }
    }
}

/// State of an existing version file relative to its original.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Missing,
    Stale,
    Fresh,
}

/// Compare modification times of `original` and `version`.
pub fn freshness(
    storage: &dyn Storage,
    original: &str,
    version: &str,
) -> Result<Freshness, StorageError> {
    if !storage.isfile(version) {
        return Ok(Freshness::Missing);
    }
    let original_mtime = storage.modified_time(original)?;
    let version_mtime = storage.modified_time(version)?;
    if original_mtime > version_mtime {
        Ok(Freshness::Stale)
    } else {
        Ok(Freshness::Fresh)
    }
}

/// What resolving a version did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// A fresh file already existed.
    Reused,
    /// The version was written.
    Generated,
    /// The original was too small; it was stored unscaled as the version.
    Fallback,
    /// The original is missing or cannot be decoded.
    Unavailable,
}

impl Resolution {
    pub fn as_str(self) -> &'static str {
        match self {
            Resolution::Reused => "reused",
            Resolution::Generated => "generated",
            Resolution::Fallback => "fallback",
            Resolution::Unavailable => "unavailable",
        }
    }

    pub fn is_available(self) -> bool {
        self != Resolution::Unavailable
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`VersionGenerator::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub resolution: Resolution,
    /// Storage path of the version, whether or not it exists.
    pub path: String,
}

pub struct VersionGenerator<'a> {
    site: &'a Site,
}

impl<'a> VersionGenerator<'a> {
    pub fn new(site: &'a Site) -> Self {
        Self { site }
    }

    /// Resolve version `id` of `original`, returning the derived file.
    ///
    /// `Ok(None)` means no version is available.
    pub fn generate(
        &self,
        original: &FileObject,
        id: &str,
        options: &GenerateOptions,
    ) -> Result<Option<FileObject>, VersionError> {
        let resolved = self.resolve(original, id, options)?;
        Ok(resolved
            .resolution
            .is_available()
            .then(|| FileObject::new(&resolved.path, self.site)))
    }

    /// Resolve version `id` of `original` and report what happened.
    pub fn resolve(
        &self,
        original: &FileObject,
        id: &str,
        options: &GenerateOptions,
    ) -> Result<Resolved, VersionError> {
        let spec = self
            .site
            .config
            .versions
            .get(id)
            .ok_or_else(|| VersionError::UnknownVersion(id.to_string()))?
            .with_overrides(&options.overrides);
        let path = original.version_path_with(id, &spec);

        if !options.force {
            match freshness(self.site.storage.as_ref(), original.path(), &path) {
                Ok(Freshness::Fresh) => {
                    debug!(path = %original.path(), version = id, "version is fresh");
                    return Ok(Resolved {
                        resolution: Resolution::Reused,
                        path,
                    });
                }
                Ok(state) => {
                    debug!(path = %original.path(), version = id, ?state, "regenerating version");
                }
                Err(StorageError::NotFound(_)) => {
                    warn!(path = %original.path(), version = id, "original not found");
                    return Ok(Resolved {
                        resolution: Resolution::Unavailable,
                        path,
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }

        let resolution = self.regenerate(original, &spec, &path, options.force)?;
        Ok(Resolved { resolution, path })
    }

    fn regenerate(
        &self,
        original: &FileObject,
        spec: &VersionSpec,
        path: &str,
        force: bool,
    ) -> Result<Resolution, VersionError> {
        let Some(source) = self.load_source(original) else {
            return Ok(Resolution::Unavailable);
        };
        let format =
            OutputFormat::from_extension(original.extension()).ok_or_else(|| VersionError::Encode {
                path: path.to_string(),
                source: BackendError::Encode(format!(
                    "no encoder for '{}' files",
                    original.extension()
                )),
            })?;

        let (image, resolution) = scale(source, spec, force);
        let image = apply_processors(image, &self.site.processors);
        let image = normalize_color_mode(image, format);
        let bytes = self.encode(&image, format, path)?;
        self.store(path, &bytes)?;
        self.apply_permissions(path);

        debug!(path, resolution = %resolution, width = image.width(), height = image.height(), "version written");
        Ok(resolution)
    }

    /// Read and decode the original; `None` when either step fails.
    fn load_source(&self, original: &FileObject) -> Option<DynamicImage> {
        let data = match self.site.storage.read_bytes(original.path()) {
            Ok(data) => data,
            Err(e) => {
                warn!(path = %original.path(), error = %e, "cannot read original");
                return None;
            }
        };
        match self.site.backend.decode(&data) {
            Ok(image) => Some(image),
            Err(e) => {
                warn!(path = %original.path(), error = %e, "cannot decode original");
                None
            }
        }
    }

    /// Encode with the configured quality, retrying once with encoder
    /// defaults when the encoder rejects those parameters.
    fn encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        path: &str,
    ) -> Result<Vec<u8>, VersionError> {
        let backend = self.site.backend.as_ref();
        let params = EncodeParams::for_format(format, self.site.config.quality());
        let result = match backend.encode(image, format, &params) {
            Err(BackendError::UnsupportedParameters(reason)) => {
                debug!(path, reason = %reason, "retrying encode without quality/optimize");
                backend.encode(image, format, &EncodeParams::plain())
            }
            other => other,
        };
        result.map_err(|source| VersionError::Encode {
            path: path.to_string(),
            source,
        })
    }

    /// Write `bytes` to exactly `path`, replacing any previous version.
    fn store(&self, path: &str, bytes: &[u8]) -> Result<(), VersionError> {
        let storage = self.site.storage.as_ref();
        if storage.exists(path) {
            match storage.delete(path) {
                Ok(()) | Err(StorageError::NotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }
        let mut reader = bytes;
        let stored = storage.save(path, &mut reader)?;
        if stored != path {
            storage.move_file(&stored, path, true)?;
        }
        Ok(())
    }

    fn apply_permissions(&self, path: &str) {
        if let Some(mode) = self.site.config.permissions()
            && let Some(fs_path) = self.site.storage.path(path)
            && let Err(e) = apply_permissions(&fs_path, mode)
        {
            warn!(path, mode = %format!("{mode:o}"), error = %e, "cannot set permissions");
        }
    }
}

/// Scale `source` for `spec`. Infeasible requests fall back to the source,
/// or are upscaled when forced.
fn scale(source: DynamicImage, spec: &VersionSpec, force: bool) -> (DynamicImage, Resolution) {
    let (width, height) = (spec.target_width(), spec.target_height());
    let mut outcome = scale_and_crop(&source, width, height, spec.scale_options());
    let mut resolution = Resolution::Generated;
    if matches!(outcome, ScaleOutcome::Infeasible) {
        if force {
            let options = spec.scale_options().with_upscale();
            outcome = scale_and_crop(&source, width, height, options);
        } else {
            resolution = Resolution::Fallback;
        }
    }
    (outcome.into_image(source), resolution)
}
