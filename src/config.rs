//! Configuration module.
//!
//! Handles loading, validating, and merging the `media-versions.toml` file.
//! Stock defaults are serialized to a TOML table and the user file is merged
//! on top, so a config file only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! location = "media"          # Media root on disk
//! base_url = "/media/"        # URL prefix for files under the media root
//! directory = "uploads/"      # Media directory, relative to location
//! versions_basedir = ""       # Versions tree, relative to location ("" = next to originals)
//! quality = 90                # Encoding quality (1-100)
//! namer = "suffix"            # "suffix" or "options"
//! admin_versions = ["thumbnail", "small", "medium", "big", "large"]
//! admin_thumbnail = "admin_thumbnail"
//! default_permissions = 0o755 # Mode for new version files (0 = leave as created)
//!
//! [versions.thumbnail]
//! verbose_name = "Thumbnail (1 col)"
//! width = 60
//! height = 60
//! opts = ["crop"]
//!
//! [[processors]]
//! kind = "sharpen"
//! sigma = 0.5
//!
//! [processing]
//! max_processes = 4           # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Tables merge key by key: `[versions.thumbnail]` with only `width = 80`
//! keeps the stock height and crop. Unknown keys are rejected to catch typos
//! early.

use crate::imaging::{ProcessorSpec, Quality};
use crate::namers::NamerKind;
use crate::paths;
use crate::versions::{VersionTable, default_versions};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Config file looked up when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "media-versions.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `media-versions.toml`.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Media root on disk.
    pub location: String,
    /// URL prefix for files under `location`.
    pub base_url: String,
    /// Media directory relative to `location`. Its tree is mirrored below
    /// `versions_basedir`.
    pub directory: String,
    /// Root of the versions tree, relative to `location`. Empty keeps versions
    /// next to their originals.
    pub versions_basedir: String,
    /// Encoding quality (1-100).
    pub quality: u32,
    /// Version file naming scheme.
    pub namer: NamerKind,
    /// Versions listed for admin views.
    pub admin_versions: Vec<String>,
    /// Version used as the admin thumbnail.
    pub admin_thumbnail: String,
    /// Mode applied to new version files; `0` leaves them as created.
    pub default_permissions: u32,
    /// File category → extensions (with leading dot).
    pub extensions: BTreeMap<String, Vec<String>>,
    /// Named versions.
    pub versions: VersionTable,
    /// Post-processors run on every version, in order.
    pub processors: Vec<ProcessorSpec>,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            location: "media".to_string(),
            base_url: "/media/".to_string(),
            directory: "uploads/".to_string(),
            versions_basedir: String::new(),
            quality: 90,
            namer: NamerKind::Suffix,
            admin_versions: ["thumbnail", "small", "medium", "big", "large"]
                .map(String::from)
                .to_vec(),
            admin_thumbnail: "admin_thumbnail".to_string(),
            default_permissions: 0o755,
            extensions: default_extensions(),
            versions: default_versions(),
            processors: Vec::new(),
            processing: ProcessingConfig::default(),
        }
    }
}

/// Category used for directories.
pub const FOLDER: &str = "Folder";
/// Category whose files get versions.
pub const IMAGE: &str = "Image";

fn default_extensions() -> BTreeMap<String, Vec<String>> {
    let table: [(&str, &[&str]); 5] = [
        (FOLDER, &[""]),
        (IMAGE, &[".jpg", ".jpeg", ".gif", ".png", ".tif", ".tiff", ".webp"]),
        ("Document", &[".pdf", ".doc", ".rtf", ".txt", ".xls", ".csv"]),
        ("Video", &[".mov", ".wmv", ".mpeg", ".mpg", ".avi", ".rm"]),
        ("Audio", &[".mp3", ".mp4", ".wav", ".aiff", ".midi", ".m4p"]),
    ];
    table
        .into_iter()
        .map(|(category, exts)| {
            (
                category.to_string(),
                exts.iter().map(|e| e.to_string()).collect(),
            )
        })
        .collect()
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.quality) {
            return Err(ConfigError::Validation("quality must be 1-100".into()));
        }
        if self.location.trim().is_empty() {
            return Err(ConfigError::Validation("location must not be empty".into()));
        }
        if self.default_permissions > 0o7777 {
            return Err(ConfigError::Validation(format!(
                "default_permissions {:o} is not a file mode",
                self.default_permissions
            )));
        }
        if self.versions.is_empty() {
            return Err(ConfigError::Validation("versions must not be empty".into()));
        }
        self.versions.validate().map_err(ConfigError::Validation)?;
        for id in self
            .admin_versions
            .iter()
            .chain(std::iter::once(&self.admin_thumbnail))
        {
            if !self.versions.contains(id) {
                return Err(ConfigError::Validation(format!(
                    "admin version '{id}' is not defined in versions"
                )));
            }
        }
        for (category, exts) in &self.extensions {
            for ext in exts {
                let folder_marker = ext.is_empty() && category == FOLDER;
                if !folder_marker && !(ext.starts_with('.') && ext.len() > 1) {
                    return Err(ConfigError::Validation(format!(
                        "extensions.{category}: '{ext}' must start with '.'"
                    )));
                }
            }
        }
        for processor in &self.processors {
            processor.validate().map_err(ConfigError::Validation)?;
        }
        Ok(())
    }

    pub fn quality(&self) -> Quality {
        Quality::new(self.quality)
    }

    /// Mode to apply to new artifacts, if any.
    pub fn permissions(&self) -> Option<u32> {
        (self.default_permissions != 0).then_some(self.default_permissions)
    }

    /// Media directory without surrounding slashes.
    pub fn media_directory(&self) -> String {
        paths::normalize(self.directory.trim_matches('/'))
    }

    /// Versions tree root without surrounding slashes; empty when unset.
    pub fn versions_directory(&self) -> String {
        paths::normalize(self.versions_basedir.trim_matches('/'))
    }

    /// Category of a file extension (case-insensitive), `None` if unknown.
    ///
    /// Never returns [`FOLDER`]; directories are recognized by the storage.
    pub fn category_for(&self, extension: &str) -> Option<&str> {
        if extension.is_empty() {
            return None;
        }
        let ext = extension.to_ascii_lowercase();
        self.extensions
            .iter()
            .filter(|(category, _)| category.as_str() != FOLDER)
            .find(|(_, exts)| exts.iter().any(|e| e.eq_ignore_ascii_case(&ext)))
            .map(|(category, _)| category.as_str())
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image processing workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(Config::default())
        .map_err(|e| ConfigError::Validation(format!("stock defaults do not serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and
/// validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<Config, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the file at `path`.
///
/// A missing file yields the stock defaults. User values are merged on top
/// of the defaults, unknown keys are rejected, and the result is validated.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    resolve_config(load_raw_config(path)?)
}

/// Returns a fully-commented stock config file with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# media-versions configuration
# ============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Tables merge with the defaults key by key, so [versions.small] with only
# `width = 200` keeps the rest of the stock "small" version.
# Unknown keys will cause an error.

# Media root on disk. All storage paths are relative to it.
location = "media"

# URL prefix for files under the media root.
base_url = "/media/"

# Media directory, relative to location. Its tree is mirrored below
# versions_basedir.
directory = "uploads/"

# Directory for version files, relative to location. Leave empty to store
# versions next to their originals. Ignored until the directory exists.
versions_basedir = ""

# Encoding quality for versions (1 = worst, 100 = best).
quality = 90

# Version file naming:
#   "suffix"  -> photo_thumbnail.jpg
#   "options" -> photo_thumbnail--60x60--crop.jpg (new name when options change)
namer = "suffix"

# Versions shown in admin listings, and the one used as admin thumbnail.
admin_versions = ["thumbnail", "small", "medium", "big", "large"]
admin_thumbnail = "admin_thumbnail"

# Mode applied to new version files (0 = leave as created).
default_permissions = 0o755

# Post-processors run on every version, in order. Available kinds:
#   { kind = "sharpen", sigma = 0.5, threshold = 0 }
#   { kind = "blur", sigma = 1.0 }
#   { kind = "grayscale" }
#   { kind = "brighten", value = 10 }
processors = []

# ---------------------------------------------------------------------------
# File categories by extension
# ---------------------------------------------------------------------------
[extensions]
Folder = [""]
Image = [".jpg", ".jpeg", ".gif", ".png", ".tif", ".tiff", ".webp"]
Document = [".pdf", ".doc", ".rtf", ".txt", ".xls", ".csv"]
Video = [".mov", ".wmv", ".mpeg", ".mpg", ".avi", ".rm"]
Audio = [".mp3", ".mp4", ".wav", ".aiff", ".midi", ".m4p"]

# ---------------------------------------------------------------------------
# Versions
# ---------------------------------------------------------------------------
# width / height: target box in pixels (at least one required).
# opts: "crop" fills the box and cuts the overflow (needs both dimensions),
#       "upscale" allows enlarging images smaller than the box.
# [versions.<id>.extra]: naming-only options for the "options" namer.

[versions.admin_thumbnail]
verbose_name = "Admin Thumbnail"
width = 60
height = 60
opts = ["crop"]

[versions.thumbnail]
verbose_name = "Thumbnail (1 col)"
width = 60
height = 60
opts = ["crop"]

[versions.small]
verbose_name = "Small (2 col)"
width = 140

[versions.medium]
verbose_name = "Medium (4 col)"
width = 300

[versions.big]
verbose_name = "Big (6 col)"
width = 460

[versions.large]
verbose_name = "Large (8 col)"
width = 680

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image-processing workers for batch commands.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
