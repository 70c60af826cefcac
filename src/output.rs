//! CLI output formatting for the management commands.
//!
//! Every command has a pure `format_*` function returning display lines and a
//! thin `print_*` wrapper. Tests assert on the lines; nothing here touches
//! storage or images.
//!
//! # Output Format
//!
//! ## generate
//!
//! ```text
//! 12 files, 6 versions each
//! 001 uploads/2024/dawn.jpg
//!     admin_thumbnail: generated
//!     large: fallback
//!     medium: failed (Encoding uploads/2024/dawn_medium.jpg failed: ...)
//! Versions: 40 reused, 30 generated, 2 fallback (72 total)
//! ```
//!
//! ## versions
//!
//! ```text
//! uploads/dawn.jpg (1000x750, landscape)
//!     admin_thumbnail  uploads/dawn_admin_thumbnail.jpg
//!     big              uploads/dawn_big.jpg (missing)
//! ```
//!
//! ## remove
//!
//! ```text
//! Would remove 2 "small" versions
//!     uploads/2024/b_small.jpg
//!     uploads/a_small.jpg
//! ```

use crate::config::Config;
use crate::file_object::{FileObject, Orientation};
use crate::generator::Resolved;
use crate::imaging::{Dimensions, supported_input_extensions};
use crate::process::{GenerateResult, ProcessEvent, RemoveReport, VersionStatus};
use serde::Serialize;

fn status_label(status: &VersionStatus) -> String {
    match status {
        VersionStatus::Resolved(resolution) => resolution.to_string(),
        VersionStatus::Failed(reason) => format!("failed ({reason})"),
    }
}

fn dimensions_label(dims: Dimensions) -> String {
    format!("{}x{}", dims.width, dims.height)
}

// ============================================================================
// generate
// ============================================================================

/// Format a single batch progress event as display lines.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::Started {
            file_count,
            version_count,
        } => {
            let noun = if *file_count == 1 { "file" } else { "files" };
            let each = if *version_count == 1 {
                "1 version".to_string()
            } else {
                format!("{version_count} versions each")
            };
            vec![format!("{file_count} {noun}, {each}")]
        }
        ProcessEvent::FileProcessed {
            index,
            path,
            outcomes,
        } => {
            let mut lines = vec![format!("{index:0>3} {path}")];
            lines.extend(
                outcomes
                    .iter()
                    .map(|o| format!("    {}: {}", o.version, status_label(&o.status))),
            );
            lines
        }
    }
}

pub fn format_generate_summary(result: &GenerateResult) -> Vec<String> {
    if result.files == 0 {
        return vec!["No images found".to_string()];
    }
    vec![format!("Versions: {}", result.stats)]
}

pub fn print_generate_summary(result: &GenerateResult) {
    for line in format_generate_summary(result) {
        println!("{}", line);
    }
}

// ============================================================================
// versions / show
// ============================================================================

/// One expected version path of a file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionEntry {
    pub id: String,
    pub path: String,
    pub exists: bool,
}

/// Everything the `versions` command shows, serializable for `--json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionListing {
    pub path: String,
    pub is_image: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Orientation>,
    pub versions: Vec<VersionEntry>,
}

/// Collect the expected version paths of `file` and check which exist.
pub fn version_listing(file: &FileObject) -> VersionListing {
    let storage = &file.site().storage;
    let versions = if file.is_image() {
        file.site()
            .config
            .versions
            .ids()
            .filter_map(|id| {
                let path = file.version_path(id).ok()?;
                Some(VersionEntry {
                    id: id.to_string(),
                    exists: storage.isfile(&path),
                    path,
                })
            })
            .collect()
    } else {
        Vec::new()
    };
    VersionListing {
        path: file.path().to_string(),
        is_image: file.is_image(),
        dimensions: file.dimensions(),
        orientation: file.orientation(),
        versions,
    }
}

/// Expected version paths, flagging the ones not yet on storage.
pub fn format_versions(listing: &VersionListing) -> Vec<String> {
    let mut header = listing.path.clone();
    if let (Some(dims), Some(orientation)) = (listing.dimensions, listing.orientation) {
        header.push_str(&format!(" ({}, {})", dimensions_label(dims), orientation));
    }
    let mut lines = vec![header];
    if !listing.is_image {
        lines.push("    not an image, no versions".to_string());
        return lines;
    }

    let width = listing.versions.iter().map(|v| v.id.len()).max().unwrap_or(0);
    for entry in &listing.versions {
        let missing = if entry.exists { "" } else { " (missing)" };
        lines.push(format!(
            "    {:<width$}  {}{missing}",
            entry.id, entry.path
        ));
    }
    lines
}

pub fn print_versions(listing: &VersionListing) {
    for line in format_versions(listing) {
        println!("{}", line);
    }
}

pub fn print_versions_json(listing: &VersionListing) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(listing)?);
    Ok(())
}

/// One resolved version: path, what happened, URL and size.
pub fn format_show(
    version_id: &str,
    resolved: &Resolved,
    url: Option<&str>,
    dimensions: Option<Dimensions>,
) -> Vec<String> {
    let mut lines = vec![format!("{version_id}: {}", resolved.resolution)];
    if !resolved.resolution.is_available() {
        lines.push("    original missing or not decodable".to_string());
        return lines;
    }
    lines.push(format!("    Path: {}", resolved.path));
    if let Some(url) = url {
        lines.push(format!("    URL: {url}"));
    }
    if let Some(dims) = dimensions {
        lines.push(format!("    Size: {}", dimensions_label(dims)));
    }
    lines
}

pub fn print_show(
    version_id: &str,
    resolved: &Resolved,
    url: Option<&str>,
    dimensions: Option<Dimensions>,
) {
    for line in format_show(version_id, resolved, url, dimensions) {
        println!("{}", line);
    }
}

// ============================================================================
// remove
// ============================================================================

pub fn format_remove_report(report: &RemoveReport) -> Vec<String> {
    let verb = if report.dry_run { "Would remove" } else { "Removed" };
    let noun = if report.removed.len() == 1 {
        "version"
    } else {
        "versions"
    };
    let mut lines = vec![format!(
        "{verb} {} \"{}\" {noun}",
        report.removed.len(),
        report.version
    )];
    lines.extend(report.removed.iter().map(|path| format!("    {path}")));
    for (path, reason) in &report.failed {
        lines.push(format!("    {path}: failed ({reason})"));
    }
    lines
}

pub fn print_remove_report(report: &RemoveReport) {
    for line in format_remove_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// check
// ============================================================================

/// Summary of a loaded config.
pub fn format_config_summary(config: &Config) -> Vec<String> {
    let mut lines = vec![
        format!("Media directory: {}", config.media_directory()),
        format!(
            "Versions directory: {}",
            match config.versions_directory().as_str() {
                "" => "(next to originals)".to_string(),
                dir => dir.to_string(),
            }
        ),
        format!("Namer: {}", config.namer.as_str()),
        format!("Quality: {}", config.quality),
        format!("Decoders: {}", supported_input_extensions().join(", ")),
        "Versions".to_string(),
    ];
    for (id, spec) in config.versions.iter() {
        let size = format!(
            "{}x{}",
            spec.width.unwrap_or(0),
            spec.height.unwrap_or(0)
        );
        let opts: Vec<&str> = spec.opts.iter().map(|o| o.as_str()).collect();
        let mut line = format!("    {id}: {size}");
        if !opts.is_empty() {
            line.push_str(&format!(" [{}]", opts.join(", ")));
        }
        if !spec.verbose_name.is_empty() {
            line.push_str(&format!(" \"{}\"", spec.verbose_name));
        }
        lines.push(line);
    }
    if !config.processors.is_empty() {
        let names: Vec<&str> = config.processors.iter().map(|p| p.name()).collect();
        lines.push(format!("Processors: {}", names.join(" → ")));
    }
    lines
}

pub fn print_config_summary(config: &Config) {
    for line in format_config_summary(config) {
        println!("{}", line);
    }
}
