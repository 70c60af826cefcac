//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! (which decides what a version looks like) and the [`backend`](super::backend)
//! (which does the actual codec work). This separation allows swapping backends
//! (e.g. for testing with a mock) without changing operation logic.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`Sharpening`]: Unsharp-mask parameters (sigma + threshold).
//! - [`ScaleOptions`]: The `crop` / `upscale` flags understood by the scale/crop engine.
//! - [`OutputFormat`]: Encoder selected from a target file extension.
//! - [`EncodeParams`]: Quality and optimize flag handed to the encoder.

use serde::{Deserialize, Serialize};

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Sharpening parameters for unsharp mask.
///
/// - `sigma`: Standard deviation of the Gaussian blur (higher = more sharpening)
/// - `threshold`: Minimum brightness difference to sharpen (0 = sharpen all pixels)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Sharpening {
    pub sigma: f32,
    #[serde(default)]
    pub threshold: i32,
}

impl Sharpening {
    /// Light sharpening suitable for thumbnails.
    pub fn light() -> Self {
        Self {
            sigma: 0.5,
            threshold: 0,
        }
    }
}

/// A single transform flag a version can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleOption {
    /// Fill the target box and center-crop the overflow.
    Crop,
    /// Allow enlarging images smaller than the target.
    Upscale,
}

impl ScaleOption {
    pub fn as_str(self) -> &'static str {
        match self {
            ScaleOption::Crop => "crop",
            ScaleOption::Upscale => "upscale",
        }
    }
}

/// The flag set consumed by [`scale_and_crop`](super::operations::scale_and_crop).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScaleOptions {
    pub crop: bool,
    pub upscale: bool,
}

impl ScaleOptions {
    pub const NONE: Self = Self {
        crop: false,
        upscale: false,
    };

    pub fn from_opts(opts: &[ScaleOption]) -> Self {
        Self {
            crop: opts.contains(&ScaleOption::Crop),
            upscale: opts.contains(&ScaleOption::Upscale),
        }
    }

    pub fn with_upscale(self) -> Self {
        Self {
            upscale: true,
            ..self
        }
    }
}

/// Encoder chosen from the target extension of a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
    Gif,
    Tiff,
    WebP,
}

impl OutputFormat {
    /// Map a file extension (with or without the leading dot, any case).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "tif" | "tiff" => Some(Self::Tiff),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    pub fn is_jpeg(self) -> bool {
        self == Self::Jpeg
    }

    /// JPEG and PNG encoders can trade time for size; the others cannot.
    pub fn has_optimize_mode(self) -> bool {
        matches!(self, Self::Jpeg | Self::Png)
    }
}

/// Parameters for one encode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeParams {
    /// `None` leaves the encoder at its own default.
    pub quality: Option<Quality>,
    /// Ask the encoder to spend extra effort on a smaller file.
    pub optimize: bool,
}

impl EncodeParams {
    /// Configured quality, with optimization where the format has it.
    pub fn for_format(format: OutputFormat, quality: Quality) -> Self {
        Self {
            quality: Some(quality),
            optimize: format.has_optimize_mode(),
        }
    }

    /// Encoder defaults only; used for the retry after a parameter rejection.
    pub fn plain() -> Self {
        Self {
            quality: None,
            optimize: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_90() {
        assert_eq!(Quality::default().value(), 90);
    }

    #[test]
    fn scale_options_from_opts() {
        let opts = ScaleOptions::from_opts(&[ScaleOption::Crop]);
        assert!(opts.crop);
        assert!(!opts.upscale);
        assert_eq!(ScaleOptions::from_opts(&[]), ScaleOptions::NONE);
        assert!(opts.with_upscale().upscale);
    }

    #[test]
    fn output_format_from_extension() {
        assert_eq!(OutputFormat::from_extension(".JPG"), Some(OutputFormat::Jpeg));
        assert_eq!(OutputFormat::from_extension("jpeg"), Some(OutputFormat::Jpeg));
        assert_eq!(OutputFormat::from_extension(".tif"), Some(OutputFormat::Tiff));
        assert_eq!(OutputFormat::from_extension(".pdf"), None);
    }

    #[test]
    fn only_jpeg_and_png_are_optimized() {
        for format in [OutputFormat::Gif, OutputFormat::Tiff, OutputFormat::WebP] {
            let params = EncodeParams::for_format(format, Quality::default());
            assert!(!params.optimize, "{format:?}");
        }
        assert!(EncodeParams::for_format(OutputFormat::Png, Quality::default()).optimize);
        let params = EncodeParams::for_format(OutputFormat::Jpeg, Quality::new(80));
        assert!(params.optimize);
        assert_eq!(params.quality, Some(Quality::new(80)));
    }
}
