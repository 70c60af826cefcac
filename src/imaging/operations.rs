//! High-level image operations.
//!
//! These functions combine calculations with raster work. The geometry comes
//! from [`plan_scale_and_crop`]; this module only executes the plan.

use super::calculations::{ScalePlan, plan_scale_and_crop};
use super::params::{OutputFormat, ScaleOptions};
use super::processors::SharedProcessor;
use image::DynamicImage;
use image::imageops::FilterType;

/// Result of [`scale_and_crop`].
#[derive(Debug, Clone)]
pub enum ScaleOutcome {
    /// The source already satisfies the request; use it as is.
    Unchanged,
    /// A new raster; the input was not touched.
    Resized(DynamicImage),
    /// The requested width exceeds the source and `upscale` was not given.
    Infeasible,
}

impl ScaleOutcome {
    /// The raster to encode: the resized one, otherwise `source` unscaled.
    pub fn into_image(self, source: DynamicImage) -> DynamicImage {
        match self {
            ScaleOutcome::Resized(img) => img,
            ScaleOutcome::Unchanged | ScaleOutcome::Infeasible => source,
        }
    }
}

/// Scale `image` into the `width` x `height` box, then center-crop with `crop`.
///
/// Resizing uses Lanczos3.
pub fn scale_and_crop(
    image: &DynamicImage,
    width: Option<u32>,
    height: Option<u32>,
    options: ScaleOptions,
) -> ScaleOutcome {
    let plan = plan_scale_and_crop((image.width(), image.height()), width, height, options);
    let (resize, crop) = match plan {
        ScalePlan::Unchanged => return ScaleOutcome::Unchanged,
        ScalePlan::Infeasible => return ScaleOutcome::Infeasible,
        ScalePlan::Transform { resize, crop } => (resize, crop),
    };

    let scaled = match (resize, crop) {
        (Some((w, h)), None) => image.resize_exact(w, h, FilterType::Lanczos3),
        (Some((w, h)), Some(c)) => image
            .resize_exact(w, h, FilterType::Lanczos3)
            .crop_imm(c.x, c.y, c.width, c.height),
        (None, Some(c)) => image.crop_imm(c.x, c.y, c.width, c.height),
        (None, None) => return ScaleOutcome::Unchanged,
    };
    ScaleOutcome::Resized(scaled)
}

/// JPEG stores only grayscale or RGB; convert anything else to RGB.
pub fn normalize_color_mode(image: DynamicImage, format: OutputFormat) -> DynamicImage {
    if !format.is_jpeg() {
        return image;
    }
    match image {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => image,
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

/// Run `processors` over `image` in order.
pub fn apply_processors(image: DynamicImage, processors: &[SharedProcessor]) -> DynamicImage {
    processors.iter().fold(image, |img, p| p.process(img))
}
