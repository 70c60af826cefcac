//! Pure calculation functions for version geometry.
//!
//! All functions here are pure and testable without any I/O or images. The
//! scale/crop engine in [`operations`](super::operations) asks
//! [`plan_scale_and_crop`] what to do and then only executes the plan.

use super::params::ScaleOptions;

/// Float slack used when ceiling computed dimensions, so that a product that
/// is mathematically an integer (`1000 * 0.6`) never gains a pixel from
/// rounding noise.
const CEIL_EPSILON: f64 = 1e-6;

/// A rectangle to cut out of an image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// What the scale/crop engine has to do for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalePlan {
    /// The source already satisfies the request.
    Unchanged,
    /// The requested width exceeds the source width, and `upscale` was not
    /// given.
    Infeasible,
    /// Resize (when `resize` is set) and then crop (when `crop` is set).
    Transform {
        resize: Option<(u32, u32)>,
        crop: Option<CropBox>,
    },
}

fn ceil_dim(value: f64) -> u32 {
    (value - CEIL_EPSILON).ceil().max(1.0) as u32
}

/// Plan the scale and crop of a `source` sized image.
///
/// `width` and `height` of `None` or `Some(0)` are unset. A single unset
/// dimension is derived from the source aspect ratio.
///
/// Only the width decides infeasibility. A box that is taller than the
/// source, but not wider, keeps the source scale and is cropped if `crop`
/// is set.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `width`, `height` - Requested box
/// * `options` - `crop` fills the box and cuts the overflow; `upscale` permits enlarging
///
/// # Returns
/// * [`ScalePlan::Unchanged`] when nothing needs to happen
/// * [`ScalePlan::Infeasible`] when the width exceeds the source without `upscale`
/// * [`ScalePlan::Transform`] otherwise
///
/// # Examples
/// ```
/// use media_versions::imaging::{ScaleOptions, ScalePlan, plan_scale_and_crop};
///
/// // 1000x750 fitted into a 600px wide box → 600x450
/// let plan = plan_scale_and_crop((1000, 750), Some(600), None, ScaleOptions::NONE);
/// assert_eq!(plan, ScalePlan::Transform { resize: Some((600, 450)), crop: None });
///
/// // Enlarging is refused unless `upscale` is requested
/// let plan = plan_scale_and_crop((1000, 750), Some(5000), None, ScaleOptions::NONE);
/// assert_eq!(plan, ScalePlan::Infeasible);
/// ```
pub fn plan_scale_and_crop(
    source: (u32, u32),
    width: Option<u32>,
    height: Option<u32>,
    options: ScaleOptions,
) -> ScalePlan {
    let (src_w, src_h) = source;
    let width = width.filter(|&w| w > 0);
    let height = height.filter(|&h| h > 0);

    if src_w == 0 || src_h == 0 {
        return ScalePlan::Unchanged;
    }
    if width.is_none() && height.is_none() {
        return ScalePlan::Unchanged;
    }
    if width == Some(src_w) && height == Some(src_h) {
        return ScalePlan::Unchanged;
    }
    if !options.upscale && width.is_some_and(|w| w > src_w) {
        return ScalePlan::Infeasible;
    }

    let x = src_w as f64;
    let y = src_h as f64;
    let target_x = match (width, height) {
        (Some(w), _) => w as f64,
        (None, Some(h)) => x * h as f64 / y,
        (None, None) => x,
    };
    let target_y = match (width, height) {
        (_, Some(h)) => h as f64,
        (Some(w), None) => y * w as f64 / x,
        (None, None) => y,
    };

    let ratio = if options.crop {
        (target_x / x).max(target_y / y)
    } else {
        (target_x / x).min(target_y / y)
    };

    let resize = if ratio < 1.0 || (ratio > 1.0 && options.upscale) {
        Some((ceil_dim(x * ratio), ceil_dim(y * ratio)))
    } else {
        None
    };

    let crop = if options.crop {
        let (cur_w, cur_h) = resize.unwrap_or(source);
        let crop_w = ceil_dim(target_x).min(cur_w);
        let crop_h = ceil_dim(target_y).min(cur_h);
        if crop_w < cur_w || crop_h < cur_h {
            Some(CropBox {
                x: (cur_w - crop_w) / 2,
                y: (cur_h - crop_h) / 2,
                width: crop_w,
                height: crop_h,
            })
        } else {
            None
        }
    } else {
        None
    };

    match (resize, crop) {
        (None, None) => ScalePlan::Unchanged,
        (resize, crop) => ScalePlan::Transform { resize, crop },
    }
}

/// Final dimensions a plan produces for a `source` sized image.
///
/// `None` for [`ScalePlan::Infeasible`].
pub fn planned_dimensions(source: (u32, u32), plan: &ScalePlan) -> Option<(u32, u32)> {
    match plan {
        ScalePlan::Unchanged => Some(source),
        ScalePlan::Infeasible => None,
        ScalePlan::Transform { resize, crop } => Some(match crop {
            Some(c) => (c.width, c.height),
            None => resize.unwrap_or(source),
        }),
    }
}
