//! Image processing, pure Rust and statically linked.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` |
//! | **Decode** | `image::load_from_memory` |
//! | **Scale / crop** | Lanczos3 `resize_exact` + `crop_imm` |
//! | **Post-process** | `unsharpen`, `blur`, `grayscale`, `brighten`, or any closure |
//! | **Encode** | JPEG / PNG / GIF / TIFF / WebP encoders of the `image` crate |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for scale/crop geometry (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: Executing a plan on a raster
//! - **Processors**: [`PostProcessor`] trait + configurable [`ProcessorSpec`]

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod processors;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{CropBox, ScalePlan, plan_scale_and_crop, planned_dimensions};
pub use operations::{ScaleOutcome, apply_processors, normalize_color_mode, scale_and_crop};
pub use params::{EncodeParams, OutputFormat, Quality, ScaleOption, ScaleOptions, Sharpening};
pub use processors::{PostProcessor, ProcessorSpec, SharedProcessor, build_processors};
pub use rust_backend::{RustBackend, is_supported_extension, supported_input_extensions};
