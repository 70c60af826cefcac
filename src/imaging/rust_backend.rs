//! Pure Rust codec backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `image::ImageReader::into_dimensions` (header only) |
//! | Decode (JPEG, PNG, GIF, TIFF, WebP) | `image::load_from_memory` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` with quality |
//! | Encode → PNG | `image::codecs::png::PngEncoder`, best compression when optimizing |
//! | Encode → GIF / TIFF / WebP | `DynamicImage::write_to` |
//!
//! Quality only affects JPEG; the other encoders ignore it. Asking for
//! `optimize` on an encoder without such a mode (GIF, TIFF, lossless WebP)
//! fails with [`BackendError::UnsupportedParameters`] before any work is done.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{EncodeParams, OutputFormat};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;
use std::sync::LazyLock;

/// Extensions whose decoders are compiled in.
const PHOTO_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("gif", ImageFormat::Gif),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    PHOTO_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Whether a version with this extension (leading dot optional) can be produced.
pub fn is_supported_extension(ext: &str) -> bool {
    let ext = ext.trim_start_matches('.').to_ascii_lowercase();
    supported_input_extensions().contains(&ext.as_str())
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn write_with_format(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, BackendError> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, format)
        .map_err(|e| BackendError::Encode(format!("{format:?} encode failed: {e}")))?;
    Ok(buf.into_inner())
}

fn encode_jpeg(image: &DynamicImage, params: &EncodeParams) -> Result<Vec<u8>, BackendError> {
    let mut buf = Vec::new();
    let encoder = match params.quality {
        Some(q) => JpegEncoder::new_with_quality(&mut buf, q.value() as u8),
        None => JpegEncoder::new(&mut buf),
    };
    image
        .write_with_encoder(encoder)
        .map_err(|e| BackendError::Encode(format!("JPEG encode failed: {e}")))?;
    Ok(buf)
}

fn encode_png(image: &DynamicImage, params: &EncodeParams) -> Result<Vec<u8>, BackendError> {
    let mut buf = Vec::new();
    let encoder = if params.optimize {
        PngEncoder::new_with_quality(&mut buf, CompressionType::Best, PngFilter::Adaptive)
    } else {
        PngEncoder::new(&mut buf)
    };
    image
        .write_with_encoder(encoder)
        .map_err(|e| BackendError::Encode(format!("PNG encode failed: {e}")))?;
    Ok(buf)
}

fn reject_optimize(format: OutputFormat, params: &EncodeParams) -> Result<(), BackendError> {
    if params.optimize {
        return Err(BackendError::UnsupportedParameters(format!(
            "{format:?} encoder has no optimize mode"
        )));
    }
    Ok(())
}

impl ImageBackend for RustBackend {
    fn identify(&self, data: &[u8]) -> Result<Dimensions, BackendError> {
        let (width, height) = ImageReader::new(Cursor::new(data))
            .with_guessed_format()?
            .into_dimensions()
            .map_err(|e| BackendError::Decode(format!("Failed to read dimensions: {e}")))?;
        Ok(Dimensions { width, height })
    }

    fn decode(&self, data: &[u8]) -> Result<DynamicImage, BackendError> {
        image::load_from_memory(data).map_err(|e| BackendError::Decode(e.to_string()))
    }

    fn encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        params: &EncodeParams,
    ) -> Result<Vec<u8>, BackendError> {
        match format {
            OutputFormat::Jpeg => encode_jpeg(image, params),
            OutputFormat::Png => encode_png(image, params),
            OutputFormat::Gif => {
                reject_optimize(format, params)?;
                write_with_format(&DynamicImage::ImageRgba8(image.to_rgba8()), ImageFormat::Gif)
            }
            OutputFormat::Tiff => {
                reject_optimize(format, params)?;
                write_with_format(image, ImageFormat::Tiff)
            }
            OutputFormat::WebP => {
                reject_optimize(format, params)?;
                let rgba = match image {
                    DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => image.clone(),
                    other => DynamicImage::ImageRgba8(other.to_rgba8()),
                };
                write_with_format(&rgba, ImageFormat::WebP)
            }
        }
    }
}
