//! Image codec backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three codec operations every backend
//! must support: identify, decode, and encode. Pixel work (resize, crop,
//! post-processing) is backend independent and lives in
//! [`operations`](super::operations).
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate's pure Rust codecs.

use super::params::{EncodeParams, OutputFormat};
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decoding failed: {0}")]
    Decode(String),
    /// The encoder refused the quality/optimize parameters. Retrying with
    /// [`EncodeParams::plain`] is expected to succeed.
    #[error("Encoder rejected parameters: {0}")]
    UnsupportedParameters(String),
    #[error("Encoding failed: {0}")]
    Encode(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image codec backends.
///
/// Backends work on in-memory bytes; reading and writing goes through the
/// [`Storage`](crate::storage::Storage) port.
pub trait ImageBackend: Send + Sync {
    /// Get image dimensions without a full decode when possible.
    fn identify(&self, data: &[u8]) -> Result<Dimensions, BackendError>;

    /// Decode encoded bytes into a raster.
    fn decode(&self, data: &[u8]) -> Result<DynamicImage, BackendError>;

    /// Encode a raster into `format`.
    fn encode(
        &self,
        image: &DynamicImage,
        format: OutputFormat,
        params: &EncodeParams,
    ) -> Result<Vec<u8>, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mock backend that records operations and fakes the codec.
    ///
    /// `decode` produces a blank RGB raster of the queued dimensions and
    /// `encode` writes the output dimensions as text, so tests can inspect
    /// what would have been written without real codecs.
    /// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
    #[derive(Default)]
    pub struct MockBackend {
        pub decode_results: Mutex<Vec<Dimensions>>,
        /// Encode calls with `optimize` set fail with `UnsupportedParameters`.
        pub reject_optimize: bool,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Identify,
        Decode,
        Encode {
            format: OutputFormat,
            width: u32,
            height: u32,
            quality: Option<u32>,
            optimize: bool,
        },
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_dimensions(dims: Vec<Dimensions>) -> Self {
            Self {
                decode_results: Mutex::new(dims),
                ..Self::default()
            }
        }

        pub fn rejecting_optimize(dims: Vec<Dimensions>) -> Self {
            Self {
                decode_results: Mutex::new(dims),
                reject_optimize: true,
                ..Self::default()
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        fn next_dimensions(&self) -> Result<Dimensions, BackendError> {
            self.decode_results
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| BackendError::Decode("No mock dimensions".to_string()))
        }
    }

    impl ImageBackend for MockBackend {
        fn identify(&self, _data: &[u8]) -> Result<Dimensions, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Identify);
            self.next_dimensions()
        }

        fn decode(&self, _data: &[u8]) -> Result<DynamicImage, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Decode);
            let dims = self.next_dimensions()?;
            Ok(DynamicImage::new_rgb8(dims.width, dims.height))
        }

        fn encode(
            &self,
            image: &DynamicImage,
            format: OutputFormat,
            params: &EncodeParams,
        ) -> Result<Vec<u8>, BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Encode {
                format,
                width: image.width(),
                height: image.height(),
                quality: params.quality.map(|q| q.value()),
                optimize: params.optimize,
            });
            if self.reject_optimize && params.optimize {
                return Err(BackendError::UnsupportedParameters(
                    "optimize not supported".to_string(),
                ));
            }
            Ok(format!("{}x{}", image.width(), image.height()).into_bytes())
        }
    }

    #[test]
    fn mock_decodes_queued_dimensions() {
        let backend = MockBackend::with_dimensions(vec![Dimensions {
            width: 800,
            height: 600,
        }]);

        let img = backend.decode(b"ignored").unwrap();
        assert_eq!((img.width(), img.height()), (800, 600));

        let ops = backend.get_operations();
        assert_eq!(ops, vec![RecordedOp::Decode]);
    }

    #[test]
    fn mock_records_encode() {
        let backend = MockBackend::new();
        let img = DynamicImage::new_rgb8(60, 40);

        let bytes = backend
            .encode(
                &img,
                OutputFormat::Jpeg,
                &EncodeParams::for_format(OutputFormat::Jpeg, super::super::params::Quality::new(85)),
            )
            .unwrap();
        assert_eq!(bytes, b"60x40");

        let ops = backend.get_operations();
        assert!(matches!(
            &ops[0],
            RecordedOp::Encode {
                width: 60,
                height: 40,
                quality: Some(85),
                optimize: true,
                ..
            }
        ));
    }

    #[test]
    fn mock_can_reject_optimize() {
        let backend = MockBackend::rejecting_optimize(vec![]);
        let img = DynamicImage::new_rgb8(1, 1);
        let params = EncodeParams::for_format(OutputFormat::Png, Default::default());
        assert!(matches!(
            backend.encode(&img, OutputFormat::Png, &params),
            Err(BackendError::UnsupportedParameters(_))
        ));
        assert!(backend.encode(&img, OutputFormat::Png, &EncodeParams::plain()).is_ok());
    }
}
