//! Post-processors run on every version after scaling.
//!
//! A [`PostProcessor`] is anything that turns one raster into another. Plain
//! closures implement the trait, so callers embedding the library can register
//! their own. [`ProcessorSpec`] is the configurable subset, read from the
//! `processors` list of the config file:
//!
//! ```toml
//! [[processors]]
//! kind = "sharpen"
//! sigma = 0.5
//!
//! [[processors]]
//! kind = "grayscale"
//! ```

use super::params::Sharpening;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A raster transform applied after scale/crop, in declaration order.
pub trait PostProcessor: Send + Sync {
    fn process(&self, image: DynamicImage) -> DynamicImage;
}

impl<F> PostProcessor for F
where
    F: Fn(DynamicImage) -> DynamicImage + Send + Sync,
{
    fn process(&self, image: DynamicImage) -> DynamicImage {
        self(image)
    }
}

/// Shared handle to a processor, as stored on a [`Site`](crate::site::Site).
pub type SharedProcessor = Arc<dyn PostProcessor>;

/// Built-in processors selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase", deny_unknown_fields)]
pub enum ProcessorSpec {
    /// Unsharp mask.
    Sharpen {
        sigma: f32,
        #[serde(default)]
        threshold: i32,
    },
    /// Gaussian blur.
    Blur { sigma: f32 },
    Grayscale,
    /// Add `value` to every channel (negative darkens).
    Brighten { value: i32 },
}

impl ProcessorSpec {
    pub fn name(&self) -> &'static str {
        match self {
            ProcessorSpec::Sharpen { .. } => "sharpen",
            ProcessorSpec::Blur { .. } => "blur",
            ProcessorSpec::Grayscale => "grayscale",
            ProcessorSpec::Brighten { .. } => "brighten",
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match *self {
            ProcessorSpec::Sharpen { sigma, .. } | ProcessorSpec::Blur { sigma }
                if !(sigma.is_finite() && sigma > 0.0) =>
            {
                Err(format!("{}: sigma must be a positive number", self.name()))
            }
            _ => Ok(()),
        }
    }
}

impl From<Sharpening> for ProcessorSpec {
    fn from(s: Sharpening) -> Self {
        ProcessorSpec::Sharpen {
            sigma: s.sigma,
            threshold: s.threshold,
        }
    }
}

impl PostProcessor for ProcessorSpec {
    fn process(&self, image: DynamicImage) -> DynamicImage {
        match *self {
            ProcessorSpec::Sharpen { sigma, threshold } => image.unsharpen(sigma, threshold),
            ProcessorSpec::Blur { sigma } => image.blur(sigma),
            ProcessorSpec::Grayscale => image.grayscale(),
            ProcessorSpec::Brighten { value } => image.brighten(value),
        }
    }
}

/// Turn configured specs into shared processors, keeping their order.
pub fn build_processors(specs: &[ProcessorSpec]) -> Vec<SharedProcessor> {
    specs
        .iter()
        .map(|spec| Arc::new(*spec) as SharedProcessor)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};

    #[test]
    fn closures_are_processors() {
        let flip = |img: DynamicImage| img.fliph();
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(2, 1, |x, _| {
            if x == 0 { Rgb([255, 0, 0]) } else { Rgb([0, 0, 255]) }
        }));
        let out = flip.process(img);
        assert_eq!(out.get_pixel(0, 0).0[2], 255);
    }

    #[test]
    fn grayscale_changes_color_type() {
        let img = DynamicImage::new_rgb8(4, 4);
        let out = ProcessorSpec::Grayscale.process(img);
        assert!(matches!(out, DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn brighten_raises_channels() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, Rgb([10, 10, 10])));
        let out = ProcessorSpec::Brighten { value: 20 }.process(img);
        assert_eq!(out.get_pixel(0, 0).0[..3], [30, 30, 30]);
    }

    #[test]
    fn parse_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            processors: Vec<ProcessorSpec>,
        }
        let w: Wrapper = toml::from_str(
            r#"
            [[processors]]
            kind = "sharpen"
            sigma = 0.5

            [[processors]]
            kind = "grayscale"
            "#,
        )
        .unwrap();
        assert_eq!(
            w.processors,
            vec![
                ProcessorSpec::Sharpen {
                    sigma: 0.5,
                    threshold: 0
                },
                ProcessorSpec::Grayscale
            ]
        );
    }

    #[test]
    fn unknown_processor_field_rejected() {
        let result: Result<ProcessorSpec, _> = toml::from_str("kind = \"blur\"\nradius = 2.0\n");
        assert!(result.is_err());
    }

    #[test]
    fn sigma_must_be_positive() {
        assert!(ProcessorSpec::Blur { sigma: 0.0 }.validate().is_err());
        assert!(ProcessorSpec::from(Sharpening::light()).validate().is_ok());
    }

    #[test]
    fn build_keeps_order() {
        let specs = [ProcessorSpec::Grayscale, ProcessorSpec::Brighten { value: 5 }];
        assert_eq!(build_processors(&specs).len(), 2);
    }
}
