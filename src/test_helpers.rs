//! Shared test utilities.
//!
//! [`TestMedia`] is a throwaway media root on disk with a [`Site`] over it.
//! Files are written and read through the site's storage so tests exercise
//! the same paths production code does.
//!
//! ```rust,ignore
//! let media = TestMedia::new();
//! write_jpeg(&media.site, "uploads/photo.jpg", 1000, 750);
//! let photo = FileObject::new("uploads/photo.jpg", &media.site);
//! assert_eq!(photo.width(), Some(1000));
//! ```

use std::sync::Arc;
use std::time::SystemTime;
use tempfile::TempDir;

use crate::config::Config;
use crate::imaging::ImageBackend;
use crate::site::Site;

pub struct TestMedia {
    pub _tmp: TempDir,
    pub site: Site,
}

impl TestMedia {
    /// Stock config rooted at a fresh temp directory.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// `config` with its location replaced by a fresh temp directory.
    pub fn with_config(config: Config) -> Self {
        let tmp = TempDir::new().unwrap();
        let config = Config {
            location: tmp.path().to_string_lossy().to_string(),
            ..config
        };
        config.validate().unwrap();
        let site = Site::from_config(config, tmp.path());
        Self { _tmp: tmp, site }
    }

    pub fn with_backend(self, backend: Arc<dyn ImageBackend>) -> Self {
        Self {
            site: self.site.with_backend(backend),
            _tmp: self._tmp,
        }
    }

    pub fn mkdir(&self, path: &str) {
        let full = self.site.storage.path(path).unwrap();
        std::fs::create_dir_all(full).unwrap();
    }

    pub fn write(&self, path: &str, data: &[u8]) {
        let mut reader = data;
        let stored = self.site.storage.save(path, &mut reader).unwrap();
        assert_eq!(stored, path, "test file {path} already exists");
    }

    pub fn read(&self, path: &str) -> Vec<u8> {
        self.site.storage.read_bytes(path).unwrap()
    }
}

// =========================================================================
// Free helpers
// =========================================================================

/// Set the modification time of a stored file.
pub fn set_mtime(site: &Site, path: &str, time: SystemTime) {
    let full = site.storage.path(path).unwrap();
    std::fs::File::options()
        .write(true)
        .open(full)
        .unwrap()
        .set_modified(time)
        .unwrap();
}

/// Write a real JPEG of the given size with a gradient, so resizes are
/// visible in the pixels.
pub fn write_jpeg(site: &Site, path: &str, width: u32, height: u32) {
    use image::ImageEncoder;
    use image::codecs::jpeg::JpegEncoder;

    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, 90)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    let mut reader = buf.as_slice();
    site.storage.save(path, &mut reader).unwrap();
}

/// Decode a stored image and return its size.
pub fn read_dimensions(site: &Site, path: &str) -> (u32, u32) {
    let bytes = site.storage.read_bytes(path).unwrap();
    let img = image::load_from_memory(&bytes).unwrap();
    (img.width(), img.height())
}
