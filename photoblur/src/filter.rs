//! Blur filter collaborator
//!
//! The pipeline treats the filter as an opaque, synchronous function:
//! image path + intensity in, image or nothing out. No error channel.

use image::{imageops, RgbaImage};
use photoblur_common::Intensity;
use std::path::Path;
use tracing::debug;

/// Opaque blur filter
///
/// Called from worker threads only. Returning `None` means the input could
/// not be processed (missing path, unreadable or corrupt data).
pub trait BlurFilter: Send + Sync {
    fn apply_blur(&self, path: &Path, intensity: Intensity) -> Option<RgbaImage>;
}

impl<F> BlurFilter for F
where
    F: Fn(&Path, Intensity) -> Option<RgbaImage> + Send + Sync,
{
    fn apply_blur(&self, path: &Path, intensity: Intensity) -> Option<RgbaImage> {
        self(path, intensity)
    }
}

/// Gaussian blur on the `image` crate
#[derive(Debug, Clone)]
pub struct GaussianBlurFilter {
    sigma_per_step: f32,
}

impl GaussianBlurFilter {
    pub fn new(sigma_per_step: f32) -> Self {
        Self { sigma_per_step }
    }

    /// Gaussian sigma for an intensity
    pub fn sigma(&self, intensity: Intensity) -> f32 {
        intensity.value() as f32 * self.sigma_per_step
    }
}

impl BlurFilter for GaussianBlurFilter {
    fn apply_blur(&self, path: &Path, intensity: Intensity) -> Option<RgbaImage> {
        let source = match image::open(path) {
            Ok(img) => img.to_rgba8(),
            Err(e) => {
                debug!("Cannot open {}: {}", path.display(), e);
                return None;
            }
        };

        // Zero intensity is the sharp original
        if intensity.is_zero() {
            return Some(source);
        }

        Some(imageops::blur(&source, self.sigma(intensity)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::io::Write;

    fn checkerboard(dir: &Path) -> std::path::PathBuf {
        let img = RgbaImage::from_fn(16, 16, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        });
        let path = dir.join("checker.png");
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn test_zero_intensity_returns_original() {
        let dir = tempfile::tempdir().unwrap();
        let path = checkerboard(dir.path());
        let filter = GaussianBlurFilter::new(0.25);

        let out = filter.apply_blur(&path, Intensity::ZERO).unwrap();
        assert_eq!(out.dimensions(), (16, 16));
        assert_eq!(out.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
        assert_eq!(out.get_pixel(1, 0), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_blur_softens_edges() {
        let dir = tempfile::tempdir().unwrap();
        let path = checkerboard(dir.path());
        let filter = GaussianBlurFilter::new(0.25);

        let out = filter.apply_blur(&path, Intensity::saturating(40)).unwrap();
        assert_eq!(out.dimensions(), (16, 16));
        let center = out.get_pixel(8, 8)[0];
        assert!(center > 0 && center < 255, "expected mid-gray, got {}", center);
    }

    #[test]
    fn test_missing_file_yields_none() {
        let filter = GaussianBlurFilter::new(0.25);
        assert!(filter
            .apply_blur(Path::new("/nonexistent/photo.png"), Intensity::saturating(10))
            .is_none());
    }

    #[test]
    fn test_corrupt_file_yields_none() {
        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(b"definitely not a png").unwrap();
        let filter = GaussianBlurFilter::new(0.25);
        assert!(filter.apply_blur(file.path(), Intensity::ZERO).is_none());
    }

    #[test]
    fn test_sigma_scales_with_intensity() {
        let filter = GaussianBlurFilter::new(0.5);
        assert_eq!(filter.sigma(Intensity::saturating(40)), 20.0);
    }
}
