//! Image save collaborator
//!
//! Writes the current foreground preview to disk. Pure I/O; the pipeline
//! only decides what image is current.

use image::{ImageFormat, RgbaImage};
use photoblur_common::{Error, Result};
use std::path::Path;
use tracing::info;

/// Destination for saved previews
pub trait ImageStore: Send {
    fn save(&self, path: &Path, image: &RgbaImage) -> Result<()>;
}

/// PNG writer with atomic replace
///
/// Encodes to a sibling temporary file, then renames over the destination so
/// a failed save never leaves a truncated file behind.
#[derive(Debug, Default, Clone)]
pub struct PngImageStore;

impl ImageStore for PngImageStore {
    fn save(&self, path: &Path, image: &RgbaImage) -> Result<()> {
        let file_name = path
            .file_name()
            .ok_or_else(|| Error::InvalidInput(format!("Not a file path: {}", path.display())))?;

        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(".partial");
        let tmp_path = path.with_file_name(tmp_name);

        if let Err(e) = image.save_with_format(&tmp_path, ImageFormat::Png) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        std::fs::rename(&tmp_path, path)?;

        info!(
            "Saved {}x{} preview to {}",
            image.width(),
            image.height(),
            path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_save_writes_readable_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let image = RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 255]));

        PngImageStore.save(&path, &image).unwrap();

        let loaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(loaded.dimensions(), (3, 2));
        assert_eq!(loaded.get_pixel(1, 1), &Rgba([10, 20, 30, 255]));
        assert!(!dir.path().join("out.png.partial").exists());
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let image = RgbaImage::new(1, 1);
        let result = PngImageStore.save(Path::new("/nonexistent/dir/out.png"), &image);
        assert!(result.is_err());
    }
}
