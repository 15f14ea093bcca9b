use std::path::{Path, PathBuf};

use crate::compositing::domain::raster::FinalImage;
use crate::export::domain::image_exporter::ImageExporter;

/// Saves the composite as an RGBA PNG using the `image` crate.
///
/// An existing file with the same name is overwritten.
pub struct PngFileExporter;

impl PngFileExporter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PngFileExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageExporter for PngFileExporter {
    fn export(
        &self,
        dir: &Path,
        file_name: &str,
        image: &FinalImage,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        if image.is_empty() {
            return Err("Nothing to export: image is empty".into());
        }
        std::fs::create_dir_all(dir)?;

        let path = dir.join(file_name);
        image
            .image()
            .save_with_format(&path, image::ImageFormat::Png)
            .map_err(|e| format!("Failed to write {}: {e}", path.display()))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn final_image(w: u32, h: u32) -> FinalImage {
        FinalImage::new(RgbaImage::from_pixel(w, h, Rgba([10, 20, 30, 128])))
    }

    #[test]
    fn test_export_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = PngFileExporter::new()
            .export(dir.path(), "framed-photo.png", &final_image(16, 16))
            .unwrap();

        assert_eq!(path, dir.path().join("framed-photo.png"));
        assert_eq!(image::ImageFormat::from_path(&path).unwrap(), image::ImageFormat::Png);
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_export_preserves_pixels_and_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let path = PngFileExporter::new()
            .export(dir.path(), "out.png", &final_image(8, 6))
            .unwrap();

        let loaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(loaded.dimensions(), (8, 6));
        assert_eq!(loaded.get_pixel(3, 3).0, [10, 20, 30, 128]);
    }

    #[test]
    fn test_export_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let path = PngFileExporter::new()
            .export(&nested, "x.png", &final_image(4, 4))
            .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_export_empty_image_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(PngFileExporter::new()
            .export(dir.path(), "x.png", &FinalImage::new(RgbaImage::new(0, 0)))
            .is_err());
    }
}
