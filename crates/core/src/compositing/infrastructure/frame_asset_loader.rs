use std::path::Path;
use std::sync::Arc;

use image::imageops::FilterType;

use crate::compositing::domain::raster::FrameAsset;

/// Loads the decorative frame from disk and scales it to the canvas.
///
/// The artwork is always drawn at full canvas size, so an asset authored at
/// another resolution is resized here once rather than on every capture.
pub fn load_frame_asset(
    path: &Path,
    canvas_size: u32,
) -> Result<Arc<FrameAsset>, Box<dyn std::error::Error>> {
    let img = image::open(path)
        .map_err(|e| format!("Failed to load frame asset {}: {e}", path.display()))?;
    log::info!(
        "Loaded frame asset {} ({}x{})",
        path.display(),
        img.width(),
        img.height()
    );
    Ok(Arc::new(frame_asset_from_image(img, canvas_size)))
}

pub fn frame_asset_from_image(img: image::DynamicImage, canvas_size: u32) -> FrameAsset {
    let rgba = img.into_rgba8();
    let rgba = if rgba.width() == canvas_size && rgba.height() == canvas_size {
        rgba
    } else {
        log::debug!(
            "Scaling frame asset from {}x{} to {canvas_size}x{canvas_size}",
            rgba.width(),
            rgba.height()
        );
        image::imageops::resize(&rgba, canvas_size, canvas_size, FilterType::Triangle)
    };
    FrameAsset::new(rgba)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_load_keeps_canvas_sized_asset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        RgbaImage::from_pixel(64, 64, Rgba([1, 2, 3, 200]))
            .save(&path)
            .unwrap();

        let asset = load_frame_asset(&path, 64).unwrap();
        assert_eq!((asset.width(), asset.height()), (64, 64));
        assert_eq!(asset.image().get_pixel(10, 10).0, [1, 2, 3, 200]);
    }

    #[test]
    fn test_load_scales_to_canvas() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        RgbaImage::from_pixel(30, 50, Rgba([9, 9, 9, 255]))
            .save(&path)
            .unwrap();

        let asset = load_frame_asset(&path, 100).unwrap();
        assert_eq!((asset.width(), asset.height()), (100, 100));
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(load_frame_asset(Path::new("/nonexistent/frame.png"), 100).is_err());
    }
}
