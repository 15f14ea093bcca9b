//! Geometry of the bundled decorative frame and detector defaults.
//!
//! The circle values are tied to the artwork: swapping the frame asset
//! means retuning `CIRCLE_X`, `CIRCLE_Y` and `OUTPUT_SIZE` together.

pub const CANVAS_SIZE: u32 = 1080;
pub const OUTPUT_SIZE: u32 = 521;

pub const CIRCLE_X: f64 = 536.0;
pub const CIRCLE_Y: f64 = 355.0;

/// Crop shrink applied when a face was detected.
pub const DETECTION_CROP_SCALE: f64 = 0.75;

pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.6;
pub const DEFAULT_DETECTION_PROFILE: &str = "short";

pub const BLAZEFACE_MODEL_NAME: &str = "blazeface_short_range.onnx";

pub const OUTPUT_FILENAME: &str = "framed-photo.png";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// Radius of the photo cutout, derived from the output size.
pub fn radius(output_size: u32) -> f64 {
    output_size as f64 / 2.0
}
