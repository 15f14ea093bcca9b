use image::imageops::{self, FilterType};

use crate::compositing::domain::photo_compositor::CompositeError;
use crate::compositing::domain::raster::OutputImage;
use crate::cropping::domain::crop_calculator::CropRect;
use crate::shared::frame::FrameBuffer;

/// Extracts `crop` from `frame` and resamples it to `output_size²`.
///
/// Bilinear (`Triangle`) filtering, square in and square out.
pub fn resample_crop(
    frame: &FrameBuffer,
    crop: &CropRect,
    output_size: u32,
) -> Result<OutputImage, CompositeError> {
    if frame.is_empty() || frame.data().is_empty() {
        return Err(CompositeError::EmptySource);
    }
    let rgba = frame
        .to_rgba_image()
        .ok_or(CompositeError::UnsupportedChannels {
            channels: frame.channels(),
        })?;

    let (x, y, size) = crop.to_pixels();
    // to_pixels floors, so a valid crop never needs this; it guards hand-made rects
    let size = size
        .min(frame.width().saturating_sub(x))
        .min(frame.height().saturating_sub(y));
    if size == 0 {
        return Err(CompositeError::EmptySource);
    }

    let region = imageops::crop_imm(&rgba, x, y, size, size).to_image();
    let resized = if size == output_size {
        region
    } else {
        imageops::resize(&region, output_size, output_size, FilterType::Triangle)
    };
    Ok(OutputImage::new(resized))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_frame(w: u32, h: u32) -> FrameBuffer {
        let mut data = Vec::with_capacity((w * h * 3) as usize);
        for y in 0..h {
            for x in 0..w {
                data.extend_from_slice(&[(x % 256) as u8, (y % 256) as u8, 0]);
            }
        }
        FrameBuffer::new(data, w, h, 3)
    }

    #[test]
    fn test_output_is_requested_square() {
        let frame = gradient_frame(800, 600);
        let crop = CropRect {
            x: 100.0,
            y: 0.0,
            size: 600.0,
        };
        let out = resample_crop(&frame, &crop, 521).unwrap();
        assert_eq!((out.width(), out.height()), (521, 521));
    }

    #[test]
    fn test_same_size_crop_is_exact_copy() {
        let frame = gradient_frame(50, 40);
        let crop = CropRect {
            x: 5.0,
            y: 3.0,
            size: 30.0,
        };
        let out = resample_crop(&frame, &crop, 30).unwrap();
        assert_eq!(out.image().get_pixel(0, 0).0, [5, 3, 0, 255]);
        assert_eq!(out.image().get_pixel(29, 29).0, [34, 32, 0, 255]);
    }

    #[test]
    fn test_uniform_frame_stays_uniform() {
        let frame = FrameBuffer::new(vec![90; 64 * 48 * 3], 64, 48, 3);
        let crop = CropRect {
            x: 8.0,
            y: 0.0,
            size: 48.0,
        };
        let out = resample_crop(&frame, &crop, 21).unwrap();
        assert!(out.image().pixels().all(|p| p.0 == [90, 90, 90, 255]));
    }

    #[test]
    fn test_empty_frame_rejected() {
        let frame = FrameBuffer::new(vec![], 0, 0, 3);
        let crop = CropRect {
            x: 0.0,
            y: 0.0,
            size: 1.0,
        };
        assert_eq!(
            resample_crop(&frame, &crop, 10).unwrap_err(),
            CompositeError::EmptySource
        );
    }

    #[test]
    fn test_unsupported_channels_rejected() {
        let frame = FrameBuffer::new(vec![0; 4], 2, 2, 1);
        let crop = CropRect {
            x: 0.0,
            y: 0.0,
            size: 2.0,
        };
        assert!(matches!(
            resample_crop(&frame, &crop, 10),
            Err(CompositeError::UnsupportedChannels { channels: 1 })
        ));
    }
}
