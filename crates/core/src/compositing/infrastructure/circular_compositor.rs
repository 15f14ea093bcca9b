use crate::compositing::domain::cutout::Cutout;
use crate::compositing::domain::photo_compositor::{CompositeError, PhotoCompositor};
use crate::compositing::domain::raster::{FinalImage, FrameAsset, OutputImage};

/// CPU compositor that draws the photo into the frame through a circular clip.
///
/// The canvas starts from the asset (drawing onto a cleared canvas is a
/// copy), then every pixel whose center falls inside the cutout circle gets
/// the photo pixel blended source-over on top.
pub struct CircularCompositor {
    cutout: Cutout,
}

impl CircularCompositor {
    pub fn new(cutout: Cutout) -> Self {
        Self { cutout }
    }

    fn check_inputs(&self, asset: &FrameAsset, photo: &OutputImage) -> Result<(), CompositeError> {
        if photo.is_empty() {
            return Err(CompositeError::EmptySource);
        }
        let expected = self.cutout.output_size;
        if photo.width() != expected || photo.height() != expected {
            return Err(CompositeError::PhotoSize {
                expected,
                width: photo.width(),
                height: photo.height(),
            });
        }
        let canvas = self.cutout.canvas_size;
        if asset.width() != canvas || asset.height() != canvas {
            return Err(CompositeError::AssetSize {
                expected: canvas,
                width: asset.width(),
                height: asset.height(),
            });
        }
        Ok(())
    }
}

impl Default for CircularCompositor {
    fn default() -> Self {
        Self::new(Cutout::default())
    }
}

impl PhotoCompositor for CircularCompositor {
    fn compose(
        &self,
        asset: &FrameAsset,
        photo: &OutputImage,
    ) -> Result<FinalImage, CompositeError> {
        self.check_inputs(asset, photo)?;

        let mut canvas = asset.image().clone();
        let src = photo.image();
        let (ox, oy) = self.cutout.photo_origin();
        let (x0, x1, y0, y1) = self.cutout.pixel_bounds();

        for py in y0..y1 {
            for px in x0..x1 {
                if !self.cutout.contains(px, py) {
                    continue;
                }
                let Some(sx) = photo_index(px, ox, src.width()) else {
                    continue;
                };
                let Some(sy) = photo_index(py, oy, src.height()) else {
                    continue;
                };
                let over = src.get_pixel(sx, sy).0;
                let under = canvas.get_pixel(px, py).0;
                canvas.put_pixel(px, py, image::Rgba(blend_over(under, over)));
            }
        }

        Ok(FinalImage::new(canvas))
    }
}

/// Photo pixel covering canvas pixel `p`, sampled at the pixel center.
fn photo_index(p: u32, origin: f64, len: u32) -> Option<u32> {
    let u = (p as f64 + 0.5 - origin).floor();
    if u < 0.0 || u >= len as f64 {
        None
    } else {
        Some(u as u32)
    }
}

/// Non-premultiplied source-over blend.
fn blend_over(dst: [u8; 4], src: [u8; 4]) -> [u8; 4] {
    match src[3] {
        255 => return src,
        0 => return dst,
        _ => {}
    }
    let sa = src[3] as f32 / 255.0;
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    let mut out = [0u8; 4];
    for c in 0..3 {
        let v = (src[c] as f32 * sa + dst[c] as f32 * da * (1.0 - sa)) / out_a;
        out[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_a * 255.0).round() as u8;
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    const ASSET: [u8; 4] = [10, 20, 30, 255];
    const PHOTO: [u8; 4] = [200, 100, 50, 255];

    fn small_cutout() -> Cutout {
        Cutout {
            canvas_size: 40,
            output_size: 20,
            circle_x: 20.0,
            circle_y: 15.0,
        }
    }

    fn asset(size: u32) -> FrameAsset {
        FrameAsset::new(RgbaImage::from_pixel(size, size, Rgba(ASSET)))
    }

    fn photo(size: u32) -> OutputImage {
        OutputImage::new(RgbaImage::from_pixel(size, size, Rgba(PHOTO)))
    }

    #[test]
    fn test_circle_interior_takes_photo() {
        let compositor = CircularCompositor::new(small_cutout());
        let out = compositor.compose(&asset(40), &photo(20)).unwrap();
        assert_eq!(out.image().get_pixel(20, 15).0, PHOTO);
    }

    #[test]
    fn test_outside_circle_keeps_asset() {
        let compositor = CircularCompositor::new(small_cutout());
        let out = compositor.compose(&asset(40), &photo(20)).unwrap();
        assert_eq!(out.image().get_pixel(0, 0).0, ASSET);
        assert_eq!(out.image().get_pixel(39, 39).0, ASSET);
        // corner of the photo square, outside the circle
        assert_eq!(out.image().get_pixel(10, 5).0, ASSET);
    }

    #[test]
    fn test_photo_pixels_map_from_origin() {
        // photo with a unique pixel at its center
        let mut img = RgbaImage::from_pixel(20, 20, Rgba(PHOTO));
        img.put_pixel(10, 10, Rgba([1, 2, 3, 255]));
        let compositor = CircularCompositor::new(small_cutout());
        let out = compositor
            .compose(&asset(40), &OutputImage::new(img))
            .unwrap();
        // origin is (10, 5), so photo (10, 10) lands on canvas (20, 15)
        assert_eq!(out.image().get_pixel(20, 15).0, [1, 2, 3, 255]);
    }

    #[test]
    fn test_output_has_canvas_dimensions() {
        let compositor = CircularCompositor::default();
        let out = compositor.compose(&asset(1080), &photo(521)).unwrap();
        assert_eq!((out.width(), out.height()), (1080, 1080));
        assert_eq!(out.image().get_pixel(536, 355).0, PHOTO);
    }

    #[test]
    fn test_compose_is_idempotent() {
        let mut img = RgbaImage::new(20, 20);
        for (x, y, p) in img.enumerate_pixels_mut() {
            *p = Rgba([(x * 12) as u8, (y * 12) as u8, 77, 128 + (x as u8)]);
        }
        let photo = OutputImage::new(img);
        let compositor = CircularCompositor::new(small_cutout());
        let a = compositor.compose(&asset(40), &photo).unwrap();
        let b = compositor.compose(&asset(40), &photo).unwrap();
        assert_eq!(a.image().as_raw(), b.image().as_raw());
    }

    #[test]
    fn test_empty_photo_rejected() {
        let compositor = CircularCompositor::new(small_cutout());
        let err = compositor
            .compose(&asset(40), &OutputImage::new(RgbaImage::new(0, 0)))
            .unwrap_err();
        assert_eq!(err, CompositeError::EmptySource);
    }

    #[test]
    fn test_wrong_photo_size_rejected() {
        let compositor = CircularCompositor::new(small_cutout());
        let err = compositor.compose(&asset(40), &photo(19)).unwrap_err();
        assert!(matches!(err, CompositeError::PhotoSize { expected: 20, .. }));
    }

    #[test]
    fn test_wrong_asset_size_rejected() {
        let compositor = CircularCompositor::new(small_cutout());
        let err = compositor.compose(&asset(39), &photo(20)).unwrap_err();
        assert!(matches!(err, CompositeError::AssetSize { expected: 40, .. }));
    }

    #[test]
    fn test_blend_over_opaque_and_transparent() {
        assert_eq!(blend_over(ASSET, PHOTO), PHOTO);
        assert_eq!(blend_over(ASSET, [9, 9, 9, 0]), ASSET);
    }

    #[test]
    fn test_blend_over_half_alpha_on_opaque() {
        let out = blend_over([0, 0, 0, 255], [255, 255, 255, 128]);
        assert_eq!(out[3], 255);
        assert!((127..=129).contains(&out[0]));
    }
}
