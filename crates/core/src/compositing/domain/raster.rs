use image::RgbaImage;

/// The decorative frame artwork, already scaled to the canvas size.
///
/// Loaded once and shared read-only by every capture cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameAsset(RgbaImage);

/// The square crop resampled to the cutout size.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputImage(RgbaImage);

/// The composited result; the only artifact offered for download.
#[derive(Clone, Debug, PartialEq)]
pub struct FinalImage(RgbaImage);

macro_rules! raster_accessors {
    ($name:ident) => {
        impl $name {
            pub fn new(image: RgbaImage) -> Self {
                Self(image)
            }

            pub fn image(&self) -> &RgbaImage {
                &self.0
            }

            pub fn width(&self) -> u32 {
                self.0.width()
            }

            pub fn height(&self) -> u32 {
                self.0.height()
            }

            pub fn is_empty(&self) -> bool {
                self.0.width() == 0 || self.0.height() == 0
            }
        }
    };
}

raster_accessors!(FrameAsset);
raster_accessors!(OutputImage);
raster_accessors!(FinalImage);
