use crate::shared::bounding_box::BoundingBox;

/// Square crop in source-frame pixel coordinates.
///
/// Always lies fully inside `[0, width] × [0, height]` of the frame it was
/// computed for.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub size: f64,
}

impl CropRect {
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.size / 2.0, self.y + self.size / 2.0)
    }

    /// Integer pixel rectangle `(x, y, size)` inside the frame.
    ///
    /// Flooring both offset and size keeps `x + size` within the frame.
    pub fn to_pixels(&self) -> (u32, u32, u32) {
        (
            snap_floor(self.x).max(0.0) as u32,
            snap_floor(self.y).max(0.0) as u32,
            snap_floor(self.size).max(1.0) as u32,
        )
    }
}

/// Floors, treating values within float noise of an integer as that integer.
fn snap_floor(v: f64) -> f64 {
    let rounded = v.round();
    if (v - rounded).abs() < 1e-6 {
        rounded
    } else {
        v.floor()
    }
}

/// Computes the square crop for a frame, centred on the detected face when
/// there is one and on the frame centre otherwise.
///
/// A detected face tightens the crop to `detection_scale` of the short side.
/// Near an edge the crop slides inward rather than shrinking.
pub fn compute_crop(
    frame_width: u32,
    frame_height: u32,
    detection: Option<&BoundingBox>,
    detection_scale: f64,
) -> CropRect {
    let w = frame_width as f64;
    let h = frame_height as f64;

    let mut size = w.min(h);
    let (cx, cy) = match detection {
        Some(face) => {
            size *= detection_scale;
            face.center_in(frame_width, frame_height)
        }
        None => (w / 2.0, h / 2.0),
    };

    CropRect {
        x: clamp_offset(cx - size / 2.0, w - size),
        y: clamp_offset(cy - size / 2.0, h - size),
        size,
    }
}

fn clamp_offset(offset: f64, max_offset: f64) -> f64 {
    offset.min(max_offset).max(0.0)
}
