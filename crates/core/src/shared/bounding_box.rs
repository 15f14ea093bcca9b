/// A detected face in normalized `[0, 1]` frame coordinates.
///
/// Only the center drives cropping; the extent is carried for logging.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x_center: f64, y_center: f64, width: f64, height: f64) -> Self {
        Self {
            x_center,
            y_center,
            width,
            height,
        }
    }

    /// A zero-extent box at the given normalized center.
    pub fn at(x_center: f64, y_center: f64) -> Self {
        Self::new(x_center, y_center, 0.0, 0.0)
    }

    /// Builds a normalized box from pixel corners, clamping into the frame.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64, frame_w: u32, frame_h: u32) -> Self {
        let fw = frame_w.max(1) as f64;
        let fh = frame_h.max(1) as f64;
        let x1 = x1.clamp(0.0, fw);
        let x2 = x2.clamp(0.0, fw);
        let y1 = y1.clamp(0.0, fh);
        let y2 = y2.clamp(0.0, fh);
        Self {
            x_center: (x1 + x2) / 2.0 / fw,
            y_center: (y1 + y2) / 2.0 / fh,
            width: (x2 - x1).max(0.0) / fw,
            height: (y2 - y1).max(0.0) / fh,
        }
    }

    /// Center in pixel coordinates of a `frame_w × frame_h` frame.
    pub fn center_in(&self, frame_w: u32, frame_h: u32) -> (f64, f64) {
        (
            self.x_center * frame_w as f64,
            self.y_center * frame_h as f64,
        )
    }
}
