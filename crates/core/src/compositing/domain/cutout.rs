use crate::config::frame_settings::FrameSettings;
use crate::shared::constants::{self, CANVAS_SIZE, CIRCLE_X, CIRCLE_Y, OUTPUT_SIZE};

/// Placement of the circular photo cutout on the frame canvas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cutout {
    pub canvas_size: u32,
    pub output_size: u32,
    pub circle_x: f64,
    pub circle_y: f64,
}

impl Default for Cutout {
    fn default() -> Self {
        Self {
            canvas_size: CANVAS_SIZE,
            output_size: OUTPUT_SIZE,
            circle_x: CIRCLE_X,
            circle_y: CIRCLE_Y,
        }
    }
}

impl Cutout {
    pub fn from_settings(settings: &FrameSettings) -> Self {
        Self {
            canvas_size: settings.canvas_size,
            output_size: settings.output_size,
            circle_x: settings.circle_x,
            circle_y: settings.circle_y,
        }
    }

    pub fn radius(&self) -> f64 {
        constants::radius(self.output_size)
    }

    /// Top-left corner where the photo is drawn, in canvas coordinates.
    pub fn photo_origin(&self) -> (f64, f64) {
        let r = self.radius();
        (self.circle_x - r, self.circle_y - r)
    }

    /// Whether the canvas pixel `(px, py)` lies in the clip circle,
    /// tested at the pixel center.
    pub fn contains(&self, px: u32, py: u32) -> bool {
        let dx = px as f64 + 0.5 - self.circle_x;
        let dy = py as f64 + 0.5 - self.circle_y;
        let r = self.radius();
        dx * dx + dy * dy <= r * r
    }

    /// Canvas pixel bounds `[x0, x1) × [y0, y1)` enclosing the circle.
    pub fn pixel_bounds(&self) -> (u32, u32, u32, u32) {
        let r = self.radius();
        let clamp = |v: f64| v.max(0.0).min(self.canvas_size as f64) as u32;
        (
            clamp((self.circle_x - r).floor()),
            clamp((self.circle_x + r).ceil()),
            clamp((self.circle_y - r).floor()),
            clamp((self.circle_y + r).ceil()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_origin() {
        let (ox, oy) = Cutout::default().photo_origin();
        assert_relative_eq!(ox, 275.5);
        assert_relative_eq!(oy, 94.5);
    }

    #[test]
    fn test_contains_center_not_corner() {
        let c = Cutout::default();
        assert!(c.contains(536, 355));
        assert!(!c.contains(0, 0));
        assert!(!c.contains(276, 95)); // bounding-box corner of the photo
    }

    #[test]
    fn test_contains_edges() {
        let c = Cutout::default();
        // 536 + 260 is inside, 536 + 261 is not (pixel centers)
        assert!(c.contains(795, 354));
        assert!(!c.contains(797, 354));
    }

    #[test]
    fn test_pixel_bounds_cover_circle() {
        let c = Cutout::default();
        let (x0, x1, y0, y1) = c.pixel_bounds();
        assert_eq!((x0, x1, y0, y1), (275, 797, 94, 616));
    }
}
