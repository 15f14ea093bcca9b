use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::FrameBuffer;

/// Domain interface for face detection on a single still frame.
///
/// Returns normalized boxes, best first. An empty list means no face was
/// found, which is not an error.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &FrameBuffer)
        -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>>;
}
