use crate::shared::frame::FrameBuffer;

/// A live frame source the capture pipeline pulls single stills from.
///
/// Resolution is whatever the source reports at the moment of the
/// snapshot; callers must not assume it stays constant.
pub trait CameraSource: Send {
    fn snapshot(&mut self) -> Result<FrameBuffer, Box<dyn std::error::Error>>;

    /// Human-readable description for logs.
    fn describe(&self) -> String {
        "camera".to_string()
    }
}
