use std::path::{Path, PathBuf};

use crate::capture::domain::camera_source::CameraSource;
use crate::shared::frame::FrameBuffer;

/// Serves a decoded still image as if it were a live camera.
///
/// Every snapshot is an independent copy of the same frame.
pub struct StillImageSource {
    frame: FrameBuffer,
    path: Option<PathBuf>,
}

impl StillImageSource {
    pub fn open(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let img = image::open(path)
            .map_err(|e| format!("Failed to open {}: {e}", path.display()))?
            .to_rgb8();
        if img.width() == 0 || img.height() == 0 {
            return Err(format!("Image {} has no pixels", path.display()).into());
        }
        Ok(Self {
            frame: FrameBuffer::from_rgb(img),
            path: Some(path.to_path_buf()),
        })
    }

    pub fn from_frame(frame: FrameBuffer) -> Self {
        Self { frame, path: None }
    }
}

impl CameraSource for StillImageSource {
    fn snapshot(&mut self) -> Result<FrameBuffer, Box<dyn std::error::Error>> {
        Ok(self.frame.clone())
    }

    fn describe(&self) -> String {
        match &self.path {
            Some(p) => format!(
                "still image {} ({}x{})",
                p.display(),
                self.frame.width(),
                self.frame.height()
            ),
            None => format!("still frame ({}x{})", self.frame.width(), self.frame.height()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_reads_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.png");
        image::RgbImage::from_pixel(32, 24, image::Rgb([5, 6, 7]))
            .save(&path)
            .unwrap();

        let mut source = StillImageSource::open(&path).unwrap();
        let frame = source.snapshot().unwrap();
        assert_eq!((frame.width(), frame.height(), frame.channels()), (32, 24, 3));
        assert_eq!(&frame.data()[..3], &[5, 6, 7]);
    }

    #[test]
    fn test_snapshots_are_independent_copies() {
        let mut source = StillImageSource::from_frame(FrameBuffer::new(vec![1; 12], 2, 2, 3));
        let a = source.snapshot().unwrap();
        let b = source.snapshot().unwrap();
        assert_eq!(a, b);
        assert_ne!(a.data().as_ptr(), b.data().as_ptr());
    }

    #[test]
    fn test_open_missing_file_fails() {
        assert!(StillImageSource::open(Path::new("/nonexistent/shot.png")).is_err());
    }
}
