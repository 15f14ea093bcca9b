use std::path::{Path, PathBuf};

use crate::compositing::domain::raster::FinalImage;

/// Hands a finished composite to the user.
pub trait ImageExporter: Send {
    /// Writes `image` as `file_name` inside `dir` and returns the full path.
    fn export(
        &self,
        dir: &Path,
        file_name: &str,
        image: &FinalImage,
    ) -> Result<PathBuf, Box<dyn std::error::Error>>;
}
