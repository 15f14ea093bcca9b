use thiserror::Error;

use super::raster::{FinalImage, FrameAsset, OutputImage};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompositeError {
    #[error("source image is missing or empty")]
    EmptySource,
    #[error("unsupported source format: {channels} channels")]
    UnsupportedChannels { channels: u8 },
    #[error("photo must be {expected}x{expected}, got {width}x{height}")]
    PhotoSize { expected: u32, width: u32, height: u32 },
    #[error("frame asset must be {expected}x{expected}, got {width}x{height}")]
    AssetSize { expected: u32, width: u32, height: u32 },
}

/// Domain interface for layering the resampled photo into the frame asset.
///
/// Implementations must be deterministic: identical inputs give
/// bit-identical output.
pub trait PhotoCompositor: Send {
    fn compose(&self, asset: &FrameAsset, photo: &OutputImage)
        -> Result<FinalImage, CompositeError>;
}
