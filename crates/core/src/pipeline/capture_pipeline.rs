use std::sync::Arc;
use std::time::Instant;

use crate::compositing::domain::photo_compositor::{CompositeError, PhotoCompositor};
use crate::compositing::domain::raster::{FinalImage, FrameAsset};
use crate::compositing::infrastructure::crop_resampler::resample_crop;
use crate::config::frame_settings::FrameSettings;
use crate::cropping::domain::crop_calculator::{compute_crop, CropRect};
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::FrameBuffer;

/// Result of one crop → resample → composite pass.
#[derive(Debug, Clone)]
pub struct ProcessedCapture {
    pub crop: CropRect,
    pub image: FinalImage,
}

/// The synchronous tail of a capture: everything that runs once the
/// detection outcome for a frame is known.
pub struct CapturePipeline {
    asset: Arc<FrameAsset>,
    compositor: Box<dyn PhotoCompositor>,
    output_size: u32,
    detection_crop_scale: f64,
}

impl CapturePipeline {
    pub fn new(
        asset: Arc<FrameAsset>,
        compositor: Box<dyn PhotoCompositor>,
        settings: &FrameSettings,
    ) -> Self {
        Self {
            asset,
            compositor,
            output_size: settings.output_size,
            detection_crop_scale: settings.detection_crop_scale,
        }
    }

    /// Crops `frame` around `detection` (or its centre), resamples the crop
    /// and composites it into the frame asset.
    ///
    /// The crop uses the dimensions of `frame` itself, not whatever the
    /// camera reports now.
    pub fn complete(
        &self,
        frame: &FrameBuffer,
        detection: Option<&BoundingBox>,
        logger: &mut dyn PipelineLogger,
    ) -> Result<ProcessedCapture, CompositeError> {
        if frame.is_empty() {
            return Err(CompositeError::EmptySource);
        }

        let t = Instant::now();
        let crop = compute_crop(
            frame.width(),
            frame.height(),
            detection,
            self.detection_crop_scale,
        );
        logger.timing("crop", elapsed_ms(t));

        let t = Instant::now();
        let photo = resample_crop(frame, &crop, self.output_size)?;
        logger.timing("resample", elapsed_ms(t));

        let t = Instant::now();
        let image = self.compositor.compose(&self.asset, &photo)?;
        logger.timing("composite", elapsed_ms(t));

        Ok(ProcessedCapture { crop, image })
    }
}

pub(crate) fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}
