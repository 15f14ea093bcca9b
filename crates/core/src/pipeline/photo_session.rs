use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::capture::domain::camera_source::CameraSource;
use crate::compositing::domain::raster::FinalImage;
use crate::cropping::domain::crop_calculator::CropRect;
use crate::detection::infrastructure::detection_worker::{DetectionOutcome, DetectionWorker};
use crate::export::domain::image_exporter::ImageExporter;
use crate::pipeline::capture_pipeline::{elapsed_ms, CapturePipeline};
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::pipeline::session_error::SessionError;
use crate::pipeline::session_phase::{SessionEvent, SessionPhase};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::capture_token::CaptureToken;
use crate::shared::constants::OUTPUT_FILENAME;
use crate::shared::frame::FrameBuffer;

/// A capture waiting for its detection outcome. Owns the frame it was
/// taken from, so an outcome can only ever be applied to this frame.
struct PendingCapture {
    token: CaptureToken,
    frame: Arc<FrameBuffer>,
    started: Instant,
}

/// A finished capture, available for download until the next retake.
#[derive(Debug, Clone)]
pub struct ReadyCapture {
    pub token: CaptureToken,
    pub crop: CropRect,
    pub detection: Option<BoundingBox>,
    image: FinalImage,
}

impl ReadyCapture {
    pub fn image(&self) -> &FinalImage {
        &self.image
    }
}

enum SessionState {
    Live,
    Processing(PendingCapture),
    Ready(ReadyCapture),
}

impl SessionState {
    fn phase(&self) -> SessionPhase {
        match self {
            SessionState::Live => SessionPhase::Live,
            SessionState::Processing(_) => SessionPhase::Processing,
            SessionState::Ready(_) => SessionPhase::Ready,
        }
    }
}

/// Drives capture → detect → crop → composite for one user session.
///
/// Single-threaded and cooperative: nothing happens between calls except
/// detection, which runs on the [`DetectionWorker`] thread. Outcomes are
/// picked up by [`poll`](Self::poll) or [`wait`](Self::wait).
pub struct PhotoSession {
    camera: Option<Box<dyn CameraSource>>,
    detector: DetectionWorker,
    pipeline: CapturePipeline,
    state: SessionState,
    last_token: Option<CaptureToken>,
    output_filename: String,
    logger: Box<dyn PipelineLogger>,
    attempted: usize,
    completed: usize,
}

impl PhotoSession {
    /// Starts a session in `Live`. A failed camera acquisition is logged and
    /// leaves the session without a camera; `capture` then reports
    /// [`SessionError::CameraUnavailable`].
    pub fn new(
        camera: Result<Box<dyn CameraSource>, Box<dyn std::error::Error>>,
        detector: DetectionWorker,
        pipeline: CapturePipeline,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        let camera = match camera {
            Ok(camera) => {
                log::info!("Using {}", camera.describe());
                Some(camera)
            }
            Err(e) => {
                log::error!("Camera unavailable: {e}");
                None
            }
        };
        if !detector.is_enabled() {
            log::warn!("Face detection disabled; captures use the centre crop");
        }

        Self {
            camera,
            detector,
            pipeline,
            state: SessionState::Live,
            last_token: None,
            output_filename: OUTPUT_FILENAME.to_string(),
            logger,
            attempted: 0,
            completed: 0,
        }
    }

    pub fn with_output_filename(mut self, name: impl Into<String>) -> Self {
        self.output_filename = name.into();
        self
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase()
    }

    pub fn has_camera(&self) -> bool {
        self.camera.is_some()
    }

    pub fn pending_token(&self) -> Option<CaptureToken> {
        match &self.state {
            SessionState::Processing(pending) => Some(pending.token),
            _ => None,
        }
    }

    pub fn ready_capture(&self) -> Option<&ReadyCapture> {
        match &self.state {
            SessionState::Ready(ready) => Some(ready),
            _ => None,
        }
    }

    pub fn final_image(&self) -> Option<&FinalImage> {
        self.ready_capture().map(ReadyCapture::image)
    }

    /// Takes a snapshot and submits it for detection. Returns the token the
    /// eventual outcome will carry.
    pub fn capture(&mut self) -> Result<CaptureToken, SessionError> {
        self.phase().on(SessionEvent::Capture)?;
        let camera = self
            .camera
            .as_mut()
            .ok_or(SessionError::CameraUnavailable)?;

        let started = Instant::now();
        let frame = camera
            .snapshot()
            .map_err(|e| SessionError::Snapshot(e.to_string()))?;
        if frame.is_empty() {
            return Err(SessionError::Snapshot("camera returned an empty frame".into()));
        }
        self.logger.timing("snapshot", elapsed_ms(started));

        let token = self.last_token.map_or_else(CaptureToken::first, CaptureToken::next);
        self.last_token = Some(token);
        self.attempted += 1;

        let frame = Arc::new(frame);
        log::debug!("{token}: {}x{} frame submitted", frame.width(), frame.height());
        self.detector.submit(token, Arc::clone(&frame));
        self.state = SessionState::Processing(PendingCapture {
            token,
            frame,
            started,
        });
        Ok(token)
    }

    /// Applies every outcome that has already arrived. Never blocks.
    pub fn poll(&mut self) -> Result<SessionPhase, SessionError> {
        while let Some(outcome) = self.detector.try_recv() {
            self.handle_outcome(outcome)?;
        }
        Ok(self.phase())
    }

    /// Blocks until the pending capture resolves. Returns immediately when
    /// nothing is pending.
    pub fn wait(&mut self) -> Result<SessionPhase, SessionError> {
        self.poll()?;
        while matches!(self.state, SessionState::Processing(_)) {
            let Some(outcome) = self.detector.recv() else {
                break;
            };
            self.handle_outcome(outcome)?;
        }
        Ok(self.phase())
    }

    /// Discards the finished capture and returns to `Live`.
    pub fn retake(&mut self) -> Result<(), SessionError> {
        self.phase().on(SessionEvent::Retake)?;
        if let Some(ready) = self.ready_capture() {
            log::debug!("Discarding {}", ready.token);
        }
        self.state = SessionState::Live;
        self.logger.info("Back to live view");
        Ok(())
    }

    /// Writes the finished image through `exporter` into `dir`.
    pub fn download(
        &mut self,
        exporter: &dyn ImageExporter,
        dir: &Path,
    ) -> Result<PathBuf, SessionError> {
        let phase = self.phase();
        phase.on(SessionEvent::Download)?;
        let SessionState::Ready(ready) = &self.state else {
            return Err(SessionError::InvalidTransition {
                phase,
                event: SessionEvent::Download,
            });
        };

        let path = exporter
            .export(dir, &self.output_filename, &ready.image)
            .map_err(|e| SessionError::Export(e.to_string()))?;
        self.logger.info(&format!("Saved {}", path.display()));
        Ok(path)
    }

    /// Emits the logger's end-of-session summary.
    pub fn finish(&self) {
        self.logger.summary();
    }

    fn handle_outcome(&mut self, outcome: DetectionOutcome) -> Result<(), SessionError> {
        let current = matches!(
            &self.state,
            SessionState::Processing(pending) if pending.token == outcome.token
        );
        if !current {
            log::debug!(
                "Dropping stale detection result for {} (now {})",
                outcome.token,
                self.phase()
            );
            self.logger.metric("stale_results", 1.0);
            return Ok(());
        }

        let next = self.phase().on(SessionEvent::PipelineComplete)?;
        let pending = match std::mem::replace(&mut self.state, SessionState::Live) {
            SessionState::Processing(pending) => pending,
            other => {
                self.state = other;
                return Ok(());
            }
        };

        self.logger.timing("detect", outcome.elapsed_ms);
        let detection = match outcome.result {
            Ok(faces) => {
                self.logger.metric("faces", faces.len() as f64);
                faces.into_iter().next()
            }
            Err(e) => {
                log::warn!("Face detection failed for {}: {e}; using centre crop", pending.token);
                None
            }
        };

        match self
            .pipeline
            .complete(&pending.frame, detection.as_ref(), self.logger.as_mut())
        {
            Ok(done) => {
                debug_assert_eq!(next, SessionPhase::Ready);
                self.completed += 1;
                self.logger.timing("capture", elapsed_ms(pending.started));
                self.logger.progress(self.completed, self.attempted);
                log::info!(
                    "{} ready: crop ({:.1}, {:.1}) size {:.1}, {}",
                    pending.token,
                    done.crop.x,
                    done.crop.y,
                    done.crop.size,
                    if detection.is_some() { "face" } else { "no face" }
                );
                self.state = SessionState::Ready(ReadyCapture {
                    token: pending.token,
                    crop: done.crop,
                    detection,
                    image: done.image,
                });
                Ok(())
            }
            Err(e) => {
                let reverted = SessionPhase::Processing.on(SessionEvent::PipelineFailed)?;
                debug_assert_eq!(reverted, self.phase());
                log::error!("{} abandoned: {e}", pending.token);
                Err(e.into())
            }
        }
    }
}
