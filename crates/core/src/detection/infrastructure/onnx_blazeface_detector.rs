//! BlazeFace face detector using ONNX Runtime via `ort`.
//!
//! The short-range model is the lightweight profile: one pass at 128×128,
//! boxes only, no landmarks or tracking.
use std::path::Path;

use ndarray::Array4;

use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::infrastructure::execution_provider::detector_execution_providers;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::FrameBuffer;

/// BlazeFace model input resolution.
const INPUT_SIZE: u32 = 128;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.3;

/// Number of BlazeFace anchors (short-range model).
const NUM_ANCHORS: usize = 896;

/// BlazeFace face detector backed by an ONNX Runtime session.
pub struct OnnxBlazefaceDetector {
    session: ort::session::Session,
    min_confidence: f64,
    anchors: Vec<[f32; 2]>,
}

impl OnnxBlazefaceDetector {
    /// Load a BlazeFace ONNX model.
    pub fn new(model_path: &Path, min_confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?
            .with_execution_providers(detector_execution_providers())?
            .commit_from_file(model_path)?;
        log::debug!(
            "Loaded BlazeFace model from {} (min confidence {min_confidence})",
            model_path.display()
        );
        Ok(Self {
            session,
            min_confidence,
            anchors: generate_anchors(),
        })
    }
}

impl FaceDetector for OnnxBlazefaceDetector {
    fn detect(
        &mut self,
        frame: &FrameBuffer,
    ) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
        if frame.is_empty() || frame.channels() < 3 {
            return Err(format!(
                "BlazeFace needs a non-empty RGB frame, got {}x{}x{}",
                frame.width(),
                frame.height(),
                frame.channels()
            )
            .into());
        }
        let fw = frame.width();
        let fh = frame.height();

        let input_tensor = preprocess(frame, INPUT_SIZE);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        // regressors: [1, 896, 16] (box deltas + keypoints)
        // classificators: [1, 896, 1] (logits)
        if outputs.len() < 2 {
            return Err(
                format!("BlazeFace model expected 2 outputs, got {}", outputs.len()).into(),
            );
        }

        let regressors = outputs[0].try_extract_array::<f32>()?;
        let logits = outputs[1].try_extract_array::<f32>()?;
        let regressors = regressors.as_slice().ok_or("BlazeFace regressors are not contiguous")?;
        let logits = logits.as_slice().ok_or("BlazeFace scores are not contiguous")?;

        let candidates = decode(
            regressors,
            logits,
            &self.anchors,
            self.min_confidence,
            (fw, fh),
        );
        Ok(suppress_overlaps(candidates, NMS_IOU_THRESH)
            .into_iter()
            .map(|c| c.to_bounding_box(fw, fh))
            .collect())
    }
}

/// Samples `frame` onto the `size × size` input grid, NCHW, scaled to [0, 1].
///
/// The frame is stretched, not letterboxed; boxes come back normalized to
/// the frame either way.
fn preprocess(frame: &FrameBuffer, size: u32) -> Array4<f32> {
    let src = frame.as_ndarray();
    let s = size as usize;
    let rows = sample_grid(frame.height(), s);
    let cols = sample_grid(frame.width(), s);

    Array4::from_shape_fn((1, 3, s, s), |(_, c, y, x)| {
        f32::from(src[[rows[y], cols[x], c]]) / 255.0
    })
}

/// Source index sampled by each of `n` output cells (cell centres).
fn sample_grid(extent: u32, n: usize) -> Vec<usize> {
    let last = extent.saturating_sub(1) as usize;
    let step = extent as f64 / n as f64;
    (0..n)
        .map(|i| (((i as f64 + 0.5) * step) as usize).min(last))
        .collect()
}

/// Short-range anchor layout: a 16×16 grid with 2 anchors per cell
/// followed by an 8×8 grid with 6.
const ANCHOR_LAYERS: [(usize, usize); 2] = [(16, 2), (8, 6)];

fn generate_anchors() -> Vec<[f32; 2]> {
    let anchors: Vec<[f32; 2]> = ANCHOR_LAYERS
        .iter()
        .flat_map(|&(grid, per_cell)| {
            (0..grid * grid).flat_map(move |cell| {
                let centre = [
                    ((cell % grid) as f32 + 0.5) / grid as f32,
                    ((cell / grid) as f32 + 0.5) / grid as f32,
                ];
                std::iter::repeat(centre).take(per_cell)
            })
        })
        .collect();
    debug_assert_eq!(anchors.len(), NUM_ANCHORS);
    anchors
}

/// A scored face box in frame pixels, before suppression.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Candidate {
    left: f64,
    top: f64,
    right: f64,
    bottom: f64,
    score: f64,
}

impl Candidate {
    fn area(&self) -> f64 {
        (self.right - self.left).max(0.0) * (self.bottom - self.top).max(0.0)
    }

    fn iou(&self, other: &Candidate) -> f64 {
        let overlap = Candidate {
            left: self.left.max(other.left),
            top: self.top.max(other.top),
            right: self.right.min(other.right),
            bottom: self.bottom.min(other.bottom),
            score: 0.0,
        };
        let inter = overlap.area();
        if inter <= 0.0 {
            return 0.0;
        }
        inter / (self.area() + other.area() - inter)
    }

    fn to_bounding_box(self, fw: u32, fh: u32) -> BoundingBox {
        BoundingBox::from_corners(self.left, self.top, self.right, self.bottom, fw, fh)
    }
}

/// Regressor values per anchor: box (dx, dy, w, h) then 6 keypoints.
const REGRESSOR_STRIDE: usize = 16;

/// Turns raw model outputs into candidates at or above `min_confidence`,
/// in frame pixels. Regressor offsets are in input-grid pixels.
fn decode(
    regressors: &[f32],
    logits: &[f32],
    anchors: &[[f32; 2]],
    min_confidence: f64,
    (fw, fh): (u32, u32),
) -> Vec<Candidate> {
    let grid = INPUT_SIZE as f64;
    let (fw, fh) = (fw as f64, fh as f64);

    regressors
        .chunks_exact(REGRESSOR_STRIDE)
        .zip(logits)
        .zip(anchors)
        .filter_map(|((reg, &logit), anchor)| {
            let score = 1.0 / (1.0 + (-f64::from(logit)).exp());
            if score < min_confidence {
                return None;
            }
            let cx = f64::from(anchor[0]) + f64::from(reg[0]) / grid;
            let cy = f64::from(anchor[1]) + f64::from(reg[1]) / grid;
            let half_w = f64::from(reg[2]) / grid / 2.0;
            let half_h = f64::from(reg[3]) / grid / 2.0;
            Some(Candidate {
                left: (cx - half_w) * fw,
                top: (cy - half_h) * fh,
                right: (cx + half_w) * fw,
                bottom: (cy + half_h) * fh,
                score,
            })
        })
        .collect()
}

/// Greedy suppression. Survivors come back best score first.
fn suppress_overlaps(mut candidates: Vec<Candidate>, iou_thresh: f64) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut kept: Vec<Candidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if kept.iter().all(|k| k.iou(&candidate) <= iou_thresh) {
            kept.push(candidate);
        }
    }
    kept
}
