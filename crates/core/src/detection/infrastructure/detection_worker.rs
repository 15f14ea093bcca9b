use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};

use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::capture_token::CaptureToken;
use crate::shared::frame::FrameBuffer;

/// Result of one detection submission, tagged with the capture it belongs to.
#[derive(Debug, Clone)]
pub struct DetectionOutcome {
    pub token: CaptureToken,
    pub result: Result<Vec<BoundingBox>, String>,
    pub elapsed_ms: f64,
}

struct DetectionRequest {
    token: CaptureToken,
    frame: Arc<FrameBuffer>,
}

/// Runs a [`FaceDetector`] on a dedicated thread and hands outcomes back
/// over a channel.
///
/// Requests are processed one at a time in submission order, so at most one
/// detection is executing. A disabled worker answers every submission with
/// an error outcome, which callers treat as "no face".
pub struct DetectionWorker {
    request_tx: Option<Sender<DetectionRequest>>,
    outcome_tx: Sender<DetectionOutcome>,
    outcome_rx: Receiver<DetectionOutcome>,
    handle: Option<JoinHandle<()>>,
    disabled_reason: Option<String>,
}

impl DetectionWorker {
    pub fn spawn(detector: Box<dyn FaceDetector>) -> Self {
        let (request_tx, request_rx) = crossbeam_channel::unbounded::<DetectionRequest>();
        let (outcome_tx, outcome_rx) = crossbeam_channel::unbounded::<DetectionOutcome>();
        let handle = spawn_detector(detector, request_rx, outcome_tx.clone());
        Self {
            request_tx: Some(request_tx),
            outcome_tx,
            outcome_rx,
            handle: Some(handle),
            disabled_reason: None,
        }
    }

    /// A worker with no detector behind it.
    pub fn disabled(reason: impl Into<String>) -> Self {
        let (outcome_tx, outcome_rx) = crossbeam_channel::unbounded::<DetectionOutcome>();
        Self {
            request_tx: None,
            outcome_tx,
            outcome_rx,
            handle: None,
            disabled_reason: Some(reason.into()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.disabled_reason.is_none()
    }

    /// Queues `frame` for detection. Never blocks; if the detector is
    /// unavailable the error outcome is delivered immediately.
    pub fn submit(&self, token: CaptureToken, frame: Arc<FrameBuffer>) {
        let failure = match (&self.request_tx, &self.disabled_reason) {
            (Some(tx), _) => match tx.send(DetectionRequest { token, frame }) {
                Ok(()) => return,
                Err(_) => "detection thread has stopped".to_string(),
            },
            (None, Some(reason)) => reason.clone(),
            (None, None) => "detector not configured".to_string(),
        };
        let _ = self.outcome_tx.send(DetectionOutcome {
            token,
            result: Err(failure),
            elapsed_ms: 0.0,
        });
    }

    pub fn try_recv(&self) -> Option<DetectionOutcome> {
        self.outcome_rx.try_recv().ok()
    }

    /// Blocks until the next outcome. There is no timeout: a detector that
    /// never returns blocks the caller indefinitely.
    pub fn recv(&self) -> Option<DetectionOutcome> {
        self.outcome_rx.recv().ok()
    }

    #[cfg(test)]
    pub(crate) fn recv_timeout(&self, timeout: std::time::Duration) -> Option<DetectionOutcome> {
        self.outcome_rx.recv_timeout(timeout).ok()
    }
}

impl Drop for DetectionWorker {
    fn drop(&mut self) {
        // Closing the request channel lets the thread exit after its current call.
        self.request_tx = None;
        if let Some(handle) = self.handle.take() {
            if handle.is_finished() && handle.join().is_err() {
                log::warn!("Detection thread panicked");
            }
        }
    }
}

fn spawn_detector(
    mut detector: Box<dyn FaceDetector>,
    request_rx: Receiver<DetectionRequest>,
    outcome_tx: Sender<DetectionOutcome>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for request in request_rx {
            let started = Instant::now();
            let result = match panic::catch_unwind(AssertUnwindSafe(|| {
                detector.detect(&request.frame)
            })) {
                Ok(Ok(faces)) => Ok(faces),
                Ok(Err(e)) => Err(e.to_string()),
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    log::error!("Face detector panicked on {}: {message}", request.token);
                    Err(format!("detector panicked: {message}"))
                }
            };
            let outcome = DetectionOutcome {
                token: request.token,
                result,
                elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
            };
            if outcome_tx.send(outcome).is_err() {
                break;
            }
        }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const TIMEOUT: Duration = Duration::from_secs(5);

    struct StubDetector {
        boxes: Vec<BoundingBox>,
    }

    impl FaceDetector for StubDetector {
        fn detect(
            &mut self,
            _frame: &FrameBuffer,
        ) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
            Ok(self.boxes.clone())
        }
    }

    struct FailingDetector;

    impl FaceDetector for FailingDetector {
        fn detect(
            &mut self,
            _frame: &FrameBuffer,
        ) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
            Err("inference failed".into())
        }
    }

    /// Reports the frame width it saw, to check which frame a result belongs to.
    struct WidthEcho;

    impl FaceDetector for WidthEcho {
        fn detect(
            &mut self,
            frame: &FrameBuffer,
        ) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
            Ok(vec![BoundingBox::at(frame.width() as f64 / 1000.0, 0.5)])
        }
    }

    struct PanickingDetector {
        calls: usize,
    }

    impl FaceDetector for PanickingDetector {
        fn detect(
            &mut self,
            _frame: &FrameBuffer,
        ) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
            self.calls += 1;
            if self.calls == 1 {
                panic!("tensor shape mismatch");
            }
            Ok(vec![BoundingBox::at(0.5, 0.5)])
        }
    }

    fn frame(w: u32) -> Arc<FrameBuffer> {
        Arc::new(FrameBuffer::new(vec![0; (w * 4 * 3) as usize], w, 4, 3))
    }

    #[test]
    fn test_outcome_carries_submission_token() {
        let worker = DetectionWorker::spawn(Box::new(StubDetector {
            boxes: vec![BoundingBox::at(0.5, 0.5)],
        }));
        let token = CaptureToken::first().next();
        worker.submit(token, frame(10));

        let outcome = worker.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(outcome.token, token);
        assert_eq!(outcome.result.unwrap().len(), 1);
    }

    #[test]
    fn test_outcomes_arrive_in_submission_order() {
        let worker = DetectionWorker::spawn(Box::new(WidthEcho));
        let a = CaptureToken::first();
        let b = a.next();
        worker.submit(a, frame(100));
        worker.submit(b, frame(200));

        let first = worker.recv_timeout(TIMEOUT).unwrap();
        let second = worker.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(first.token, a);
        assert_eq!(second.token, b);
        assert!((first.result.unwrap()[0].x_center - 0.1).abs() < 1e-9);
        assert!((second.result.unwrap()[0].x_center - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_detector_error_becomes_error_outcome() {
        let worker = DetectionWorker::spawn(Box::new(FailingDetector));
        worker.submit(CaptureToken::first(), frame(10));
        let outcome = worker.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(outcome.result.unwrap_err(), "inference failed");
    }

    #[test]
    fn test_detector_panic_becomes_error_outcome() {
        let worker = DetectionWorker::spawn(Box::new(PanickingDetector { calls: 0 }));
        let a = CaptureToken::first();
        worker.submit(a, frame(10));

        let outcome = worker.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(outcome.token, a);
        let err = outcome.result.unwrap_err();
        assert!(err.contains("tensor shape mismatch"), "{err}");

        // the thread survives and keeps serving requests
        worker.submit(a.next(), frame(10));
        let outcome = worker.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(outcome.token, a.next());
        assert_eq!(outcome.result.unwrap().len(), 1);
    }

    #[test]
    fn test_disabled_worker_answers_immediately() {
        let worker = DetectionWorker::disabled("model missing");
        assert!(!worker.is_enabled());
        worker.submit(CaptureToken::first(), frame(10));

        let outcome = worker.try_recv().unwrap();
        assert_eq!(outcome.token, CaptureToken::first());
        assert_eq!(outcome.result.unwrap_err(), "model missing");
    }

    #[test]
    fn test_try_recv_empty_when_nothing_submitted() {
        let worker = DetectionWorker::spawn(Box::new(StubDetector { boxes: vec![] }));
        assert!(worker.try_recv().is_none());
    }
}
