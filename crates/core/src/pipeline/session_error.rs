use thiserror::Error;

use crate::compositing::domain::photo_compositor::CompositeError;
use crate::pipeline::session_phase::{SessionEvent, SessionPhase};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("cannot {event} while {phase}")]
    InvalidTransition {
        phase: SessionPhase,
        event: SessionEvent,
    },
    #[error("camera is unavailable")]
    CameraUnavailable,
    #[error("snapshot failed: {0}")]
    Snapshot(String),
    #[error("compositing failed: {0}")]
    Composite(#[from] CompositeError),
    #[error("export failed: {0}")]
    Export(String),
}
