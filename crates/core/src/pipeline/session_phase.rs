use std::fmt;

use crate::pipeline::session_error::SessionError;

/// Coarse lifecycle of a photo session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionPhase {
    #[default]
    Live,
    Processing,
    Ready,
}

/// Inputs that drive [`SessionPhase`] transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionEvent {
    Capture,
    PipelineComplete,
    PipelineFailed,
    Retake,
    Download,
}

impl SessionPhase {
    /// Transition table. Anything not listed is rejected and the caller keeps
    /// its current phase.
    ///
    /// | from       | event            | to         |
    /// |------------|------------------|------------|
    /// | Live       | Capture          | Processing |
    /// | Processing | PipelineComplete | Ready      |
    /// | Processing | PipelineFailed   | Live       |
    /// | Ready      | Retake           | Live       |
    /// | Ready      | Download         | Ready      |
    pub fn on(self, event: SessionEvent) -> Result<SessionPhase, SessionError> {
        use SessionEvent::*;
        use SessionPhase::*;

        match (self, event) {
            (Live, Capture) => Ok(Processing),
            (Processing, PipelineComplete) => Ok(Ready),
            (Processing, PipelineFailed) => Ok(Live),
            (Ready, Retake) => Ok(Live),
            (Ready, Download) => Ok(Ready),
            (phase, event) => Err(SessionError::InvalidTransition { phase, event }),
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Live => "live",
            SessionPhase::Processing => "processing",
            SessionPhase::Ready => "ready",
        };
        f.write_str(name)
    }
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionEvent::Capture => "capture",
            SessionEvent::PipelineComplete => "pipeline complete",
            SessionEvent::PipelineFailed => "pipeline failed",
            SessionEvent::Retake => "retake",
            SessionEvent::Download => "download",
        };
        f.write_str(name)
    }
}
