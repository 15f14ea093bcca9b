pub mod capture_pipeline;
pub mod photo_session;
pub mod pipeline_logger;
pub mod session_error;
pub mod session_phase;
