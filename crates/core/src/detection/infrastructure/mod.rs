pub mod detection_worker;
pub mod execution_provider;
pub mod model_resolver;
pub mod onnx_blazeface_detector;
