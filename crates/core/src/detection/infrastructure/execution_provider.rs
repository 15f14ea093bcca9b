use ort::execution_providers::ExecutionProviderDispatch;

/// Accelerated providers to register on the detector session for this
/// platform, in preference order. ort falls back to CPU when none of them
/// can be initialised, so an empty list means CPU only.
pub fn detector_execution_providers() -> Vec<ExecutionProviderDispatch> {
    let providers = platform_providers();
    log::debug!(
        "Face detector execution providers: {}",
        if providers.is_empty() {
            "cpu"
        } else {
            provider_label()
        }
    );
    providers
}

#[cfg(target_os = "macos")]
fn platform_providers() -> Vec<ExecutionProviderDispatch> {
    vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
}

#[cfg(target_os = "windows")]
fn platform_providers() -> Vec<ExecutionProviderDispatch> {
    vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn platform_providers() -> Vec<ExecutionProviderDispatch> {
    Vec::new()
}

fn provider_label() -> &'static str {
    if cfg!(target_os = "macos") {
        "coreml, cpu"
    } else if cfg!(target_os = "windows") {
        "directml, cpu"
    } else {
        "cpu"
    }
}
