pub mod circular_compositor;
pub mod crop_resampler;
pub mod frame_asset_loader;
