pub mod frame_settings;
