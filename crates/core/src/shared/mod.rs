pub mod bounding_box;
pub mod capture_token;
pub mod constants;
pub mod frame;
