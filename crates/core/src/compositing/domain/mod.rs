pub mod cutout;
pub mod photo_compositor;
pub mod raster;
