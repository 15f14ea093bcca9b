//! Face-centred photo capture: snapshot a frame, find the face, crop a
//! square around it and composite the crop into a decorative frame through
//! a circular cutout.

pub mod capture;
pub mod compositing;
pub mod config;
pub mod cropping;
pub mod detection;
pub mod export;
pub mod pipeline;
pub mod shared;
