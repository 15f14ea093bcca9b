pub mod image_exporter;
