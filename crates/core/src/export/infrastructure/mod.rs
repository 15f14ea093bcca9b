pub mod png_file_exporter;
