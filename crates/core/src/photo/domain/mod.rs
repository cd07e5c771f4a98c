pub mod image_writer;
pub mod photo_reader;
