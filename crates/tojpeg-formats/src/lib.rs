pub mod decoder;
pub mod encoder;
pub mod flatten;
pub mod metadata;

pub use decoder::ImageDecoder;
pub use encoder::JpegWriter;
pub use flatten::flatten;
pub use metadata::ImageMetadata;
