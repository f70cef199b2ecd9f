use tojpeg_common::SourceFormat;

/// Image metadata extracted during decoding
#[derive(Debug, Clone)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    pub format: SourceFormat,
    pub color_type: image::ColorType,
    pub has_alpha: bool,
    /// More than one frame was present; only the first one is converted
    pub animated: bool,
    pub file_size: u64,
}

impl ImageMetadata {
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    pub fn estimated_memory_mb(&self) -> f32 {
        let bytes = self.pixel_count() * self.color_type.bytes_per_pixel() as usize;
        bytes as f32 / (1024.0 * 1024.0)
    }
}
