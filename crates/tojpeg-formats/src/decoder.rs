use crate::metadata::ImageMetadata;
use image::{AnimationDecoder, DynamicImage, ImageReader};
use memmap2::Mmap;
use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::Path;
use tojpeg_common::{Error, Result, SourceFormat};

const TEN_MB_IN_BYTES: u64 = 10 * 1024 * 1024;

/// Image decoder with memory-mapped I/O for large inputs.
///
/// Multi-frame inputs (animated GIF/WebP) decode to their first frame.
pub struct ImageDecoder;

impl ImageDecoder {
    /// Determine the real format of `path`.
    ///
    /// Magic bytes win over the extension, so a PNG saved as `.jpg` still
    /// decodes; the extension is only consulted when the content is not
    /// recognised.
    pub fn sniff(path: &Path) -> Result<SourceFormat> {
        let reader = ImageReader::open(path)
            .map_err(|e| Error::from_io(e, path))?
            .with_guessed_format()
            .map_err(|e| Error::from_io(e, path))?;

        reader
            .format()
            .and_then(SourceFormat::from_image_format)
            .or_else(|| SourceFormat::from_path(path))
            .ok_or_else(|| {
                Error::UnsupportedFormat(
                    path.extension()
                        .and_then(|s| s.to_str())
                        .unwrap_or("unknown")
                        .to_string(),
                )
            })
    }

    /// Decode image from path using memory-mapped file for large images
    pub fn decode(path: &Path) -> Result<(DynamicImage, ImageMetadata)> {
        if !path.is_file() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }

        let format = Self::sniff(path)?;
        tracing::debug!("Decoding {format:?} from {path:?}");

        let file = File::open(path).map_err(|e| Error::from_io(e, path))?;
        let file_size = file.metadata()?.len();

        let img = if file_size > TEN_MB_IN_BYTES {
            tracing::debug!("Using memory-mapped I/O for large file");
            // SAFETY: the map is read-only and dropped before this function
            // returns; a concurrent truncation by another process surfaces as
            // a decode error, not undefined reads into our own memory.
            let mmap = unsafe { Mmap::map(&file)? };
            ImageReader::with_format(Cursor::new(&mmap[..]), format.to_image_format()).decode()?
        } else {
            ImageReader::with_format(BufReader::new(file), format.to_image_format()).decode()?
        };

        let animated = format.may_be_animated() && Self::has_extra_frames(path, format);
        if animated {
            tracing::info!("{path:?} is animated; converting the first frame only");
        }

        let img_metadata = ImageMetadata {
            width: img.width(),
            height: img.height(),
            format,
            color_type: img.color(),
            has_alpha: img.color().has_alpha(),
            animated,
            file_size,
        };

        tracing::debug!(
            "Decoded {}x{} {} image ({:.2}MB in memory)",
            img_metadata.width,
            img_metadata.height,
            img_metadata.format,
            img_metadata.estimated_memory_mb()
        );

        Ok((img, img_metadata))
    }

    /// Format and dimensions without decoding pixels
    pub fn probe(path: &Path) -> Result<(SourceFormat, u32, u32)> {
        let format = Self::sniff(path)?;
        let file = File::open(path).map_err(|e| Error::from_io(e, path))?;
        let (width, height) =
            ImageReader::with_format(BufReader::new(file), format.to_image_format())
                .into_dimensions()?;
        Ok((format, width, height))
    }

    fn has_extra_frames(path: &Path, format: SourceFormat) -> bool {
        let Ok(file) = File::open(path) else {
            return false;
        };
        let reader = BufReader::new(file);

        match format {
            SourceFormat::Gif => image::codecs::gif::GifDecoder::new(reader)
                .map(|decoder| decoder.into_frames().take(2).filter(|f| f.is_ok()).count() > 1)
                .unwrap_or(false),
            SourceFormat::Webp => image::codecs::webp::WebPDecoder::new(reader)
                .map(|decoder| decoder.has_animation())
                .unwrap_or(false),
            _ => false,
        }
    }
}
