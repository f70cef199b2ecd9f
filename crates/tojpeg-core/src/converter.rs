use crate::job::{ConversionResult, SourceItem};
use crate::options::ConversionOptions;
use std::path::{Path, PathBuf};
use tojpeg_common::{OutputNamer, Result};
use tojpeg_formats::{flatten, ImageDecoder, JpegWriter};

/// Single-file conversion engine: decode, flatten alpha, encode JPEG
pub struct Converter {
    options: ConversionOptions,
}

impl Converter {
    pub fn new(options: ConversionOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    /// Pick the destination for `item`.
    ///
    /// Unreadable or unsupported inputs fail here, before they claim a name,
    /// so a skipped `a.txt` cannot push `a.png` to `a_1.jpg`.
    pub fn plan(&self, item: &SourceItem, namer: &OutputNamer) -> Result<PathBuf> {
        ImageDecoder::sniff(&item.path)?;

        let suffix = item.suffix.as_ref().unwrap_or(&self.options.suffix);
        let overwrite = self.overwrite_for(item);

        let mut dest = namer.allocate(&item.path, suffix, overwrite)?;
        if is_same_file(&dest, &item.path) {
            // re-encoding a JPEG in place would destroy the original
            dest = namer.allocate(&item.path, suffix, false)?;
        }
        Ok(dest)
    }

    /// Convert `source` into `dest`, returning the number of bytes written
    pub fn convert_to(&self, source: &Path, dest: &Path, overwrite: bool) -> Result<u64> {
        let (img, metadata) = ImageDecoder::decode(source)?;

        tracing::debug!(
            "Converting {}x{} {} → JPEG q{}",
            metadata.width,
            metadata.height,
            metadata.format,
            self.options.quality
        );

        let rgb = flatten(&img, self.options.background);
        drop(img);

        JpegWriter::write(&rgb, self.options.quality.value(), dest, overwrite)
    }

    /// Convert one planned item and describe the outcome
    pub fn convert_planned(&self, index: usize, item: &SourceItem, dest: PathBuf) -> ConversionResult {
        match self.convert_to(&item.path, &dest, self.overwrite_for(item)) {
            Ok(bytes) => {
                tracing::info!("Saved JPEG: {:?} -> {:?}", item.path, dest);
                ConversionResult::succeeded(index, &item.path, dest, bytes)
            }
            Err(e) => {
                tracing::warn!("Failed to convert {:?}: {}", item.path, e);
                ConversionResult::from_error(index, &item.path, &e)
            }
        }
    }

    /// Plan and convert in one step
    pub fn convert(&self, item: &SourceItem, namer: &OutputNamer) -> Result<PathBuf> {
        let dest = self.plan(item, namer)?;
        self.convert_to(&item.path, &dest, self.overwrite_for(item))?;
        tracing::info!("Saved JPEG: {:?}", dest);
        Ok(dest)
    }

    /// Convenience for a one-off file outside of a batch
    pub fn convert_file(&self, source: &Path, output_dir: &Path) -> Result<PathBuf> {
        let namer = OutputNamer::new(output_dir).protecting([source]);
        self.convert(&SourceItem::new(source), &namer)
    }

    fn overwrite_for(&self, item: &SourceItem) -> bool {
        item.overwrite.unwrap_or(self.options.overwrite)
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(ConversionOptions::default())
    }
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
