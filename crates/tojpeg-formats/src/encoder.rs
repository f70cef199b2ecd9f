use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder as _, RgbImage};
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tojpeg_common::{Error, Result};

const EIGHT_MB_IN_BYTES: usize = 8 * 1024 * 1024;
const PARTIAL_EXTENSION: &str = "jpg.part";

/// JPEG writer with atomic replacement of the destination
pub struct JpegWriter;

impl JpegWriter {
    /// Encode to an in-memory JPEG. `quality` is clamped into 1..=100.
    pub fn encode(img: &RgbImage, quality: u8) -> Result<Vec<u8>> {
        let quality = quality.clamp(1, 100);
        let mut buffer = Vec::with_capacity((img.width() * img.height()) as usize / 4);

        JpegEncoder::new_with_quality(&mut buffer, quality)
            .write_image(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgb8)
            .map_err(|e| Error::Encode(e.to_string()))?;

        Ok(buffer)
    }

    /// Encode and write to `dest`.
    ///
    /// Bytes go to a sibling `.jpg.part` file that is moved into place, so
    /// a failure never leaves a truncated JPEG behind. Without `overwrite`, an
    /// existing destination is reported as [`Error::AlreadyExists`], including
    /// one that appears while encoding.
    pub fn write(img: &RgbImage, quality: u8, dest: &Path, overwrite: bool) -> Result<u64> {
        let bytes = Self::encode(img, quality)?;

        if !overwrite && dest.exists() {
            return Err(Error::AlreadyExists(dest.to_path_buf()));
        }

        let partial = Self::partial_path(dest);
        if let Err(e) = Self::write_partial(&partial, &bytes) {
            let _ = fs::remove_file(&partial);
            return Err(e);
        }

        let placed = if overwrite {
            fs::rename(&partial, dest).map_err(|e| Error::from_io(e, dest))
        } else {
            Self::place_new(&partial, dest)
        };
        if let Err(e) = placed {
            let _ = fs::remove_file(&partial);
            return Err(e);
        }

        tracing::debug!("Wrote {} bytes to {:?}", bytes.len(), dest);
        Ok(bytes.len() as u64)
    }

    /// Move `partial` to `dest` only if `dest` does not exist yet
    fn place_new(partial: &Path, dest: &Path) -> Result<()> {
        match fs::hard_link(partial, dest) {
            Ok(()) => {
                if let Err(e) = fs::remove_file(partial) {
                    tracing::warn!("Could not remove {:?}: {}", partial, e);
                }
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(Error::AlreadyExists(dest.to_path_buf()))
            }
            Err(e) => {
                // no hard links on this filesystem (FAT, some network shares)
                tracing::debug!("Hard link to {:?} failed ({}), renaming instead", dest, e);
                if dest.exists() {
                    return Err(Error::AlreadyExists(dest.to_path_buf()));
                }
                fs::rename(partial, dest).map_err(|e| Error::from_io(e, dest))
            }
        }
    }

    fn partial_path(dest: &Path) -> PathBuf {
        dest.with_extension(PARTIAL_EXTENSION)
    }

    fn write_partial(path: &Path, bytes: &[u8]) -> Result<()> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| Error::from_io(e, path))?;

        let mut writer = BufWriter::with_capacity(EIGHT_MB_IN_BYTES.min(bytes.len().max(1)), file);
        writer.write_all(bytes)?;
        writer.flush()?;
        Ok(())
    }
}
