use egui::{ColorImage, TextureHandle, TextureOptions};
use image::{imageops, RgbaImage};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tojpeg_formats::{ImageDecoder, ImageMetadata};

pub const THUMB_WIDTH: u32 = 96;
pub const THUMB_HEIGHT: u32 = 64;

/// Finished thumbnail plus what we learned while decoding
pub struct Thumbnail {
    pub texture: TextureHandle,
    pub metadata: ImageMetadata,
    last_access: Instant,
}

pub enum ThumbnailState<'a> {
    Ready(&'a Thumbnail),
    Loading,
    Failed(&'a str),
}

struct LoadResponse {
    path: PathBuf,
    result: Result<(ColorImage, ImageMetadata), String>,
}

/// LRU cache of thumbnail textures fed by a background decode thread
pub struct ThumbnailCache {
    ready: HashMap<PathBuf, Thumbnail>,
    failed: HashMap<PathBuf, String>,
    pending: HashSet<PathBuf>,
    max_entries: usize,
    request_tx: Sender<PathBuf>,
    response_rx: Receiver<LoadResponse>,
    _worker: Option<JoinHandle<()>>,
}

impl ThumbnailCache {
    pub fn new(max_entries: usize) -> Self {
        let (request_tx, request_rx) = channel::<PathBuf>();
        let (response_tx, response_rx) = channel::<LoadResponse>();

        let worker = thread::Builder::new()
            .name("tojpeg-thumbnails".into())
            .spawn(move || worker_loop(request_rx, response_tx));

        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!("Thumbnail loader unavailable: {}", e);
                None
            }
        };

        Self {
            ready: HashMap::new(),
            failed: HashMap::new(),
            pending: HashSet::new(),
            max_entries: max_entries.max(1),
            request_tx,
            response_rx,
            _worker: worker,
        }
    }

    /// Look up `path`, queueing a decode on first sight
    pub fn get(&mut self, path: &Path) -> ThumbnailState<'_> {
        if self.failed.contains_key(path) {
            return ThumbnailState::Failed(self.failed[path].as_str());
        }

        if self.ready.contains_key(path) {
            if let Some(thumb) = self.ready.get_mut(path) {
                thumb.last_access = Instant::now();
            }
            return ThumbnailState::Ready(&self.ready[path]);
        }

        if self.pending.insert(path.to_path_buf()) && self.request_tx.send(path.to_path_buf()).is_err() {
            self.pending.remove(path);
            self.failed.insert(path.to_path_buf(), "preview unavailable".into());
        }
        ThumbnailState::Loading
    }

    /// Turn finished decodes into textures. Returns true when anything changed.
    pub fn poll(&mut self, ctx: &egui::Context) -> bool {
        let mut changed = false;
        while let Ok(response) = self.response_rx.try_recv() {
            changed |= self.accept(ctx, response);
        }
        changed
    }

    fn accept(&mut self, ctx: &egui::Context, response: LoadResponse) -> bool {
        // cleared while the worker was busy with it
        if !self.pending.remove(&response.path) {
            return false;
        }

        match response.result {
            Ok((image, metadata)) => {
                self.evict_if_needed();
                let name = format!("thumb:{}", response.path.display());
                let texture = ctx.load_texture(name, image, TextureOptions::LINEAR);
                self.ready.insert(
                    response.path,
                    Thumbnail {
                        texture,
                        metadata,
                        last_access: Instant::now(),
                    },
                );
            }
            Err(e) => {
                tracing::debug!("No preview for {:?}: {}", response.path, e);
                self.failed.insert(response.path, e);
            }
        }
        true
    }

    pub fn is_loading(&self) -> bool {
        !self.pending.is_empty()
    }

    fn evict_if_needed(&mut self) {
        if self.ready.len() < self.max_entries {
            return;
        }
        if let Some(oldest) = self
            .ready
            .iter()
            .min_by_key(|(_, t)| t.last_access)
            .map(|(path, _)| path.clone())
        {
            self.ready.remove(&oldest);
        }
    }

    /// Forget everything, including requests still queued on the worker
    pub fn clear(&mut self) {
        self.ready.clear();
        self.failed.clear();
        self.pending.clear();
    }
}

impl Default for ThumbnailCache {
    fn default() -> Self {
        Self::new(256)
    }
}

fn worker_loop(request_rx: Receiver<PathBuf>, response_tx: Sender<LoadResponse>) {
    while let Ok(path) = request_rx.recv() {
        let result = load_thumbnail(&path);
        if response_tx.send(LoadResponse { path, result }).is_err() {
            break;
        }
    }
}

fn load_thumbnail(path: &Path) -> Result<(ColorImage, ImageMetadata), String> {
    let (img, metadata) = ImageDecoder::decode(path).map_err(|e| e.to_string())?;
    let boxed = letterbox(&img.thumbnail(THUMB_WIDTH, THUMB_HEIGHT).to_rgba8(), THUMB_WIDTH, THUMB_HEIGHT);

    let size = [boxed.width() as usize, boxed.height() as usize];
    Ok((ColorImage::from_rgba_unmultiplied(size, boxed.as_raw()), metadata))
}

/// Center `img` on a transparent `width`×`height` canvas
pub fn letterbox(img: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    let mut canvas = RgbaImage::new(width, height);
    let x = (width.saturating_sub(img.width()) / 2) as i64;
    let y = (height.saturating_sub(img.height()) / 2) as i64;
    imageops::overlay(&mut canvas, img, x, y);
    canvas
}

/// Tooltip text for a decoded image
pub fn describe(metadata: &ImageMetadata) -> String {
    let mut text = format!(
        "{}×{} {}, {}",
        metadata.width,
        metadata.height,
        metadata.format,
        format_file_size(metadata.file_size)
    );
    if metadata.has_alpha {
        text.push_str(", transparent areas get the background color");
    }
    if metadata.animated {
        text.push_str(", animated: only the first frame is converted");
    }
    text
}

/// Format file size for display
pub fn format_file_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_letterbox_centers_wide_image() {
        let img = RgbaImage::from_pixel(96, 32, Rgba([255, 0, 0, 255]));
        let boxed = letterbox(&img, THUMB_WIDTH, THUMB_HEIGHT);

        assert_eq!(boxed.dimensions(), (96, 64));
        assert_eq!(boxed.get_pixel(48, 0)[3], 0);
        assert_eq!(*boxed.get_pixel(48, 32), Rgba([255, 0, 0, 255]));
        assert_eq!(boxed.get_pixel(48, 63)[3], 0);
    }

    #[test]
    fn test_thumbnail_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tall.png");
        RgbaImage::from_pixel(50, 200, Rgba([0, 0, 255, 128])).save(&path).unwrap();

        let (image, metadata) = load_thumbnail(&path).unwrap();
        assert_eq!(image.size, [96, 64]);
        assert!(metadata.has_alpha);
        assert_eq!((metadata.width, metadata.height), (50, 200));
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(2048), "2.00 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn test_clear_drops_late_responses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("late.png");
        RgbaImage::from_pixel(8, 8, Rgba([0, 255, 0, 255])).save(&path).unwrap();

        let ctx = egui::Context::default();
        let mut cache = ThumbnailCache::new(4);
        assert!(matches!(cache.get(&path), ThumbnailState::Loading));
        cache.clear();
        assert!(!cache.is_loading());

        let late = cache
            .response_rx
            .recv_timeout(std::time::Duration::from_secs(10))
            .unwrap();
        assert_eq!(late.path, path);
        assert!(!cache.accept(&ctx, late));
        assert!(cache.ready.is_empty());
        assert!(cache.failed.is_empty());
    }
}
