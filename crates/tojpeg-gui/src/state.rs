use chrono::{DateTime, Local};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use tojpeg_common::{Background, SourceFormat, Suffix};
use tojpeg_core::{
    BatchProgress, ConversionJob, ConversionOptions, ConversionResult, Outcome, QualitySettings,
    SourceItem,
};

use crate::config::AppConfig;

/// Most recent log lines kept on screen
pub const LOG_CAPACITY: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct LogLine {
    pub time: DateTime<Local>,
    pub level: LogLevel,
    pub text: String,
}

/// Ring buffer behind the log view
#[derive(Debug)]
pub struct LogBuffer {
    lines: VecDeque<LogLine>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity.min(256)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, level: LogLevel, text: impl Into<String>) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(LogLine {
            time: Local::now(),
            level,
            text: text.into(),
        });
    }

    pub fn lines(&self) -> impl Iterator<Item = &LogLine> {
        self.lines.iter()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(LOG_CAPACITY)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Pending,
    Processing,
    Converted,
    Skipped,
    Failed,
    Cancelled,
}

impl FileStatus {
    pub fn from_outcome(outcome: &Outcome) -> Self {
        match outcome {
            Outcome::Succeeded => Self::Converted,
            Outcome::Skipped { .. } => Self::Skipped,
            Outcome::Failed { .. } => Self::Failed,
            Outcome::Cancelled => Self::Cancelled,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "converting",
            Self::Converted => "converted",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// One row of the file list
#[derive(Debug, Clone)]
pub struct FileRow {
    pub path: PathBuf,
    /// Raw suffix text as typed; validated live, sanitized on Convert
    pub suffix: String,
    /// Force overwrite for this file even when the global switch is off
    pub overwrite: bool,
    pub selected: bool,
    pub status: FileStatus,
    pub output: Option<PathBuf>,
    pub message: Option<String>,
}

impl FileRow {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            suffix: String::new(),
            overwrite: false,
            selected: false,
            status: FileStatus::Pending,
            output: None,
            message: None,
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    pub fn parent_dir(&self) -> String {
        self.path
            .parent()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    }

    fn reset(&mut self) {
        self.status = FileStatus::Pending;
        self.output = None;
        self.message = None;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProcessingState {
    Idle,
    Running { progress: BatchProgress },
    Done { summary: String },
}

impl ProcessingState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }
}

/// Everything the window shows. Owned by the UI thread; the batch worker
/// only talks to it through progress events.
#[derive(Debug)]
pub struct AppState {
    pub files: Vec<FileRow>,
    pub output_dir: String,
    pub quality: QualitySettings,
    pub background: Background,
    pub overwrite_all: bool,
    pub workers: usize,
    pub default_suffix: String,
    pub processing: ProcessingState,
    pub log: LogBuffer,
}

impl AppState {
    pub fn from_config(config: &AppConfig) -> Self {
        let options = config.conversion_options();
        Self {
            files: Vec::new(),
            output_dir: config.output_dir.display().to_string(),
            quality: QualitySettings::from_quality(options.quality),
            background: options.background,
            overwrite_all: options.overwrite,
            workers: config.workers,
            default_suffix: options.suffix.to_string(),
            processing: ProcessingState::Idle,
            log: LogBuffer::default(),
        }
    }

    /// Copy the current settings back into `config`
    pub fn store_into(&self, config: &mut AppConfig) {
        config.output_dir = PathBuf::from(self.output_dir.trim());
        config.quality = self.quality.jpeg_quality().value();
        config.background = self.background.to_hex();
        config.overwrite = self.overwrite_all;
        config.workers = self.workers;
        config.suffix = self.default_suffix.clone();
    }

    pub fn is_running(&self) -> bool {
        self.processing.is_running()
    }

    /// Queue dropped or picked paths.
    ///
    /// Folders contribute their supported images (one level deep). Paths
    /// already queued are ignored. Files with an unknown extension are still
    /// queued and reported as skipped by the conversion itself. Returns how
    /// many rows were added.
    pub fn add_paths<I>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut added = 0;
        for path in paths {
            if path.is_dir() {
                let images = expand_dir(&path);
                if images.is_empty() {
                    self.log
                        .push(LogLevel::Warning, format!("No supported images in {}", path.display()));
                }
                for image in images {
                    added += usize::from(self.add_file(image));
                }
            } else {
                added += usize::from(self.add_file(path));
            }
        }

        if added > 0 {
            self.log.push(LogLevel::Info, format!("Added {} file(s)", added));
        }
        added
    }

    fn add_file(&mut self, path: PathBuf) -> bool {
        if self.files.iter().any(|f| f.path == path) {
            tracing::debug!("Ignoring duplicate {:?}", path);
            return false;
        }
        self.files.push(FileRow::new(path));
        true
    }

    pub fn remove_file(&mut self, index: usize) {
        if index < self.files.len() {
            self.files.remove(index);
        }
    }

    pub fn remove_selected(&mut self) -> usize {
        let before = self.files.len();
        self.files.retain(|f| !f.selected);
        before - self.files.len()
    }

    pub fn has_selection(&self) -> bool {
        self.files.iter().any(|f| f.selected)
    }

    pub fn clear_files(&mut self) {
        self.files.clear();
        self.processing = ProcessingState::Idle;
    }

    pub fn options(&self) -> ConversionOptions {
        ConversionOptions::default()
            .with_quality(self.quality.jpeg_quality())
            .with_background(self.background)
            .with_overwrite(self.overwrite_all)
            .with_suffix(Suffix::sanitize(&self.default_suffix))
    }

    /// Turn the file list into a job. Row `i` becomes item `i`.
    ///
    /// Invalid suffixes are sanitized in place and each correction is logged.
    pub fn build_job(&mut self) -> ConversionJob {
        self.fix_default_suffix();

        let mut corrections = Vec::new();
        for row in &mut self.files {
            if Suffix::validate(row.suffix.trim()).is_err() {
                let fixed = Suffix::sanitize(&row.suffix);
                corrections.push(format!(
                    "{}: suffix '{}' changed to '{}'",
                    row.file_name(),
                    row.suffix,
                    fixed
                ));
                row.suffix = fixed.to_string();
            }
        }
        for line in corrections {
            tracing::info!("{}", line);
            self.log.push(LogLevel::Warning, line);
        }

        let mut job = ConversionJob::new(PathBuf::from(self.output_dir.trim()), self.options());
        for row in &self.files {
            let mut item = SourceItem::new(&row.path);
            if !row.suffix.trim().is_empty() {
                item = item.with_suffix(Suffix::sanitize(&row.suffix));
            }
            if row.overwrite {
                item = item.with_overwrite(true);
            }
            job.push(item);
        }
        job
    }

    fn fix_default_suffix(&mut self) {
        if Suffix::validate(self.default_suffix.trim()).is_err() {
            let fixed = Suffix::sanitize(&self.default_suffix).to_string();
            let line = format!("Default suffix '{}' changed to '{}'", self.default_suffix, fixed);
            tracing::info!("{}", line);
            self.log.push(LogLevel::Warning, line);
            self.default_suffix = fixed;
        }
    }

    /// Reset row statuses for a new run
    pub fn begin_run(&mut self, total: usize) {
        for row in &mut self.files {
            row.reset();
        }
        self.processing = ProcessingState::Running {
            progress: BatchProgress {
                total,
                ..Default::default()
            },
        };
    }

    pub fn mark_started(&mut self, index: usize) {
        if let Some(row) = self.files.get_mut(index) {
            row.status = FileStatus::Processing;
        }
    }

    /// Apply one finished file to its row and the log
    pub fn apply_result(&mut self, result: &ConversionResult, progress: BatchProgress) {
        if let Some(row) = self.files.get_mut(result.index) {
            row.status = FileStatus::from_outcome(&result.outcome);
            row.output = result.destination.clone();
            row.message = result.outcome.reason().map(str::to_owned);
        }

        let name = result.file_name();
        let (level, text) = match (&result.outcome, &result.destination) {
            (Outcome::Succeeded, Some(dest)) => (LogLevel::Success, format!("{} -> {}", name, dest.display())),
            (Outcome::Succeeded, None) => (LogLevel::Success, format!("{} converted", name)),
            (Outcome::Skipped { reason }, _) => (LogLevel::Warning, format!("{} skipped: {}", name, reason)),
            (Outcome::Failed { reason }, _) => (LogLevel::Error, format!("{} failed: {}", name, reason)),
            (Outcome::Cancelled, _) => (LogLevel::Info, format!("{} cancelled", name)),
        };
        self.log.push(level, text);

        if self.is_running() {
            self.processing = ProcessingState::Running { progress };
        }
    }

    pub fn finish_run(&mut self, summary: String) {
        self.log.push(LogLevel::Info, format!("Done: {}", summary));
        self.processing = ProcessingState::Done { summary };
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Supported images directly inside `dir`, sorted by name
fn expand_dir(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Cannot read folder {:?}: {}", dir, e);
            return Vec::new();
        }
    };

    let mut images: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && SourceFormat::is_supported_path(path))
        .collect();
    images.sort();
    images
}
