use crate::options::ConversionOptions;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tojpeg_common::{prepare_output_dir, Error, Result, Suffix};
use uuid::Uuid;

/// One input file plus its per-file overrides
#[derive(Debug, Clone, PartialEq)]
pub struct SourceItem {
    pub path: PathBuf,
    pub suffix: Option<Suffix>,
    pub overwrite: Option<bool>,
}

impl SourceItem {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            suffix: None,
            overwrite: None,
        }
    }

    pub fn with_suffix(mut self, suffix: Suffix) -> Self {
        self.suffix = Some(suffix);
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = Some(overwrite);
        self
    }
}

/// A batch of files to convert into one output directory.
///
/// Built when the user presses Convert and consumed by a single run.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub id: Uuid,
    pub items: Vec<SourceItem>,
    pub output_dir: PathBuf,
    pub options: ConversionOptions,
    pub created_at: DateTime<Local>,
}

impl ConversionJob {
    pub fn new(output_dir: impl Into<PathBuf>, options: ConversionOptions) -> Self {
        Self {
            id: Uuid::new_v4(),
            items: Vec::new(),
            output_dir: output_dir.into(),
            options,
            created_at: Local::now(),
        }
    }

    pub fn from_paths<I, P>(paths: I, output_dir: impl Into<PathBuf>, options: ConversionOptions) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut job = Self::new(output_dir, options);
        job.items = paths.into_iter().map(SourceItem::new).collect();
        job
    }

    pub fn push(&mut self, item: SourceItem) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Checks that must pass before any file is touched.
    /// Creates the output directory when missing.
    pub fn validate(&self) -> Result<PathBuf> {
        if self.is_empty() {
            return Err(Error::EmptyJob);
        }
        prepare_output_dir(&self.output_dir)
    }

    pub fn suffix_for<'a>(&'a self, item: &'a SourceItem) -> &'a Suffix {
        item.suffix.as_ref().unwrap_or(&self.options.suffix)
    }

    pub fn overwrite_for(&self, item: &SourceItem) -> bool {
        item.overwrite.unwrap_or(self.options.overwrite)
    }
}

/// What happened to one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    /// Not an image type we can read
    Skipped { reason: String },
    Failed { reason: String },
    /// The batch was cancelled before this file started
    Cancelled,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Succeeded => "converted",
            Self::Skipped { .. } => "skipped",
            Self::Failed { .. } => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Skipped { reason } | Self::Failed { reason } => Some(reason),
            Self::Succeeded | Self::Cancelled => None,
        }
    }
}

/// Per-file record appended to the log view
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionResult {
    /// Position of the file in its job
    pub index: usize,
    pub source: PathBuf,
    pub destination: Option<PathBuf>,
    pub outcome: Outcome,
    pub bytes_written: Option<u64>,
}

impl ConversionResult {
    pub fn succeeded(index: usize, source: &Path, destination: PathBuf, bytes_written: u64) -> Self {
        Self {
            index,
            source: source.to_path_buf(),
            destination: Some(destination),
            outcome: Outcome::Succeeded,
            bytes_written: Some(bytes_written),
        }
    }

    pub fn cancelled(index: usize, source: &Path) -> Self {
        Self {
            index,
            source: source.to_path_buf(),
            destination: None,
            outcome: Outcome::Cancelled,
            bytes_written: None,
        }
    }

    /// Unsupported inputs become `Skipped`, everything else `Failed`
    pub fn from_error(index: usize, source: &Path, err: &Error) -> Self {
        let reason = err.to_string();
        let outcome = if err.is_unsupported() {
            Outcome::Skipped { reason }
        } else if matches!(err, Error::Cancelled) {
            Outcome::Cancelled
        } else {
            Outcome::Failed { reason }
        };

        Self {
            index,
            source: source.to_path_buf(),
            destination: None,
            outcome,
            bytes_written: None,
        }
    }

    pub fn file_name(&self) -> String {
        display_name(&self.source)
    }
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Everything a run produced, in job order
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub job_id: Uuid,
    pub results: Vec<ConversionResult>,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.results.len()
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }

    pub fn succeeded(&self) -> usize {
        self.count(Outcome::is_success)
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed { .. }))
    }

    pub fn cancelled(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Cancelled))
    }

    pub fn all_succeeded(&self) -> bool {
        self.succeeded() == self.total()
    }

    /// Results that need the user's attention
    pub fn problems(&self) -> impl Iterator<Item = &ConversionResult> {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, Outcome::Skipped { .. } | Outcome::Failed { .. }))
    }

    pub fn summary(&self) -> String {
        format!(
            "{} converted, {} skipped, {} failed, {} cancelled ({:.1}s)",
            self.succeeded(),
            self.skipped(),
            self.failed(),
            self.cancelled(),
            self.elapsed.as_secs_f32()
        )
    }
}
