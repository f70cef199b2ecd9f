use crate::converter::Converter;
use crate::job::{display_name, BatchReport, ConversionJob, ConversionResult, Outcome, SourceItem};
use parking_lot::Mutex;
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tojpeg_common::{Error, OutputNamer, Result};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Upper bound on worker threads for one batch
pub const MAX_WORKERS: usize = 16;

/// Cooperative cancellation flag, checked before each file starts
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress tracking for batch operations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: usize,
    pub current_file: Option<PathBuf>,
}

impl BatchProgress {
    fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    fn record(&mut self, result: &ConversionResult) {
        self.completed += 1;
        self.current_file = Some(result.source.clone());
        match result.outcome {
            Outcome::Succeeded => self.succeeded += 1,
            Outcome::Failed { .. } => self.failed += 1,
            Outcome::Skipped { .. } => self.skipped += 1,
            Outcome::Cancelled => self.cancelled += 1,
        }
    }

    pub fn percentage(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        (self.completed as f32 / self.total as f32) * 100.0
    }

    pub fn fraction(&self) -> f32 {
        self.percentage() / 100.0
    }

    pub fn is_complete(&self) -> bool {
        self.completed == self.total
    }
}

/// Messages from the worker side to whoever renders progress
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Started { job_id: Uuid, total: usize },
    FileStarted { index: usize, source: PathBuf },
    FileFinished { result: ConversionResult, progress: BatchProgress },
    Finished { report: BatchReport },
}

pub type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;

enum Plan {
    Ready(PathBuf),
    Done(ConversionResult),
}

/// Runs a [`ConversionJob`] on a bounded rayon pool, reporting every file
pub struct BatchProcessor {
    /// Maximum concurrent conversions
    concurrency: usize,
}

impl BatchProcessor {
    pub fn new(concurrency: usize) -> Self {
        let concurrency = if concurrency == 0 {
            num_cpus::get()
        } else {
            concurrency
        }
        .clamp(1, MAX_WORKERS);

        tracing::debug!("BatchProcessor initialized with concurrency={}", concurrency);
        Self { concurrency }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Convert every item of `job`. Blocks until the batch is done.
    ///
    /// Always yields one result per item, in job order: per-file errors are
    /// recorded and the batch continues; items not started before `cancel`
    /// fires come back as [`Outcome::Cancelled`]. A closed progress channel is
    /// ignored.
    pub fn run(&self, job: ConversionJob, progress_tx: &ProgressSender, cancel: &CancelToken) -> BatchReport {
        let started = Instant::now();
        let total = job.len();
        tracing::info!(
            "Starting batch {}: {} files -> {:?} (workers={})",
            job.id,
            total,
            job.output_dir,
            self.concurrency
        );
        let _ = progress_tx.send(ProgressEvent::Started { job_id: job.id, total });

        let converter = Converter::new(job.options.clone());
        let namer = OutputNamer::new(&job.output_dir)
            .protecting(job.items.iter().map(|item| item.path.as_path()));

        // Names are allocated up front in job order so reruns are deterministic
        let planned: Vec<(usize, SourceItem, Plan)> = job
            .items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let plan = match converter.plan(&item, &namer) {
                    Ok(dest) => Plan::Ready(dest),
                    Err(e) => {
                        tracing::warn!("Skipping {:?}: {}", item.path, e);
                        Plan::Done(ConversionResult::from_error(index, &item.path, &e))
                    }
                };
                (index, item, plan)
            })
            .collect();

        let progress = Mutex::new(BatchProgress::new(total));
        let finish = |result: ConversionResult| -> ConversionResult {
            let snapshot = {
                let mut p = progress.lock();
                p.record(&result);
                p.clone()
            };
            let _ = progress_tx.send(ProgressEvent::FileFinished {
                result: result.clone(),
                progress: snapshot,
            });
            result
        };

        let process = |(index, item, plan): (usize, SourceItem, Plan)| -> ConversionResult {
            match plan {
                Plan::Done(result) => finish(result),
                Plan::Ready(_) if cancel.is_cancelled() => {
                    finish(ConversionResult::cancelled(index, &item.path))
                }
                Plan::Ready(dest) => {
                    tracing::debug!("[{}/{}] {}", index + 1, total, display_name(&item.path));
                    let _ = progress_tx.send(ProgressEvent::FileStarted {
                        index,
                        source: item.path.clone(),
                    });
                    finish(converter.convert_planned(index, &item, dest))
                }
            }
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.concurrency)
            .thread_name(|i| format!("tojpeg-worker-{i}"))
            .build();

        let results: Vec<ConversionResult> = match pool {
            Ok(pool) => pool.install(|| planned.into_par_iter().map(process).collect()),
            Err(e) => {
                tracing::warn!("Worker pool unavailable ({}), converting sequentially", e);
                planned.into_iter().map(process).collect()
            }
        };

        let report = BatchReport {
            job_id: job.id,
            results,
            elapsed: started.elapsed(),
        };

        tracing::info!("Batch {} complete: {}", report.job_id, report.summary());
        let _ = progress_tx.send(ProgressEvent::Finished {
            report: report.clone(),
        });

        report
    }

    /// Run on tokio's blocking pool
    pub async fn run_async(
        &self,
        job: ConversionJob,
        progress_tx: ProgressSender,
        cancel: CancelToken,
    ) -> Result<BatchReport> {
        let processor = BatchProcessor {
            concurrency: self.concurrency,
        };

        tokio::task::spawn_blocking(move || processor.run(job, &progress_tx, &cancel))
            .await
            .map_err(|e| Error::ConversionError(format!("Task join error: {}", e)))
    }
}

impl Default for BatchProcessor {
    fn default() -> Self {
        Self::new(0) // Auto-detect CPU count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ConversionOptions;
    use image::DynamicImage;
    use tempfile::TempDir;

    fn make_job(dir: &TempDir, count: usize) -> ConversionJob {
        let paths: Vec<PathBuf> = (0..count)
            .map(|i| {
                let path = dir.path().join(format!("test{}.png", i));
                DynamicImage::new_rgb8(40, 30).save(&path).unwrap();
                path
            })
            .collect();
        let job = ConversionJob::from_paths(paths, dir.path().join("out"), ConversionOptions::default());
        job.validate().unwrap();
        job
    }

    #[test]
    fn test_batch_processing() {
        let temp_dir = TempDir::new().unwrap();
        let job = make_job(&temp_dir, 5);

        let (tx, _rx) = mpsc::unbounded_channel();
        let processor = BatchProcessor::new(2);
        let report = processor.run(job, &tx, &CancelToken::new());

        assert_eq!(report.total(), 5);
        assert_eq!(report.succeeded(), 5);
        for (i, result) in report.results.iter().enumerate() {
            assert_eq!(result.index, i);
            assert!(result.destination.as_ref().unwrap().exists());
        }
    }

    #[tokio::test]
    async fn test_progress_tracking() {
        let temp_dir = TempDir::new().unwrap();
        let job = make_job(&temp_dir, 3);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let processor = BatchProcessor::new(1);
        let report = processor.run_async(job, tx, CancelToken::new()).await.unwrap();
        assert!(report.all_succeeded());

        let mut finished_files = 0;
        let mut last_progress = None;
        let mut saw_finished = false;
        while let Some(event) = rx.recv().await {
            match event {
                ProgressEvent::FileFinished { progress, .. } => {
                    finished_files += 1;
                    last_progress = Some(progress);
                }
                ProgressEvent::Finished { report } => {
                    saw_finished = true;
                    assert_eq!(report.total(), 3);
                }
                _ => {}
            }
        }

        let last_progress = last_progress.unwrap();
        assert_eq!(finished_files, 3);
        assert_eq!(last_progress.completed, 3);
        assert!(last_progress.is_complete());
        assert!(saw_finished);
    }

    #[test]
    fn test_cancel_before_start() {
        let temp_dir = TempDir::new().unwrap();
        let job = make_job(&temp_dir, 4);

        let cancel = CancelToken::new();
        cancel.cancel();

        let (tx, _rx) = mpsc::unbounded_channel();
        let report = BatchProcessor::new(2).run(job, &tx, &cancel);

        assert_eq!(report.total(), 4);
        assert_eq!(report.cancelled(), 4);
        assert!(!temp_dir.path().join("out").join("test0.jpg").exists());
    }

    #[test]
    fn test_failures_do_not_abort() {
        let temp_dir = TempDir::new().unwrap();
        let mut job = make_job(&temp_dir, 2);

        let bad = temp_dir.path().join("broken.png");
        std::fs::write(&bad, b"not really a png").unwrap();
        job.items.insert(1, SourceItem::new(&bad));
        job.push(SourceItem::new(temp_dir.path().join("missing.webp")));

        let (tx, _rx) = mpsc::unbounded_channel();
        let report = BatchProcessor::new(3).run(job, &tx, &CancelToken::new());

        assert_eq!(report.total(), 4);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 2);
        assert!(matches!(report.results[1].outcome, Outcome::Failed { .. }));
    }

    #[test]
    fn test_concurrency_bounds() {
        assert_eq!(BatchProcessor::new(100).concurrency(), MAX_WORKERS);
        assert_eq!(BatchProcessor::new(3).concurrency(), 3);
        assert!(BatchProcessor::new(0).concurrency() >= 1);
    }

    #[test]
    fn test_closed_channel_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let job = make_job(&temp_dir, 2);

        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let report = BatchProcessor::new(1).run(job, &tx, &CancelToken::new());
        assert_eq!(report.succeeded(), 2);
    }
}
