pub mod batch;
pub mod converter;
pub mod job;
pub mod options;

pub use batch::{BatchProcessor, BatchProgress, CancelToken, ProgressEvent, ProgressSender};
pub use converter::Converter;
pub use job::{BatchReport, ConversionJob, ConversionResult, Outcome, SourceItem};
pub use options::{ConversionOptions, Quality, QualitySettings};
pub use tojpeg_common::{Background, Error, Result, Suffix};
