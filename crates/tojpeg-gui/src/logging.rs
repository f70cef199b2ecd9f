use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_FILE_PREFIX: &str = "tojpeg";
const LOG_FILE_SUFFIX: &str = "log";
/// Daily files kept on disk; older ones are pruned on rollover
const MAX_LOG_FILES: usize = 5;

/// Folder holding `tojpeg.<date>.log`, inside the platform data directory
pub fn log_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "tojpeg").map(|dirs| dirs.data_local_dir().join("logs"))
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "tojpeg=debug"
    } else {
        "tojpeg=info"
    }
}

fn file_appender(dir: &Path) -> Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(MAX_LOG_FILES)
        .build(dir)
}

/// Keeps the background log writer alive; drop it last so buffered lines are flushed
pub struct LogGuard {
    dir: Option<PathBuf>,
    _worker: Option<WorkerGuard>,
}

impl LogGuard {
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }
}

/// Install the global subscriber: console plus a rotating log file.
///
/// `RUST_LOG` wins over `verbose`. The console layer is installed even when
/// the log folder cannot be created.
pub fn init(verbose: bool) -> LogGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let console = fmt::layer().with_target(false);

    let appender = log_dir().and_then(|dir| match file_appender(&dir) {
        Ok(appender) => Some((appender, dir)),
        Err(e) => {
            eprintln!("tojpeg: file logging disabled: {e}");
            None
        }
    });

    let (file_layer, guard) = match appender {
        Some((appender, dir)) => {
            let (writer, worker) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_target(true).with_writer(writer);
            (
                Some(layer),
                LogGuard {
                    dir: Some(dir),
                    _worker: Some(worker),
                },
            )
        }
        None => (
            None,
            LogGuard {
                dir: None,
                _worker: None,
            },
        ),
    };

    // A second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init();

    guard
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(false), "tojpeg=info");
        assert_eq!(default_directive(true), "tojpeg=debug");
    }

    #[test]
    fn test_log_dir_is_app_specific() {
        if let Some(dir) = log_dir() {
            assert_eq!(dir.file_name().unwrap(), "logs");
            assert!(dir.to_string_lossy().to_lowercase().contains("tojpeg"));
        }
    }

    #[test]
    fn test_rolling_file_naming() {
        let dir = tempfile::tempdir().unwrap();
        let mut appender = file_appender(dir.path()).unwrap();
        appender.write_all(b"hello\n").unwrap();
        appender.flush().unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with("tojpeg."), "{names:?}");
        assert!(names[0].ends_with(".log"), "{names:?}");
    }
}
