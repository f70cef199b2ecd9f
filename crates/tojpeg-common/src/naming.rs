use crate::{Error, Result};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

const OUTPUT_EXTENSION: &str = "jpg";
const WRITE_PROBE_NAME: &str = ".tojpeg-write-test";

/// Why a suffix was rejected
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SuffixProblem {
    #[error("too long (max {max} characters)")]
    TooLong { max: usize },

    #[error("'{0}' is not allowed (use letters, digits, '-', '_' or '.')")]
    InvalidChar(char),
}

/// File-name suffix appended to the output stem, e.g. `photo_v2.jpg`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Suffix(String);

impl Suffix {
    pub const MAX_LEN: usize = 32;

    fn is_allowed(c: char) -> bool {
        c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')
    }

    /// Check raw user input without modifying it
    pub fn validate(raw: &str) -> std::result::Result<(), SuffixProblem> {
        if let Some(bad) = raw.chars().find(|c| !Self::is_allowed(*c)) {
            return Err(SuffixProblem::InvalidChar(bad));
        }
        if raw.chars().count() > Self::MAX_LEN {
            return Err(SuffixProblem::TooLong { max: Self::MAX_LEN });
        }
        Ok(())
    }

    /// Strict constructor
    pub fn parse(raw: &str) -> std::result::Result<Self, SuffixProblem> {
        let trimmed = raw.trim();
        Self::validate(trimmed)?;
        Ok(Self(trimmed.to_string()))
    }

    /// Drop disallowed characters and truncate to `MAX_LEN`
    pub fn sanitize(raw: &str) -> Self {
        let cleaned: String = raw
            .trim()
            .chars()
            .filter(|c| Self::is_allowed(*c))
            .take(Self::MAX_LEN)
            .collect();
        Self(cleaned)
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for Suffix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hands out destination paths for one batch.
///
/// Names are `{stem}{suffix}.jpg`; on a clash the namer appends `_1`, `_2`, ...
/// A name handed out once is never handed out again by the same namer, so two
/// inputs sharing a stem (`a.png`, `a.webp`) cannot overwrite each other even
/// when overwriting is enabled. Claimed names are compared case-insensitively
/// because the primary target filesystem (NTFS) is case-insensitive.
///
/// Inputs of the batch that already live in the output folder are never
/// handed out as destinations, even with overwriting enabled.
pub struct OutputNamer {
    output_dir: PathBuf,
    claimed: Mutex<HashSet<String>>,
    protected: HashSet<String>,
}

impl OutputNamer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            claimed: Mutex::new(HashSet::new()),
            protected: HashSet::new(),
        }
    }

    /// Keep every source that sits directly in the output folder off-limits
    pub fn protecting<'a, I>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = &'a Path>,
    {
        let output_dir = canonical_or_raw(&self.output_dir);
        for source in sources {
            let (Some(parent), Some(name)) = (source.parent(), source.file_name()) else {
                continue;
            };
            let parent = if parent.as_os_str().is_empty() { Path::new(".") } else { parent };
            if canonical_or_raw(parent) == output_dir {
                tracing::debug!("Protecting input {:?} from being overwritten", source);
                self.protected.insert(name_key(name));
            }
        }
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Reserve a destination for `source`.
    ///
    /// With `overwrite` a file left by an earlier run is reused, so running
    /// the same job twice writes the same paths.
    pub fn allocate(&self, source: &Path, suffix: &Suffix, overwrite: bool) -> Result<PathBuf> {
        let stem = source
            .file_stem()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::InvalidPath(source.to_path_buf()))?;

        let mut base = OsString::from(stem);
        base.push(suffix.as_str());

        let mut claimed = self.claimed.lock();
        let mut attempt = 0usize;

        loop {
            let mut name = base.clone();
            if attempt > 0 {
                name.push(format!("_{attempt}"));
            }
            name.push(".");
            name.push(OUTPUT_EXTENSION);

            let candidate = self.output_dir.join(&name);
            let key = name_key(&name);

            let taken = claimed.contains(&key)
                || self.protected.contains(&key)
                || (!overwrite && candidate.exists());
            if !taken {
                tracing::debug!("Allocated output {:?} for {:?}", candidate, source);
                claimed.insert(key);
                return Ok(candidate);
            }

            attempt += 1;
        }
    }

    /// Number of names handed out so far
    pub fn claimed_count(&self) -> usize {
        self.claimed.lock().len()
    }
}

fn name_key(name: &std::ffi::OsStr) -> String {
    name.to_string_lossy().to_lowercase()
}

fn canonical_or_raw(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Make sure `dir` exists and accepts new files.
///
/// Called once before a batch starts; any error here is fatal for the batch.
pub fn prepare_output_dir(dir: &Path) -> Result<PathBuf> {
    let fail = |reason: String| Error::OutputDir {
        path: dir.to_path_buf(),
        reason,
    };

    if dir.as_os_str().is_empty() {
        return Err(fail("no output folder selected".into()));
    }

    if dir.exists() && !dir.is_dir() {
        return Err(fail("path exists and is not a folder".into()));
    }

    fs::create_dir_all(dir).map_err(|e| fail(format!("cannot create folder: {e}")))?;

    let probe = dir.join(WRITE_PROBE_NAME);
    fs::write(&probe, b"").map_err(|e| fail(format!("folder is not writable: {e}")))?;
    if let Err(e) = fs::remove_file(&probe) {
        tracing::warn!("Could not remove write probe {:?}: {}", probe, e);
    }

    Ok(dir.to_path_buf())
}

/// Default output directory: `~/Pictures/tojpeg`, falling back to home, then `./output`
pub fn default_output_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| {
            dirs.picture_dir()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| dirs.home_dir().to_path_buf())
                .join("tojpeg")
        })
        .unwrap_or_else(|| PathBuf::from("./output"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_suffix_validation() {
        assert!(Suffix::validate("_v2").is_ok());
        assert!(Suffix::validate("").is_ok());
        assert_eq!(
            Suffix::validate("a b"),
            Err(SuffixProblem::InvalidChar(' '))
        );
        assert_eq!(
            Suffix::validate(&"x".repeat(33)),
            Err(SuffixProblem::TooLong { max: 32 })
        );
    }

    #[test]
    fn test_suffix_sanitize() {
        assert_eq!(Suffix::sanitize(" _v2/../é ").as_str(), "_v2..");
        assert_eq!(Suffix::sanitize(&"ab".repeat(40)).as_str().len(), Suffix::MAX_LEN);
    }

    #[test]
    fn test_same_stem_gets_distinct_names() {
        let dir = TempDir::new().unwrap();
        let namer = OutputNamer::new(dir.path());

        let a = namer.allocate(Path::new("/in/a.png"), &Suffix::none(), true).unwrap();
        let b = namer.allocate(Path::new("/other/a.webp"), &Suffix::none(), true).unwrap();
        let c = namer.allocate(Path::new("/third/A.gif"), &Suffix::none(), true).unwrap();

        assert_eq!(a, dir.path().join("a.jpg"));
        assert_eq!(b, dir.path().join("a_1.jpg"));
        assert_eq!(c, dir.path().join("A_2.jpg"));
        assert_eq!(namer.claimed_count(), 3);
    }

    #[test]
    fn test_existing_file_respects_overwrite() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("photo.jpg"), b"old").unwrap();

        let keep = OutputNamer::new(dir.path());
        let path = keep.allocate(Path::new("photo.png"), &Suffix::none(), false).unwrap();
        assert_eq!(path, dir.path().join("photo_1.jpg"));

        let replace = OutputNamer::new(dir.path());
        let path = replace.allocate(Path::new("photo.png"), &Suffix::none(), true).unwrap();
        assert_eq!(path, dir.path().join("photo.jpg"));
    }

    #[test]
    fn test_inputs_in_output_dir_are_never_destinations() {
        let dir = TempDir::new().unwrap();
        let inside = dir.path().join("X.JPG");
        fs::write(&inside, b"original").unwrap();

        let namer = OutputNamer::new(dir.path()).protecting([inside.as_path()]);
        let png = namer.allocate(Path::new("/elsewhere/x.png"), &Suffix::none(), true).unwrap();
        let jpg = namer.allocate(&inside, &Suffix::none(), true).unwrap();

        assert_eq!(png, dir.path().join("x_1.jpg"));
        assert_eq!(jpg, dir.path().join("X_2.jpg"));
    }

    #[test]
    fn test_inputs_elsewhere_are_not_protected() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();
        let outside = dir.path().join("x.jpg");

        let namer = OutputNamer::new(&out).protecting([outside.as_path()]);
        let path = namer.allocate(&outside, &Suffix::none(), true).unwrap();
        assert_eq!(path, out.join("x.jpg"));
    }

    #[test]
    fn test_suffix_applied() {
        let dir = TempDir::new().unwrap();
        let namer = OutputNamer::new(dir.path());
        let suffix = Suffix::parse("_web").unwrap();

        let path = namer.allocate(Path::new("cat.png"), &suffix, false).unwrap();
        assert_eq!(path, dir.path().join("cat_web.jpg"));
    }

    #[test]
    fn test_prepare_output_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        assert_eq!(prepare_output_dir(&nested).unwrap(), nested);
        assert!(nested.is_dir());
        assert!(!nested.join(WRITE_PROBE_NAME).exists());

        let file = dir.path().join("plain.txt");
        fs::write(&file, b"x").unwrap();
        assert!(matches!(prepare_output_dir(&file), Err(Error::OutputDir { .. })));
        assert!(prepare_output_dir(Path::new("")).is_err());
    }
}
