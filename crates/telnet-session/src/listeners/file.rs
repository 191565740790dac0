use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::pipeline::{LineListener, ListenerAction, Origin, Severity};

/// Timestamp format of log file names.
const FILE_STAMP_FORMAT: &str = "%m%d%H%M%S";

/// Timestamp format of log records.
const RECORD_STAMP_FORMAT: &str = "%m-%d %H:%M:%S";

/// Build `<dir>/<host>-<MMDDhhmmss>_<filename>`.
#[must_use]
pub fn log_file_path(dir: &Path, host: &str, filename: &str, now: DateTime<Local>) -> PathBuf {
    dir.join(format!(
        "{host}-{}_{filename}",
        now.format(FILE_STAMP_FORMAT)
    ))
}

/// An append-only file that rotates by size.
///
/// Before a record is written, if it would bring the file to `max_bytes` or
/// beyond, `name.(n-1)` moves to `name.n`, ..., and `name` to `name.1`,
/// keeping at most `backups` old files. Rotation is disabled when either
/// limit is zero, and an empty file is never rotated.
#[derive(Debug)]
pub struct RotatingFile {
    path: PathBuf,
    file: File,
    size: u64,
    max_bytes: u64,
    backups: usize,
}

impl RotatingFile {
    /// Open `path` for appending, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn open(path: impl Into<PathBuf>, max_bytes: u64, backups: usize) -> io::Result<Self> {
        let path = path.into();
        let file = Self::open_append(&path)?;
        let size = file.metadata()?.len();
        Ok(Self {
            path,
            file,
            size,
            max_bytes,
            backups,
        })
    }

    fn open_append(path: &Path) -> io::Result<File> {
        OpenOptions::new().create(true).append(true).open(path)
    }

    /// Path of the active file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes in the active file.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Path of the `n`th backup.
    #[must_use]
    pub fn backup_path(&self, n: usize) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(format!(".{n}"));
        PathBuf::from(name)
    }

    /// Append `record` and a newline, rotating first if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if rotating or writing fails.
    pub fn write_record(&mut self, record: &str) -> io::Result<()> {
        let len = record.len() as u64 + 1;
        if self.should_rotate(len) {
            self.rotate()?;
        }
        self.file.write_all(record.as_bytes())?;
        self.file.write_all(b"\n")?;
        self.file.flush()?;
        self.size += len;
        Ok(())
    }

    const fn should_rotate(&self, incoming: u64) -> bool {
        self.max_bytes > 0
            && self.backups > 0
            && self.size > 0
            && self.size + incoming >= self.max_bytes
    }

    fn rotate(&mut self) -> io::Result<()> {
        for n in (1..self.backups).rev() {
            let from = self.backup_path(n);
            if from.exists() {
                fs::rename(&from, self.backup_path(n + 1))?;
            }
        }
        fs::rename(&self.path, self.backup_path(1))?;

        self.file = Self::open_append(&self.path)?;
        self.size = 0;
        tracing::debug!(path = %self.path.display(), "log file rotated");
        Ok(())
    }
}

/// Writes `[MM-DD hh:mm:ss] <line>` records for lines at or above a severity.
#[derive(Debug)]
pub struct FileListener {
    file: RotatingFile,
    min_severity: Severity,
}

impl FileListener {
    /// Log to an already opened rotating file.
    #[must_use]
    pub const fn new(file: RotatingFile) -> Self {
        Self {
            file,
            min_severity: Severity::Info,
        }
    }

    /// Open `<dir>/<host>-<now>_<filename>` and log to it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn create(
        dir: &Path,
        host: &str,
        filename: &str,
        max_bytes: u64,
        backups: usize,
    ) -> io::Result<Self> {
        let path = log_file_path(dir, host, filename, Local::now());
        tracing::info!(path = %path.display(), "logging session to file");
        Ok(Self::new(RotatingFile::open(path, max_bytes, backups)?))
    }

    /// Path of the active log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

impl LineListener for FileListener {
    fn on_line(&mut self, line: &str, _origin: Origin, severity: Severity) -> ListenerAction {
        if severity >= self.min_severity {
            let record = format!("[{}] {line}", Local::now().format(RECORD_STAMP_FORMAT));
            if let Err(e) = self.file.write_record(&record) {
                tracing::warn!(path = %self.file.path().display(), error = %e, "log write failed");
            }
        }
        ListenerAction::Continue
    }
}
