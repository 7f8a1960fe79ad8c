use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
    str::FromStr,
    sync::{Mutex, MutexGuard, PoisonError},
    time::UNIX_EPOCH,
};

use chrono::{DateTime, Local};

use super::{
    error::{ArchiveError, LogError},
    remote::RemoteSink,
    LogSink,
};
use crate::utils::session_stamp;

/// The file currently receiving appends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFileHandle {
    pub path: PathBuf,
    pub open_since: DateTime<Local>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSelector {
    Current,
    MostRecent,
    All,
}

impl FromStr for LogSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "current" => Ok(Self::Current),
            "last" | "most-recent" | "latest" => Ok(Self::MostRecent),
            "all" => Ok(Self::All),
            other => Err(format!(
                "unknown selector `{}`, expected one of current, last, all",
                other
            )),
        }
    }
}

struct ActiveFile {
    handle: LogFileHandle,
    /// `None` once the sink was closed.
    file: Option<File>,
}

/// Append-only log file writer. Owns exactly one active file at a time; the
/// mutex serializes appends, rotation and the active-path check done by
/// archival.
pub struct FileSink {
    dir: PathBuf,
    active: Mutex<ActiveFile>,
}

impl FileSink {
    /// Opens `initial` or, when absent, a new session file inside `dir`.
    pub fn open(dir: impl Into<PathBuf>, initial: Option<PathBuf>) -> Result<Self, LogError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| LogError::io(&dir, source))?;

        let now = Local::now();
        let path = initial.unwrap_or_else(|| dir.join(format!("{}.log", session_stamp(now))));
        let file = open_append(&path)?;

        Ok(Self {
            dir,
            active: Mutex::new(ActiveFile {
                handle: LogFileHandle {
                    path,
                    open_since: now,
                },
                file: Some(file),
            }),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn current(&self) -> LogFileHandle {
        self.lock().handle.clone()
    }

    /// Writes one record and flushes it before returning.
    pub fn append(&self, text: &str) -> Result<(), LogError> {
        let mut active = self.lock();
        write_record(&mut active, text)
    }

    /// Switches appends to a fresh session file. The previous file stays on
    /// disk and becomes eligible for archival.
    pub fn rotate(&self) -> Result<LogFileHandle, LogError> {
        let mut active = self.lock();
        self.rotate_locked(&mut active)
    }

    /// Rotates and writes `first` into the new file before any other append
    /// can get in.
    pub fn rotate_with(&self, first: &str) -> Result<LogFileHandle, LogError> {
        let mut active = self.lock();
        let handle = self.rotate_locked(&mut active)?;
        write_record(&mut active, first)?;

        Ok(handle)
    }

    /// Releases the active file. Later appends and rotations fail with
    /// [`LogError::Closed`].
    pub fn close(&self) {
        let mut active = self.lock();
        if active.file.take().is_some() {
            tracing::debug!(target: "relaylog", "closed log file {}", active.handle.path.display());
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lock().file.is_none()
    }

    fn rotate_locked(&self, active: &mut ActiveFile) -> Result<LogFileHandle, LogError> {
        if active.file.is_none() {
            return Err(LogError::Closed(active.handle.path.clone()));
        }

        let now = Local::now();
        let path = next_session_path(&self.dir, &active.handle.path, now);
        let file = open_append(&path)?;

        let handle = LogFileHandle {
            path,
            open_since: now,
        };
        let previous = std::mem::replace(
            active,
            ActiveFile {
                handle: handle.clone(),
                file: Some(file),
            },
        );

        tracing::debug!(
            target: "relaylog",
            "rotated log file {} -> {}",
            previous.handle.path.display(),
            handle.path.display()
        );

        Ok(handle)
    }

    pub fn is_active(&self, path: &Path) -> bool {
        let active = self.lock();
        active.file.is_some() && same_file(&active.handle.path, path)
    }

    /// Uploads an inactive log file through `remote` and deletes the local
    /// copy once the upload went through.
    pub async fn archive(&self, path: &Path, remote: &RemoteSink) -> Result<(), ArchiveError> {
        if self.is_active(path) {
            return Err(ArchiveError::ActiveFileProtected(path.to_path_buf()));
        }

        if !path.is_file() {
            return Err(ArchiveError::Io {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such log file"),
            });
        }

        remote
            .upload(path)
            .await
            .map_err(|source| ArchiveError::Relocation {
                path: path.to_path_buf(),
                source,
            })?;

        fs::remove_file(path).map_err(|source| ArchiveError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::info!(target: "relaylog", "archived {}", path.display());
        Ok(())
    }

    pub fn retrieve(&self, selector: LogSelector) -> Result<Vec<PathBuf>, LogError> {
        match selector {
            LogSelector::Current => Ok(vec![self.current().path]),
            LogSelector::MostRecent => Ok(self.scan()?.pop().into_iter().collect()),
            LogSelector::All => self.scan(),
        }
    }

    fn scan(&self) -> Result<Vec<PathBuf>, LogError> {
        scan_log_files(&self.dir).map_err(|source| LogError::Scan {
            path: self.dir.clone(),
            source,
        })
    }

    fn lock(&self) -> MutexGuard<'_, ActiveFile> {
        // A panic mid-write leaves the handle itself usable.
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// All `*.log` files in `dir`, oldest modification first.
pub fn scan_log_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let Ok(entry) = entry else { continue };
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("log") {
            continue;
        }

        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }

        let modified = metadata.modified().unwrap_or(UNIX_EPOCH);
        files.push((modified, path));
    }

    files.sort();
    Ok(files.into_iter().map(|(_, path)| path).collect())
}

/// Most recently modified log file in `dir`, if the directory exists.
pub fn latest_log_file(dir: &Path) -> io::Result<Option<PathBuf>> {
    if !dir.is_dir() {
        return Ok(None);
    }

    Ok(scan_log_files(dir)?.pop())
}

fn write_record(active: &mut ActiveFile, text: &str) -> Result<(), LogError> {
    let mut record = String::with_capacity(text.len() + 1);
    record.push_str(text);
    if !record.ends_with('\n') {
        record.push('\n');
    }

    let ActiveFile { handle, file } = active;
    let Some(file) = file.as_mut() else {
        return Err(LogError::Closed(handle.path.clone()));
    };

    file.write_all(record.as_bytes())
        .and_then(|_| file.flush())
        .map_err(|source| LogError::io(&handle.path, source))
}

fn open_append(path: &Path) -> Result<File, LogError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| LogError::io(parent, source))?;
    }

    fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LogError::io(path, source))
}

fn next_session_path(dir: &Path, previous: &Path, now: DateTime<Local>) -> PathBuf {
    let stamp = session_stamp(now);
    let mut path = dir.join(format!("{}.log", stamp));

    let mut counter = 1;
    while path.exists() || same_file(&path, previous) {
        path = dir.join(format!("{}-{}.log", stamp, counter));
        counter += 1;
    }

    path
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Best-effort stdout writer.
pub struct ConsoleSink {
    handle: io::Stdout,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self {
            handle: io::stdout(),
        }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for ConsoleSink {
    fn write_log(&self, text: &str) -> io::Result<()> {
        let mut writer = self.handle.lock();

        if let Err(err) = writeln!(writer, "{}", text).and_then(|_| writer.flush()) {
            tracing::trace!(target: "relaylog", "dropping console output: {}", err);
        }

        Ok(())
    }

    fn flush(&self) {
        let _ = self.handle.lock().flush();
    }
}

pub struct NullSink {}

impl NullSink {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for NullSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for NullSink {
    fn write_log(&self, _text: &str) -> io::Result<()> {
        Ok(())
    }

    fn flush(&self) {}
}
