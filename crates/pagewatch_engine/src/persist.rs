use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use engine_logging::{engine_debug, engine_info};
use pagewatch_core::PersistedSnapshot;
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("snapshot {path:?} is corrupt: {message}")]
    Corrupt { path: PathBuf, message: String },
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    Ok(())
}

/// Atomically write content to `{dir}/{filename}` by writing a temp file then renaming.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        // The rename replaces any existing target in one step.
        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}

/// The JSON snapshot on disk plus its `.bak` sibling.
///
/// Every save first copies the current file to the backup and then replaces
/// the current file atomically, so an interrupted save leaves at least one
/// intact copy. Saves are serialized through an internal lock.
#[derive(Debug)]
pub struct SnapshotFile {
    path: PathBuf,
    backup_path: PathBuf,
    write_lock: Mutex<()>,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let backup_path = backup_path_for(&path);
        Self {
            path,
            backup_path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    /// Missing or blank file → empty snapshot. A non-blank file that does not
    /// parse → [`PersistError::Corrupt`].
    pub fn load(&self) -> Result<PersistedSnapshot, PersistError> {
        read_snapshot(&self.path)
    }

    /// Like [`SnapshotFile::load`], but tells a missing or blank file apart
    /// from an empty snapshot by returning `None`.
    pub fn load_existing(&self) -> Result<Option<PersistedSnapshot>, PersistError> {
        parse_snapshot_file(&self.path)
    }

    /// Same rules as [`SnapshotFile::load`], applied to the backup copy.
    pub fn load_backup(&self) -> Result<PersistedSnapshot, PersistError> {
        read_snapshot(&self.backup_path)
    }

    pub fn save(&self, snapshot: &PersistedSnapshot) -> Result<(), PersistError> {
        let content = serde_json::to_string_pretty(snapshot)?;
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        if self.path.is_file() {
            fs::copy(&self.path, &self.backup_path)?;
        }

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let filename = self
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| PersistError::OutputDir(format!("bad snapshot path {:?}", self.path)))?;
        AtomicFileWriter::new(dir).write(filename, &content)?;

        engine_debug!(
            "Saved snapshot to {:?} ({} subscribers, {} resources)",
            self.path,
            snapshot.subscribers.len(),
            snapshot.resources.len()
        );
        Ok(())
    }
}

fn backup_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("snapshot"));
    name.push(".bak");
    path.with_file_name(name)
}

fn read_snapshot(path: &Path) -> Result<PersistedSnapshot, PersistError> {
    match parse_snapshot_file(path)? {
        Some(snapshot) => Ok(snapshot),
        None => {
            engine_info!("No snapshot data at {:?}, starting empty", path);
            Ok(PersistedSnapshot::default())
        }
    }
}

/// `None` for a missing or whitespace-only file.
fn parse_snapshot_file(path: &Path) -> Result<Option<PersistedSnapshot>, PersistError> {
    let corrupt = |message: String| PersistError::Corrupt {
        path: path.to_path_buf(),
        message,
    };

    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) if err.kind() == io::ErrorKind::InvalidData => {
            return Err(corrupt(err.to_string()))
        }
        Err(err) => return Err(PersistError::Io(err)),
    };

    if content.trim().is_empty() {
        return Ok(None);
    }

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|err| corrupt(err.to_string()))
}
