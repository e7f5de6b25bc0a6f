//! On-disk representation of the history
//!
//! The file is always replaced atomically: the new contents go to a sibling
//! temporary file which is synced and then renamed over the target, so readers
//! see either the previous or the next version, never a partial one.

mod lock;

pub use lock::FileLock;

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::{ClipstashError, Result};
use crate::history::Entry;

/// Current file format version
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct PersistedHistory<'a> {
    version: u32,
    entries: &'a [Entry],
}

/// Every layout we know how to read; `version` and unknown keys are ignored
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredHistory {
    Versioned { entries: Vec<Entry> },
    /// Bare array of `{content, timestamp, preview}` records from unversioned files
    Legacy(Vec<Entry>),
}

/// Result of reading the history file
#[derive(Debug)]
pub enum LoadedHistory {
    /// No file yet
    Missing,
    /// Parsed entries, most recent first (not yet normalized)
    Entries(Vec<Entry>),
    /// File exists but cannot be parsed
    Corrupt(String),
}

/// The persisted history file and its companions
#[derive(Debug, Clone)]
pub struct HistoryFile {
    path: PathBuf,
    tmp_path: PathBuf,
    lock_path: PathBuf,
}

impl HistoryFile {
    pub fn new(path: PathBuf) -> Self {
        let tmp_path = sibling(&path, "tmp");
        let lock_path = sibling(&path, "lock");
        Self {
            path,
            tmp_path,
            lock_path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Make sure the storage directory exists and accepts new files
    pub fn ensure_writable(&self) -> Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        create_private_dir(dir).map_err(|e| {
            ClipstashError::Config(format!("cannot create storage directory {}: {}", dir.display(), e))
        })?;

        std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(|e| {
                ClipstashError::Config(format!("storage directory {} is not writable: {}", dir.display(), e))
            })?;

        Ok(())
    }

    /// Read the file without taking the lock
    pub fn read(&self) -> Result<LoadedHistory> {
        let content = match std::fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(LoadedHistory::Missing),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice::<StoredHistory>(&content) {
            Ok(StoredHistory::Versioned { entries }) | Ok(StoredHistory::Legacy(entries)) => {
                Ok(LoadedHistory::Entries(entries))
            }
            Err(e) => Ok(LoadedHistory::Corrupt(e.to_string())),
        }
    }

    /// Atomically replace the file with `entries`
    pub fn write(&self, entries: &[Entry]) -> Result<()> {
        self.write_inner(entries).map_err(|source| ClipstashError::PersistenceWriteFailed {
            path: self.path.clone(),
            source,
        })
    }

    fn write_inner(&self, entries: &[Entry]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            create_private_dir(parent)?;
        }

        let data = PersistedHistory {
            version: FORMAT_VERSION,
            entries,
        };
        let json = serde_json::to_vec_pretty(&data)?;

        let mut tmp = create_private_file(&self.tmp_path)?;
        tmp.write_all(&json)?;
        tmp.sync_all()?;
        drop(tmp);

        std::fs::rename(&self.tmp_path, &self.path)?;
        Ok(())
    }

    /// Take the cross-process lock for a read-modify-write cycle
    pub fn lock(&self) -> Result<FileLock> {
        Ok(FileLock::acquire(&self.lock_path)?)
    }
}

/// Clipboard history is private to its owner: directories are created 0700
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    std::os::unix::fs::DirBuilderExt::mode(&mut builder, 0o700);
    builder.create(dir)
}

#[cfg(unix)]
fn create_private_file(path: &Path) -> std::io::Result<File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on creation; a leftover temp file keeps its bits
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn create_private_file(path: &Path) -> std::io::Result<File> {
    File::create(path)
}

/// `history.json` -> `history.json.<suffix>`
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}
