//! The history store: sole owner of the history and its file
//!
//! Two locks are involved. Within a process, `writer` serializes mutations
//! while `state` is only held long enough to swap or copy the history, so
//! listing never waits on file I/O. Across processes, each mutation runs its
//! read-modify-write cycle under the file lock and re-reads the file first,
//! so changes made by other processes are not overwritten.

use chrono::Utc;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{ClipstashError, Result};
use crate::history::{Entry, EntryId, EntryRef, History, InsertOutcome};
use crate::storage::{HistoryFile, LoadedHistory};

struct StoreState {
    history: History,
    /// In-memory changes not yet on disk; memory stays authoritative meanwhile
    unflushed: bool,
}

pub struct HistoryStore {
    file: HistoryFile,
    max_size: usize,
    state: Mutex<StoreState>,
    writer: Mutex<()>,
}

impl HistoryStore {
    /// Open the store configured in `config`
    pub fn open_with_config(config: &Config) -> Result<Self> {
        Self::open(config.storage_path(), config.history.max_size)
    }

    /// Open the store at `path`
    ///
    /// Only an unusable storage directory is an error. A missing file starts
    /// an empty history, and so does a file that cannot be parsed.
    pub fn open(path: PathBuf, max_size: usize) -> Result<Self> {
        let file = HistoryFile::new(path);
        file.ensure_writable()?;

        let history = match file.read() {
            Ok(LoadedHistory::Entries(entries)) => {
                let history = History::from_entries(entries, max_size);
                tracing::debug!("Loaded {} entries from {}", history.len(), file.path().display());
                history
            }
            Ok(LoadedHistory::Missing) => {
                tracing::debug!("No history at {}, starting empty", file.path().display());
                History::new(max_size)
            }
            Ok(LoadedHistory::Corrupt(reason)) => {
                tracing::warn!(
                    "{}; starting with an empty history",
                    ClipstashError::PersistenceCorrupt {
                        path: file.path().to_path_buf(),
                        reason,
                    }
                );
                History::new(max_size)
            }
            Err(e) => {
                tracing::warn!("Failed to read {}: {}; starting with an empty history", file.path().display(), e);
                History::new(max_size)
            }
        };

        Ok(Self {
            file,
            max_size,
            state: Mutex::new(StoreState {
                history,
                unflushed: false,
            }),
            writer: Mutex::new(()),
        })
    }

    /// Record `text` as the latest clipboard value
    ///
    /// Blank text is ignored. On `PersistenceWriteFailed` the insert has still
    /// happened in memory and will be written by the next successful flush.
    pub fn insert_or_promote(&self, text: &str) -> Result<InsertOutcome> {
        self.mutate(|history| {
            let outcome = history.insert_or_promote(text, Utc::now());
            let changed = outcome.changed();
            (outcome, changed)
        })
    }

    /// Consistent point-in-time copy, most recent first
    pub fn list(&self) -> Vec<Entry> {
        self.state.lock().history.snapshot()
    }

    /// Look up an entry without changing anything
    pub fn find(&self, entry: EntryRef) -> Option<Entry> {
        self.state.lock().history.find(entry).cloned()
    }

    /// Text of an entry, for handing to the clipboard
    ///
    /// Does not promote: restoring is not an observation.
    pub fn restore(&self, id: EntryId) -> Result<String> {
        self.state
            .lock()
            .history
            .get(id)
            .map(|e| e.text.clone())
            .ok_or_else(|| ClipstashError::entry_not_found(id))
    }

    pub fn delete(&self, id: EntryId) -> Result<Entry> {
        let removed = self.mutate(|history| {
            let removed = history.remove(id);
            let changed = removed.is_some();
            (removed, changed)
        })?;
        removed.ok_or_else(|| ClipstashError::entry_not_found(id))
    }

    /// Empty the history; the file is rewritten empty, not removed
    pub fn clear(&self) -> Result<usize> {
        self.mutate(|history| {
            let removed = history.len();
            history.clear();
            (removed, true)
        })
    }

    /// Write pending in-memory changes left by an earlier failed flush
    ///
    /// Returns `Ok(true)` if something was written.
    pub fn flush(&self) -> Result<bool> {
        let _writer = self.writer.lock();
        let snapshot = {
            let state = self.state.lock();
            if !state.unflushed {
                return Ok(false);
            }
            state.history.snapshot()
        };

        let _file_lock = self.file.lock()?;
        self.file.write(&snapshot)?;
        self.state.lock().unflushed = false;
        tracing::info!("History flushed to {}", self.file.path().display());
        Ok(true)
    }

    /// Adopt the file's current contents, unless unflushed changes exist
    ///
    /// Does not take the file lock: the file is replaced atomically, so the
    /// read sees one whole version.
    pub fn refresh(&self) -> Result<()> {
        let _writer = self.writer.lock();
        if self.state.lock().unflushed {
            return Ok(());
        }

        if let Some(history) = self.load_current()? {
            let mut state = self.state.lock();
            if !state.unflushed {
                state.history = history;
            }
        }
        Ok(())
    }

    /// True while in-memory changes are waiting for a successful flush
    pub fn is_degraded(&self) -> bool {
        self.state.lock().unflushed
    }

    pub fn len(&self) -> usize {
        self.state.lock().history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Read-modify-write cycle shared by every mutation
    ///
    /// `apply` returns its result and whether it changed the history.
    fn mutate<T>(&self, apply: impl FnOnce(&mut History) -> (T, bool)) -> Result<T> {
        let _writer = self.writer.lock();

        let file_lock = match self.file.lock() {
            Ok(lock) => Some(lock),
            Err(e) => {
                tracing::warn!("Failed to lock {}: {}", self.file.path().display(), e);
                None
            }
        };

        let (mut history, unflushed) = {
            let state = self.state.lock();
            (state.history.clone(), state.unflushed)
        };

        if !unflushed && file_lock.is_some() {
            match self.load_current() {
                Ok(Some(current)) => history = current,
                Ok(None) => {}
                Err(e) => tracing::debug!("Keeping in-memory history, re-read failed: {}", e),
            }
        }

        let (result, changed) = apply(&mut history);
        if !changed {
            // Still publish what was re-read from disk
            self.state.lock().history = history;
            return Ok(result);
        }

        let snapshot = history.snapshot();
        {
            let mut state = self.state.lock();
            state.history = history;
            state.unflushed = true;
        }

        if file_lock.is_none() {
            return Err(ClipstashError::PersistenceWriteFailed {
                path: self.file.path().to_path_buf(),
                source: std::io::Error::other("history file lock unavailable"),
            });
        }

        match self.file.write(&snapshot) {
            Ok(()) => {
                self.state.lock().unflushed = false;
                Ok(result)
            }
            Err(e) => {
                tracing::warn!("{}; keeping changes in memory", e);
                Err(e)
            }
        }
    }

    /// History as currently on disk; `None` when the file cannot be trusted
    fn load_current(&self) -> Result<Option<History>> {
        match self.file.read()? {
            LoadedHistory::Entries(entries) => Ok(Some(History::from_entries(entries, self.max_size))),
            LoadedHistory::Missing => Ok(Some(History::new(self.max_size))),
            LoadedHistory::Corrupt(reason) => {
                tracing::debug!("Ignoring unparseable {}: {}", self.file.path().display(), reason);
                Ok(None)
            }
        }
    }
}
