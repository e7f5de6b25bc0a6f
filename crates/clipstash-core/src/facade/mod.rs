//! Access facade: the operations interactive consumers run against the store
//!
//! Lists, restores, deletes and clears, translating store results into
//! outcomes a consumer can report. A stale id or position is an expected race
//! between listing and acting and comes back as `EntryNotFound`.

mod display;

pub use display::{preview, DisplayEntry};

use std::sync::Arc;

use crate::clipboard::ClipboardSource;
use crate::error::{ClipstashError, Result};
use crate::history::{Entry, EntryRef};
use crate::poller::LastObserved;
use crate::store::HistoryStore;

pub struct AccessFacade {
    store: Arc<HistoryStore>,
    clipboard: Arc<dyn ClipboardSource>,
    observed: Arc<LastObserved>,
    preview_width: usize,
}

impl AccessFacade {
    pub fn new(
        store: Arc<HistoryStore>,
        clipboard: Arc<dyn ClipboardSource>,
        observed: Arc<LastObserved>,
        preview_width: usize,
    ) -> Self {
        Self {
            store,
            clipboard,
            observed,
            preview_width,
        }
    }

    /// Current history formatted for display, most recent first
    pub fn list_for_display(&self, limit: Option<usize>) -> Vec<DisplayEntry> {
        self.list_with_width(limit, self.preview_width)
    }

    /// Like `list_for_display` with previews cut to `width` characters
    pub fn list_with_width(&self, limit: Option<usize>, width: usize) -> Vec<DisplayEntry> {
        self.refresh();
        self.store
            .list()
            .iter()
            .take(limit.unwrap_or(usize::MAX))
            .enumerate()
            .map(|(i, entry)| DisplayEntry::new(i + 1, entry, width))
            .collect()
    }

    /// Full entry, without side effects
    pub fn show(&self, entry: EntryRef) -> Result<Entry> {
        self.resolve(entry)
    }

    /// Put an entry back on the clipboard
    ///
    /// The written text is recorded as already observed, so the poller does
    /// not treat it as new clipboard activity. The entry keeps its position.
    pub fn select_and_restore(&self, entry: EntryRef) -> Result<Entry> {
        let entry = self.resolve(entry)?;
        let text = self.store.restore(entry.id)?;
        self.observed.write_through(self.clipboard.as_ref(), &text)?;
        tracing::debug!("Restored {} to the clipboard", entry.id);
        Ok(entry)
    }

    pub fn delete_one(&self, entry: EntryRef) -> Result<Entry> {
        let entry = self.resolve(entry)?;
        let removed = self.store.delete(entry.id)?;
        tracing::debug!("Deleted {}", removed.id);
        Ok(removed)
    }

    /// Remove every entry; returns how many were removed
    pub fn clear_all(&self) -> Result<usize> {
        let removed = self.store.clear()?;
        tracing::info!("Cleared {} entries", removed);
        Ok(removed)
    }

    pub fn store(&self) -> &Arc<HistoryStore> {
        &self.store
    }

    fn resolve(&self, entry: EntryRef) -> Result<Entry> {
        self.refresh();
        self.store
            .find(entry)
            .ok_or_else(|| ClipstashError::EntryNotFound(entry.to_string()))
    }

    /// Pick up writes made by other processes
    fn refresh(&self) {
        if let Err(e) = self.store.refresh() {
            tracing::debug!("Using cached history, refresh failed: {}", e);
        }
    }
}
