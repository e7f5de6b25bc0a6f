//! Clipboard change detection by polling
//!
//! Each tick reads the clipboard and compares it with the text seen on the
//! previous successful read. Only a difference is handed to the store. Read
//! failures are never fatal: the engine backs off and tries again.
//!
//! The timer lives with the caller (the daemon drives `tick` from an async
//! interval); this module is synchronous so it can be tested tick by tick.

use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use std::time::Instant;

use crate::clipboard::ClipboardSource;
use crate::config::Config;
use crate::error::{ClipstashError, Result};
use crate::history::InsertOutcome;
use crate::store::HistoryStore;

/// Last clipboard text the engine has accounted for
///
/// Shared with the access facade: restoring an entry writes the clipboard and
/// records the value here under the same lock, so the next tick sees no change.
#[derive(Default)]
pub struct LastObserved {
    text: Mutex<Option<String>>,
}

impl LastObserved {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<String> {
        self.text.lock().clone()
    }

    /// Write the clipboard and record the written text as observed, atomically
    /// with respect to polling
    pub fn write_through(&self, clipboard: &dyn ClipboardSource, text: &str) -> Result<()> {
        let mut observed = self.text.lock();
        clipboard.write(text)?;
        *observed = Some(text.to_owned());
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Option<String>> {
        self.text.lock()
    }
}

/// Result of a single poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Same text as last time
    Unchanged,
    /// New text was handed to the store
    Changed(InsertOutcome),
    /// New text was recorded in memory but could not be written to disk
    NotPersisted,
    /// New text larger than the configured limit, not recorded
    TooLarge(usize),
    /// Clipboard holds no text
    Empty,
    /// Clipboard could not be read
    Unavailable,
    /// Skipped while waiting out the backoff after a failed read
    BackingOff,
}

#[derive(Default)]
struct PollHealth {
    consecutive_failures: u32,
    retry_at: Option<Instant>,
}

pub struct PollingEngine {
    store: Arc<HistoryStore>,
    clipboard: Arc<dyn ClipboardSource>,
    observed: Arc<LastObserved>,
    max_entry_bytes: usize,
    error_backoff: std::time::Duration,
    health: Mutex<PollHealth>,
}

impl PollingEngine {
    pub fn new(
        config: &Config,
        store: Arc<HistoryStore>,
        clipboard: Arc<dyn ClipboardSource>,
        observed: Arc<LastObserved>,
    ) -> Self {
        Self {
            store,
            clipboard,
            observed,
            max_entry_bytes: config.history.max_entry_bytes,
            error_backoff: config.poller.error_backoff(),
            health: Mutex::new(PollHealth::default()),
        }
    }

    /// Take the current clipboard value as already seen, without recording it
    pub fn prime(&self) {
        match self.clipboard.read() {
            Ok(text) => *self.observed.lock() = text,
            Err(e) => tracing::debug!("Clipboard not readable at startup: {}", e),
        }
    }

    pub fn tick(&self) -> TickOutcome {
        if self.store.is_degraded() {
            match self.store.flush() {
                Ok(true) => tracing::info!("History persistence recovered"),
                Ok(false) => {}
                Err(e) => tracing::debug!("History flush still failing: {}", e),
            }
        }

        if let Some(retry_at) = self.health.lock().retry_at {
            if Instant::now() < retry_at {
                return TickOutcome::BackingOff;
            }
        }

        let text = {
            let mut observed = self.observed.lock();
            let text = match self.clipboard.read() {
                Ok(text) => {
                    self.record_success();
                    text
                }
                Err(e) => {
                    self.record_failure(&e);
                    return TickOutcome::Unavailable;
                }
            };

            if *observed == text {
                return TickOutcome::Unchanged;
            }
            *observed = text.clone();

            match text {
                Some(text) => text,
                None => return TickOutcome::Empty,
            }
        };

        if text.len() > self.max_entry_bytes {
            tracing::info!(
                "Skipping clipboard value of {} bytes (limit {})",
                text.len(),
                self.max_entry_bytes
            );
            return TickOutcome::TooLarge(text.len());
        }

        match self.store.insert_or_promote(&text) {
            Ok(outcome) => {
                match &outcome {
                    InsertOutcome::Inserted { id, evicted } => {
                        tracing::debug!("Recorded {} ({} chars)", id, text.chars().count());
                        if let Some(evicted) = evicted {
                            tracing::debug!("Evicted {}", evicted.id);
                        }
                    }
                    InsertOutcome::Promoted { id } => tracing::debug!("Promoted {}", id),
                    InsertOutcome::Ignored => {}
                }
                TickOutcome::Changed(outcome)
            }
            Err(ClipstashError::PersistenceWriteFailed { .. }) => {
                tracing::warn!("Running in degraded mode: history kept in memory until the file is writable");
                TickOutcome::NotPersisted
            }
            Err(e) => {
                tracing::warn!("Failed to record clipboard value: {}", e);
                TickOutcome::NotPersisted
            }
        }
    }

    pub fn store(&self) -> &Arc<HistoryStore> {
        &self.store
    }

    fn record_success(&self) {
        let mut health = self.health.lock();
        if health.consecutive_failures > 0 {
            tracing::info!(
                "Clipboard available again after {} failed reads",
                health.consecutive_failures
            );
        }
        *health = PollHealth::default();
    }

    fn record_failure(&self, error: &ClipstashError) {
        let mut health = self.health.lock();
        health.consecutive_failures += 1;
        health.retry_at = Some(Instant::now() + self.error_backoff);

        if health.consecutive_failures == 1 {
            tracing::warn!("Clipboard read failed: {}; retrying in {:?}", error, self.error_backoff);
        } else {
            tracing::debug!(
                "Clipboard read failed ({} in a row): {}",
                health.consecutive_failures,
                error
            );
        }
    }
}
