//! clipstash-core - Core library for the clipstash clipboard history
//!
//! This crate provides the parts that carry the history invariants:
//! - Deduplicated, size-bounded, most-recent-first history
//! - Atomic, crash-safe persistence shared between processes
//! - Clipboard polling with change detection and backoff
//! - The access facade used by interactive consumers
//! - Configuration management

pub mod clipboard;
pub mod config;
pub mod error;
pub mod facade;
pub mod history;
pub mod poller;
pub mod storage;
pub mod store;

pub use clipboard::ClipboardSource;
pub use config::Config;
pub use error::{ClipstashError, Result};
pub use facade::{AccessFacade, DisplayEntry};
pub use history::{Entry, EntryId, EntryRef, InsertOutcome};
pub use poller::{LastObserved, PollingEngine, TickOutcome};
pub use store::HistoryStore;

use std::sync::Arc;

/// One history with its clipboard, shared by the poller and the facade
pub struct Clipstash {
    config: Config,
    store: Arc<HistoryStore>,
    clipboard: Arc<dyn ClipboardSource>,
    observed: Arc<LastObserved>,
}

impl Clipstash {
    /// Validate the configuration and open the history it points at
    ///
    /// Fails only on configuration problems, including a storage directory
    /// that cannot be written.
    pub fn open(config: Config, clipboard: Arc<dyn ClipboardSource>) -> Result<Self> {
        config.validate()?;
        let store = Arc::new(HistoryStore::open_with_config(&config)?);

        Ok(Self {
            config,
            store,
            clipboard,
            observed: Arc::new(LastObserved::new()),
        })
    }

    /// Open with the platform clipboard
    #[cfg(feature = "arboard")]
    pub fn open_default(config: Config) -> Result<Self> {
        Self::open(config, clipboard::create_clipboard())
    }

    /// Polling engine writing into this history
    pub fn poller(&self) -> PollingEngine {
        PollingEngine::new(
            &self.config,
            self.store.clone(),
            self.clipboard.clone(),
            self.observed.clone(),
        )
    }

    /// Facade sharing the poller's view of the clipboard
    pub fn facade(&self) -> AccessFacade {
        AccessFacade::new(
            self.store.clone(),
            self.clipboard.clone(),
            self.observed.clone(),
            self.config.display.preview_width,
        )
    }

    pub fn store(&self) -> &Arc<HistoryStore> {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
