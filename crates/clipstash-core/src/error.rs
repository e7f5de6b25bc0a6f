use std::path::PathBuf;
use thiserror::Error;

use crate::history::EntryId;

#[derive(Debug, Error)]
pub enum ClipstashError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Clipboard unavailable: {0}")]
    ClipboardUnavailable(String),

    #[error("Failed to write clipboard: {0}")]
    ClipboardWrite(String),

    #[error("Failed to persist history to {path}: {source}")]
    PersistenceWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("History file is corrupt: {path} ({reason})")]
    PersistenceCorrupt { path: PathBuf, reason: String },

    #[error("Entry no longer exists: {0}")]
    EntryNotFound(String),

    #[error("Invalid entry reference: {0}")]
    InvalidEntryRef(String),
}

impl From<crate::config::ConfigError> for ClipstashError {
    fn from(e: crate::config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

impl ClipstashError {
    pub fn entry_not_found(id: EntryId) -> Self {
        Self::EntryNotFound(id.to_string())
    }

    /// Expected, recoverable outcomes that consumers report without failing hard
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            Self::EntryNotFound(_) | Self::ClipboardUnavailable(_) | Self::PersistenceWriteFailed { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ClipstashError>;
