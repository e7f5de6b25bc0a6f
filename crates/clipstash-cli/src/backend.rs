//! Where commands run: a live daemon, or the history file directly

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use clipstash_core::clipboard::ArboardClipboard;
use clipstash_core::{ClipstashError, Clipstash, Config, DisplayEntry, Entry, EntryRef};
use clipstash_daemon::{ClientError, DaemonClient, ErrorCode};

pub enum Backend {
    Daemon(DaemonClient),
    Local(Clipstash),
}

impl Backend {
    /// Prefer the daemon so restores update its view of the clipboard
    ///
    /// Without one, a restore written by this process is kept on offer for up
    /// to `hold`, until another application takes the clipboard over.
    pub fn connect(config: Config, hold: Duration) -> Result<Self> {
        let socket_path = config.socket_path();
        if let Some(client) = DaemonClient::connect_if_running(&socket_path) {
            tracing::debug!("Using daemon at {}", socket_path.display());
            return Ok(Self::Daemon(client));
        }

        tracing::debug!("Daemon not running, opening history directly");
        let clipboard = Arc::new(ArboardClipboard::holding(hold));
        let clipstash = Clipstash::open(config, clipboard).context("Failed to open history")?;
        Ok(Self::Local(clipstash))
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }

    pub fn list(&mut self, limit: Option<usize>, width: Option<usize>) -> Result<Vec<DisplayEntry>> {
        Ok(match self {
            Self::Daemon(client) => client.list(limit, width)?,
            Self::Local(clipstash) => {
                let facade = clipstash.facade();
                match width {
                    Some(width) => facade.list_with_width(limit, width),
                    None => facade.list_for_display(limit),
                }
            }
        })
    }

    pub fn show(&mut self, entry: EntryRef) -> Result<Entry> {
        Ok(match self {
            Self::Daemon(client) => client.show(entry)?,
            Self::Local(clipstash) => clipstash.facade().show(entry)?,
        })
    }

    pub fn select(&mut self, entry: EntryRef) -> Result<Entry> {
        Ok(match self {
            Self::Daemon(client) => client.select(entry)?,
            Self::Local(clipstash) => clipstash.facade().select_and_restore(entry)?,
        })
    }

    pub fn delete(&mut self, entry: EntryRef) -> Result<Entry> {
        Ok(match self {
            Self::Daemon(client) => client.delete(entry)?,
            Self::Local(clipstash) => clipstash.facade().delete_one(entry)?,
        })
    }

    pub fn clear(&mut self) -> Result<usize> {
        Ok(match self {
            Self::Daemon(client) => client.clear()?,
            Self::Local(clipstash) => clipstash.facade().clear_all()?,
        })
    }
}

/// A stale entry reference: reported plainly, not as a crash
pub fn is_soft_failure(error: &anyhow::Error) -> bool {
    if let Some(e) = error.downcast_ref::<ClipstashError>() {
        return matches!(e, ClipstashError::EntryNotFound(_));
    }
    if let Some(e) = error.downcast_ref::<ClientError>() {
        return e.code() == Some(ErrorCode::EntryNotFound);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_not_found_is_soft() {
        let local = anyhow::Error::from(ClipstashError::EntryNotFound("#4".into()));
        assert!(is_soft_failure(&local));

        let remote = anyhow::Error::from(ClientError::Remote {
            code: ErrorCode::EntryNotFound,
            message: "Entry no longer exists: #4".into(),
        });
        assert!(is_soft_failure(&remote.context("Failed to select entry")));

        let hard = anyhow::Error::from(ClipstashError::ClipboardWrite("no display".into()));
        assert!(!is_soft_failure(&hard));
    }
}
