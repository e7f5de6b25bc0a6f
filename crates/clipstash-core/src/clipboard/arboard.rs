//! Cross-platform clipboard adapter using arboard
//!
//! Works on Windows, macOS, and Linux (X11/Wayland). On X11 and Wayland the
//! clipboard contents are served by the process that set them, and only while
//! its `arboard::Clipboard` is alive, so one handle is kept for the life of
//! the adapter. It is opened on first use and reopened after a failure, which
//! also picks up a display session that appears after startup.

use parking_lot::Mutex;
use std::time::Duration;

use crate::clipboard::ClipboardSource;
use crate::error::{ClipstashError, Result};

/// Cross-platform clipboard adapter using arboard
pub struct ArboardClipboard {
    handle: CachedHandle<arboard::Clipboard>,
    hold: Option<Duration>,
}

impl ArboardClipboard {
    pub fn new() -> Self {
        Self {
            handle: CachedHandle::new(),
            hold: None,
        }
    }

    /// Adapter for a process that exits right after writing
    ///
    /// On X11 and Wayland each write blocks until another application takes
    /// over the clipboard or `hold` elapses, whichever comes first. A zero
    /// `hold` behaves like [`ArboardClipboard::new`].
    pub fn holding(hold: Duration) -> Self {
        Self {
            hold: (!hold.is_zero()).then_some(hold),
            ..Self::new()
        }
    }
}

impl Default for ArboardClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipboardSource for ArboardClipboard {
    fn read(&self) -> Result<Option<String>> {
        let text = self.handle.with(arboard::Clipboard::new, |clipboard| clipboard.get_text(), is_empty);
        match text {
            Ok(text) => Ok(Some(text)),
            // Empty clipboard, or only non-text formats on offer
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(e) => Err(ClipstashError::ClipboardUnavailable(e.to_string())),
        }
    }

    fn write(&self, text: &str) -> Result<()> {
        let hold = self.hold;
        self.handle
            .with(arboard::Clipboard::new, |clipboard| set_text(clipboard, text, hold), is_empty)
            .map_err(|e| ClipstashError::ClipboardWrite(e.to_string()))
    }
}

fn is_empty(error: &arboard::Error) -> bool {
    matches!(error, arboard::Error::ContentNotAvailable)
}

#[cfg(all(unix, not(any(target_os = "macos", target_os = "android", target_os = "emscripten"))))]
fn set_text(clipboard: &mut arboard::Clipboard, text: &str, hold: Option<Duration>) -> std::result::Result<(), arboard::Error> {
    use arboard::SetExtLinux;

    match hold {
        Some(hold) => clipboard
            .set()
            .wait_until(std::time::Instant::now() + hold)
            .text(text.to_owned()),
        None => clipboard.set_text(text.to_owned()),
    }
}

/// Contents outlive the process on these platforms
#[cfg(not(all(unix, not(any(target_os = "macos", target_os = "android", target_os = "emscripten")))))]
fn set_text(clipboard: &mut arboard::Clipboard, text: &str, _hold: Option<Duration>) -> std::result::Result<(), arboard::Error> {
    clipboard.set_text(text.to_owned())
}

/// A lazily opened handle kept across calls
///
/// The handle is dropped after any error `keep` rejects and reopened on the
/// next call.
struct CachedHandle<C> {
    slot: Mutex<Option<C>>,
}

impl<C> CachedHandle<C> {
    fn new() -> Self {
        Self { slot: Mutex::new(None) }
    }

    fn with<T, E: std::fmt::Display>(
        &self,
        open: impl FnOnce() -> std::result::Result<C, E>,
        op: impl FnOnce(&mut C) -> std::result::Result<T, E>,
        keep: impl FnOnce(&E) -> bool,
    ) -> std::result::Result<T, E> {
        let mut slot = self.slot.lock();
        let mut handle = match slot.take() {
            Some(handle) => handle,
            None => open()?,
        };

        let result = op(&mut handle);
        match &result {
            Err(e) if !keep(e) => tracing::debug!("Reopening clipboard after error: {}", e),
            _ => *slot = Some(handle),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn clipboard_default_creates() {
        let _clipboard = ArboardClipboard::default();
        let holding = ArboardClipboard::holding(Duration::from_secs(5));
        assert_eq!(holding.hold, Some(Duration::from_secs(5)));
        assert_eq!(ArboardClipboard::holding(Duration::ZERO).hold, None);
    }

    #[test]
    fn test_handle_outlives_each_call() {
        let cached: CachedHandle<u32> = CachedHandle::new();
        let opens = AtomicUsize::new(0);
        let open = || {
            opens.fetch_add(1, Ordering::SeqCst);
            Ok::<u32, String>(0)
        };
        let bump = |n: &mut u32| {
            *n += 1;
            Ok::<u32, String>(*n)
        };
        let keep_none = |_: &String| false;

        assert_eq!(cached.with(&open, bump, keep_none), Ok(1));
        assert_eq!(cached.with(&open, bump, keep_none), Ok(2));
        assert_eq!(opens.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handle_reopens_after_failure() {
        let cached: CachedHandle<u32> = CachedHandle::new();
        let opens = AtomicUsize::new(0);
        let open = || {
            opens.fetch_add(1, Ordering::SeqCst);
            Ok::<u32, String>(0)
        };
        let keep_empty = |e: &String| e == "empty";

        cached.with(&open, |n| { *n = 7; Ok::<(), String>(()) }, keep_empty).unwrap();

        // An expected miss keeps the handle
        assert!(cached.with(&open, |_| Err::<(), _>("empty".to_string()), keep_empty).is_err());
        assert_eq!(cached.with(&open, |n| Ok::<u32, String>(*n), keep_empty), Ok(7));
        assert_eq!(opens.load(Ordering::SeqCst), 1);

        // A broken connection drops it
        assert!(cached.with(&open, |_| Err::<(), _>("gone".to_string()), keep_empty).is_err());
        assert_eq!(cached.with(&open, |n| Ok::<u32, String>(*n), keep_empty), Ok(0));
        assert_eq!(opens.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failed_open_is_retried() {
        let cached: CachedHandle<u32> = CachedHandle::new();
        let result = cached.with(|| Err::<u32, _>("no display".to_string()), |n| Ok(*n), |_| true);
        assert_eq!(result, Err("no display".to_string()));
        assert_eq!(cached.with(|| Ok::<u32, String>(3), |n| Ok(*n), |_| true), Ok(3));
    }
}
