//! In-process clipboard, for tests and headless runs

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::clipboard::ClipboardSource;
use crate::error::{ClipstashError, Result};

#[derive(Default)]
pub struct MemoryClipboard {
    text: Mutex<Option<String>>,
    unavailable: AtomicBool,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate another application copying `text`
    pub fn set(&self, text: impl Into<String>) {
        *self.text.lock() = Some(text.into());
    }

    pub fn get(&self) -> Option<String> {
        self.text.lock().clone()
    }

    /// Make every read and write fail until turned off again
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ClipstashError::ClipboardUnavailable("no display session".into()));
        }
        Ok(())
    }
}

impl ClipboardSource for MemoryClipboard {
    fn read(&self) -> Result<Option<String>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self.get())
    }

    fn write(&self, text: &str) -> Result<()> {
        self.check_available()?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.set(text);
        Ok(())
    }
}
