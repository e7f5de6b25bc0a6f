//! Clipboard source port and adapters
//!
//! The daemon only needs two operations from the system clipboard: read the
//! current text and replace it. Both may fail transiently (no display
//! session, another application holding the selection).

#[cfg(feature = "arboard")]
mod arboard;
mod memory;

#[cfg(feature = "arboard")]
pub use self::arboard::ArboardClipboard;
pub use memory::MemoryClipboard;

#[cfg(feature = "arboard")]
use std::sync::Arc;

use crate::error::Result;

/// Port for reading and writing the system clipboard
pub trait ClipboardSource: Send + Sync {
    /// Current clipboard text; `Ok(None)` when the clipboard holds no text
    fn read(&self) -> Result<Option<String>>;

    /// Replace the clipboard contents with `text`
    fn write(&self, text: &str) -> Result<()>;
}

/// Create the default clipboard adapter for the current platform
#[cfg(feature = "arboard")]
pub fn create_clipboard() -> Arc<dyn ClipboardSource> {
    Arc::new(ArboardClipboard::new())
}
