//! Single-line previews of entry text

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::history::{Entry, EntryId};

/// An entry as shown in a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayEntry {
    /// 1-based position, most recent first
    pub position: usize,
    pub id: EntryId,
    pub timestamp: DateTime<Utc>,
    /// Single-line, width-limited rendering of the text
    pub preview: String,
    /// Length of the full text in characters
    pub chars: usize,
}

impl DisplayEntry {
    pub fn new(position: usize, entry: &Entry, width: usize) -> Self {
        Self {
            position,
            id: entry.id,
            timestamp: entry.timestamp,
            preview: preview(&entry.text, width),
            chars: entry.text.chars().count(),
        }
    }
}

/// Flatten `text` to one line of at most `width` characters
///
/// Line breaks and tabs become spaces, whitespace runs collapse, and other
/// control characters are escaped so they cannot drive the terminal.
pub fn preview(text: &str, width: usize) -> String {
    let mut flat = String::with_capacity(text.len().min(width * 4));
    for word in text.split_whitespace() {
        if !flat.is_empty() {
            flat.push(' ');
        }
        for c in word.chars() {
            if c.is_control() {
                flat.extend(c.escape_default());
            } else {
                flat.push(c);
            }
        }
    }

    truncate(&flat, width)
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }

    let keep = width.saturating_sub(3);
    let truncated: String = text.chars().take(keep).collect();
    format!("{}...", truncated.trim_end())
}
