use anyhow::Result;
use chrono::Local;
use serde::Serialize;

use clipstash_core::{DisplayEntry, Entry};

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `position  id  local time  preview`
pub fn format_listing(entries: &[DisplayEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&format!(
            "{:>3}  {}  {}  {}\n",
            entry.position,
            entry.id,
            entry.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
            entry.preview
        ));
    }
    out
}

/// One-line confirmation for select and delete
pub fn describe(action: &str, entry: &Entry) -> String {
    format!("{} {} ({} chars)", action, entry.id, entry.text.chars().count())
}
