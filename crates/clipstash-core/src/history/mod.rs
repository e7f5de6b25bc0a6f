//! Ordered, deduplicated, size-bounded clipboard history
//!
//! The front of the history is the most recently observed value. Texts are
//! unique: observing a stored value again promotes it instead of adding a copy.

mod entry;

pub use entry::{is_blank, Entry, EntryId};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::str::FromStr;

use crate::error::ClipstashError;

/// What an insert did to the history
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// New entry at the front, possibly pushing out the oldest one
    Inserted { id: EntryId, evicted: Option<Entry> },
    /// Existing entry moved to the front with a fresh timestamp
    Promoted { id: EntryId },
    /// Blank text, nothing recorded
    Ignored,
}

impl InsertOutcome {
    pub fn id(&self) -> Option<EntryId> {
        match self {
            Self::Inserted { id, .. } | Self::Promoted { id } => Some(*id),
            Self::Ignored => None,
        }
    }

    pub fn changed(&self) -> bool {
        !matches!(self, Self::Ignored)
    }
}

/// How a consumer points at an entry: by id, or by 1-based listing position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum EntryRef {
    Id(EntryId),
    Position(usize),
}

impl FromStr for EntryRef {
    type Err = ClipstashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(id) = s.parse::<EntryId>() {
            return Ok(Self::Id(id));
        }
        match s.trim_start_matches('#').parse::<usize>() {
            Ok(position) if position > 0 => Ok(Self::Position(position)),
            _ => Err(ClipstashError::InvalidEntryRef(format!(
                "{:?} is neither an entry id nor a position",
                s
            ))),
        }
    }
}

impl fmt::Display for EntryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{}", id),
            Self::Position(position) => write!(f, "{}", position),
        }
    }
}

impl From<EntryId> for EntryRef {
    fn from(id: EntryId) -> Self {
        Self::Id(id)
    }
}

impl From<EntryRef> for String {
    fn from(entry: EntryRef) -> Self {
        entry.to_string()
    }
}

impl TryFrom<String> for EntryRef {
    type Error = ClipstashError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    entries: VecDeque<Entry>,
    max_size: usize,
}

impl History {
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_size: max_size.max(1),
        }
    }

    /// Build a history from stored entries (most recent first), restoring the
    /// invariants: blank texts are dropped, duplicates keep their most recent
    /// occurrence, ids are recomputed and the size bound is applied.
    pub fn from_entries(entries: Vec<Entry>, max_size: usize) -> Self {
        let mut history = Self::new(max_size);
        let mut seen = HashSet::new();

        for mut entry in entries {
            if is_blank(&entry.text) || !seen.insert(entry.text.clone()) {
                continue;
            }
            if history.entries.len() == history.max_size {
                break;
            }
            entry.id = EntryId::for_text(&entry.text);
            history.entries.push_back(entry);
        }

        history
    }

    pub fn insert_or_promote(&mut self, text: &str, now: DateTime<Utc>) -> InsertOutcome {
        if is_blank(text) {
            return InsertOutcome::Ignored;
        }

        let existing = self.entries.iter().position(|e| e.text == text);
        if let Some(mut entry) = existing.and_then(|pos| self.entries.remove(pos)) {
            entry.timestamp = now;
            let id = entry.id;
            self.entries.push_front(entry);
            return InsertOutcome::Promoted { id };
        }

        let entry = Entry::new(text, now);
        let id = entry.id;
        self.entries.push_front(entry);

        let evicted = if self.entries.len() > self.max_size {
            self.entries.pop_back()
        } else {
            None
        };

        InsertOutcome::Inserted { id, evicted }
    }

    pub fn remove(&mut self, id: EntryId) -> Option<Entry> {
        let pos = self.entries.iter().position(|e| e.id == id)?;
        self.entries.remove(pos)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn get(&self, id: EntryId) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Entry at a 1-based position, as shown in listings
    pub fn at_position(&self, position: usize) -> Option<&Entry> {
        position.checked_sub(1).and_then(|i| self.entries.get(i))
    }

    pub fn find(&self, entry: EntryRef) -> Option<&Entry> {
        match entry {
            EntryRef::Id(id) => self.get(id),
            EntryRef::Position(position) => self.at_position(position),
        }
    }

    pub fn front(&self) -> Option<&Entry> {
        self.entries.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    /// Copy of the entries, most recent first
    pub fn snapshot(&self) -> Vec<Entry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn texts(history: &History) -> Vec<&str> {
        history.iter().map(|e| e.text.as_str()).collect()
    }

    #[test]
    fn test_order_and_promotion() {
        let t0 = Utc::now();
        let mut history = History::new(10);
        history.insert_or_promote("A", t0);
        history.insert_or_promote("B", t0 + Duration::seconds(1));
        history.insert_or_promote("C", t0 + Duration::seconds(2));
        assert_eq!(texts(&history), vec!["C", "B", "A"]);

        let outcome = history.insert_or_promote("A", t0 + Duration::seconds(3));
        assert_eq!(outcome, InsertOutcome::Promoted { id: EntryId::for_text("A") });
        assert_eq!(texts(&history), vec!["A", "C", "B"]);
        assert_eq!(history.front().unwrap().timestamp, t0 + Duration::seconds(3));
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_promoting_front_refreshes_timestamp() {
        let t0 = Utc::now();
        let mut history = History::new(10);
        history.insert_or_promote("same", t0);
        let outcome = history.insert_or_promote("same", t0 + Duration::seconds(5));
        assert!(matches!(outcome, InsertOutcome::Promoted { .. }));
        assert_eq!(history.len(), 1);
        assert_eq!(history.front().unwrap().timestamp, t0 + Duration::seconds(5));
    }

    #[test]
    fn test_eviction_drops_oldest() {
        let now = Utc::now();
        let mut history = History::new(3);
        for text in ["1", "2", "3"] {
            history.insert_or_promote(text, now);
        }

        let outcome = history.insert_or_promote("4", now);
        match outcome {
            InsertOutcome::Inserted { evicted: Some(evicted), .. } => assert_eq!(evicted.text, "1"),
            other => panic!("unexpected outcome: {:?}", other),
        }
        history.insert_or_promote("5", now);
        assert_eq!(texts(&history), vec!["5", "4", "3"]);
    }

    #[test]
    fn test_promotion_protects_from_eviction() {
        let now = Utc::now();
        let mut history = History::new(3);
        for text in ["1", "2", "3", "1", "4"] {
            history.insert_or_promote(text, now);
        }
        assert_eq!(texts(&history), vec!["4", "1", "3"]);
    }

    #[test]
    fn test_blank_text_is_ignored() {
        let mut history = History::new(3);
        assert_eq!(history.insert_or_promote("", Utc::now()), InsertOutcome::Ignored);
        assert_eq!(history.insert_or_promote(" \n\t", Utc::now()), InsertOutcome::Ignored);
        assert!(history.is_empty());
    }

    #[test]
    fn test_whitespace_variants_are_distinct() {
        let mut history = History::new(5);
        history.insert_or_promote("value", Utc::now());
        history.insert_or_promote("value ", Utc::now());
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_remove_and_lookup() {
        let mut history = History::new(5);
        let a = history.insert_or_promote("a", Utc::now()).id().unwrap();
        history.insert_or_promote("b", Utc::now());

        assert_eq!(history.get(a).unwrap().text, "a");
        assert_eq!(history.at_position(1).unwrap().text, "b");
        assert!(history.at_position(0).is_none());
        assert!(history.at_position(3).is_none());

        assert_eq!(history.remove(a).unwrap().text, "a");
        assert!(history.remove(a).is_none());
        assert_eq!(texts(&history), vec!["b"]);
    }

    #[test]
    fn test_entry_ref_parse() {
        let id = EntryId::for_text("abc");
        assert_eq!(id.to_string().parse::<EntryRef>().unwrap(), EntryRef::Id(id));
        assert_eq!("3".parse::<EntryRef>().unwrap(), EntryRef::Position(3));
        assert_eq!("#12".parse::<EntryRef>().unwrap(), EntryRef::Position(12));
        assert!("0".parse::<EntryRef>().is_err());
        assert!("first".parse::<EntryRef>().is_err());
    }

    #[test]
    fn test_find_by_ref() {
        let mut history = History::new(5);
        history.insert_or_promote("old", Utc::now());
        let newest = history.insert_or_promote("new", Utc::now()).id().unwrap();

        assert_eq!(history.find(EntryRef::Position(2)).unwrap().text, "old");
        assert_eq!(history.find(newest.into()).unwrap().text, "new");
        assert!(history.find(EntryRef::Id(EntryId::for_text("gone"))).is_none());
    }

    #[test]
    fn test_from_entries_normalizes() {
        let now = Utc::now();
        let entries = vec![
            Entry::new("x", now),
            Entry::new("   ", now),
            Entry::new("y", now),
            Entry::new("x", now - Duration::seconds(10)),
            Entry::new("z", now),
        ];

        let history = History::from_entries(entries, 2);
        assert_eq!(texts(&history), vec!["x", "y"]);
        assert!(history.iter().all(|e| e.id == EntryId::for_text(&e.text)));
    }
}
