//! History entries and their identifiers

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use xxhash_rust::xxh3::xxh3_64;

/// Stable identifier of an entry, derived from its text
///
/// Because history text is unique, hashing the text gives every process the
/// same id for the same entry without any shared counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct EntryId(u64);

impl EntryId {
    pub fn for_text(text: &str) -> Self {
        Self(xxh3_64(text.as_bytes()))
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for EntryId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 16 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(format!("expected 16 hex digits, got {:?}", s));
        }
        u64::from_str_radix(s, 16)
            .map(Self)
            .map_err(|e| e.to_string())
    }
}

impl From<EntryId> for String {
    fn from(id: EntryId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for EntryId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One recorded clipboard value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Absent in unversioned files; recomputed from `text` whenever a history is loaded
    #[serde(default)]
    pub id: EntryId,
    /// Older files call this field `content`
    #[serde(alias = "content")]
    pub text: String,
    /// Time of the last observation or promotion
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl Entry {
    pub fn new(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        let text = text.into();
        Self {
            id: EntryId::for_text(&text),
            text,
            timestamp,
        }
    }
}

/// True when the text carries nothing worth restoring
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", raw)))
}

/// Parse RFC 3339, or a naive ISO-8601 timestamp taken as local time
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|ts| ts.with_timezone(&Utc))
}
