//! IPC protocol for daemon communication
//!
//! One JSON object per line in each direction.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use clipstash_core::{ClipstashError, EntryRef};

/// Request from client to daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// List the history for display
    List {
        limit: Option<usize>,
        /// Preview width; the daemon's configured width when absent
        #[serde(default)]
        width: Option<usize>,
    },
    /// Full text of one entry
    Show { entry: EntryRef },
    /// Put an entry back on the clipboard
    Select { entry: EntryRef },
    /// Delete one entry
    Delete { entry: EntryRef },
    /// Delete every entry
    Clear,
    /// Get daemon status
    Status,
    /// Ping/health check
    Ping,
    /// Shutdown daemon
    Shutdown,
}

/// Response from daemon to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Success { data: serde_json::Value },
    Error { code: ErrorCode, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    EntryNotFound,
    Clipboard,
    Persistence,
    BadRequest,
    Internal,
}

impl From<&ClipstashError> for ErrorCode {
    fn from(error: &ClipstashError) -> Self {
        match error {
            ClipstashError::EntryNotFound(_) => Self::EntryNotFound,
            ClipstashError::ClipboardUnavailable(_) | ClipstashError::ClipboardWrite(_) => Self::Clipboard,
            ClipstashError::PersistenceWriteFailed { .. } | ClipstashError::PersistenceCorrupt { .. } => {
                Self::Persistence
            }
            ClipstashError::InvalidEntryRef(_) => Self::BadRequest,
            _ => Self::Internal,
        }
    }
}

impl Response {
    pub fn success(data: impl Serialize) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => Self::Success { data },
            Err(e) => Self::error(ErrorCode::Internal, format!("failed to encode response: {}", e)),
        }
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }

    pub fn from_error(error: &ClipstashError) -> Self {
        Self::error(ErrorCode::from(error), error.to_string())
    }
}

/// Reply to `Status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonStatus {
    pub pid: u32,
    pub version: String,
    pub uptime_secs: u64,
    pub storage_path: PathBuf,
    pub socket_path: PathBuf,
    pub entries: usize,
    pub max_size: usize,
    pub poll_interval_ms: u64,
    /// History changes are waiting for a successful write
    pub degraded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipstash_core::EntryId;

    #[test]
    fn test_request_wire_format() {
        let id = EntryId::for_text("x");
        let request = Request::Select { entry: EntryRef::Id(id) };
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(json, format!(r#"{{"type":"select","entry":"{}"}}"#, id));

        let parsed: Request = serde_json::from_str(r#"{"type":"delete","entry":"2"}"#).unwrap();
        assert!(matches!(parsed, Request::Delete { entry: EntryRef::Position(2) }));

        assert!(serde_json::from_str::<Request>(r#"{"type":"delete","entry":"zero"}"#).is_err());
    }

    #[test]
    fn test_error_codes() {
        let response = Response::from_error(&ClipstashError::EntryNotFound("3".into()));
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains(r#""status":"error""#));
        assert!(json.contains(r#""code":"entry_not_found""#));
    }
}
