//! Blocking client for the daemon socket

use serde::de::DeserializeOwned;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

use clipstash_core::{DisplayEntry, Entry, EntryId, EntryRef};

use crate::protocol::{DaemonStatus, ErrorCode, Request, Response};

/// Replies can wait on a clipboard write or a file flush
const IO_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Daemon connection failed: {0}")]
    Connection(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("{message}")]
    Remote { code: ErrorCode, message: String },
}

impl ClientError {
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub struct DaemonClient {
    reader: BufReader<UnixStream>,
    writer: UnixStream,
}

impl DaemonClient {
    pub fn connect(socket_path: &Path) -> Result<Self, ClientError> {
        let stream = UnixStream::connect(socket_path)?;
        stream.set_read_timeout(Some(IO_TIMEOUT))?;
        stream.set_write_timeout(Some(IO_TIMEOUT))?;
        let writer = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(stream),
            writer,
        })
    }

    /// Connect only if a daemon answers a ping
    pub fn connect_if_running(socket_path: &Path) -> Option<Self> {
        if !socket_path.exists() {
            return None;
        }
        let mut client = Self::connect(socket_path).ok()?;
        client.ping().ok()?;
        Some(client)
    }

    pub fn request(&mut self, request: &Request) -> Result<serde_json::Value, ClientError> {
        let mut line = serde_json::to_string(request).map_err(|e| ClientError::Protocol(e.to_string()))?;
        line.push('\n');
        self.writer.write_all(line.as_bytes())?;
        self.writer.flush()?;

        let mut reply = String::new();
        if self.reader.read_line(&mut reply)? == 0 {
            return Err(ClientError::Protocol("daemon closed the connection".into()));
        }

        match serde_json::from_str::<Response>(&reply).map_err(|e| ClientError::Protocol(e.to_string()))? {
            Response::Success { data } => Ok(data),
            Response::Error { code, message } => Err(ClientError::Remote { code, message }),
        }
    }

    fn request_as<T: DeserializeOwned>(&mut self, request: &Request) -> Result<T, ClientError> {
        let data = self.request(request)?;
        serde_json::from_value(data).map_err(|e| ClientError::Protocol(e.to_string()))
    }

    pub fn ping(&mut self) -> Result<(), ClientError> {
        self.request(&Request::Ping).map(|_| ())
    }

    pub fn list(&mut self, limit: Option<usize>, width: Option<usize>) -> Result<Vec<DisplayEntry>, ClientError> {
        self.request_as(&Request::List { limit, width })
    }

    pub fn show(&mut self, entry: EntryRef) -> Result<Entry, ClientError> {
        self.request_as(&Request::Show { entry }).map(with_id)
    }

    pub fn select(&mut self, entry: EntryRef) -> Result<Entry, ClientError> {
        self.request_as(&Request::Select { entry }).map(with_id)
    }

    pub fn delete(&mut self, entry: EntryRef) -> Result<Entry, ClientError> {
        self.request_as(&Request::Delete { entry }).map(with_id)
    }

    pub fn clear(&mut self) -> Result<usize, ClientError> {
        self.request_as(&Request::Clear)
    }

    pub fn status(&mut self) -> Result<DaemonStatus, ClientError> {
        self.request_as(&Request::Status)
    }

    pub fn shutdown(&mut self) -> Result<(), ClientError> {
        self.request(&Request::Shutdown).map(|_| ())
    }
}

/// Ids are derived from text, so recompute rather than trust the wire
fn with_id(mut entry: Entry) -> Entry {
    entry.id = EntryId::for_text(&entry.text);
    entry
}
