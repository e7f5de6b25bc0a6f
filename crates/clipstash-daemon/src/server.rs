//! Socket server: one JSON request per line, one JSON response per line

use serde::Serialize;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::watch;
use tokio::task::JoinSet;

use clipstash_core::{AccessFacade, Clipstash, Result};

use crate::protocol::{DaemonStatus, ErrorCode, Request, Response};
use crate::stopped;

/// Longest request line accepted, newline excluded
pub const MAX_REQUEST_BYTES: usize = 64 * 1024;

/// What request handlers share
pub struct ServerState {
    facade: AccessFacade,
    socket_path: PathBuf,
    poll_interval_ms: u64,
    started: Instant,
    shutdown: watch::Sender<bool>,
}

impl ServerState {
    pub fn new(clipstash: &Clipstash, socket_path: PathBuf, shutdown: watch::Sender<bool>) -> Self {
        Self {
            facade: clipstash.facade(),
            socket_path,
            poll_interval_ms: clipstash.config().poller.interval_ms,
            started: Instant::now(),
            shutdown,
        }
    }

    /// Run one request; blocks on clipboard and file access
    pub fn handle(&self, request: Request) -> Response {
        match request {
            Request::List { limit, width } => Response::success(match width {
                Some(width) => self.facade.list_with_width(limit, width.max(4)),
                None => self.facade.list_for_display(limit),
            }),
            Request::Show { entry } => reply(self.facade.show(entry)),
            Request::Select { entry } => reply(self.facade.select_and_restore(entry)),
            Request::Delete { entry } => reply(self.facade.delete_one(entry)),
            Request::Clear => reply(self.facade.clear_all()),
            Request::Status => Response::success(self.status()),
            Request::Ping => Response::success("pong"),
            Request::Shutdown => {
                tracing::info!("Shutdown requested by client");
                self.shutdown.send_replace(true);
                Response::success(serde_json::Value::Null)
            }
        }
    }

    fn status(&self) -> DaemonStatus {
        let store = self.facade.store();
        DaemonStatus {
            pid: std::process::id(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: self.started.elapsed().as_secs(),
            storage_path: store.path().to_path_buf(),
            socket_path: self.socket_path.clone(),
            entries: store.len(),
            max_size: store.max_size(),
            poll_interval_ms: self.poll_interval_ms,
            degraded: store.is_degraded(),
        }
    }
}

fn reply<T: Serialize>(result: Result<T>) -> Response {
    match result {
        Ok(value) => Response::success(value),
        Err(e) => {
            if e.is_soft() {
                tracing::debug!("Request failed: {}", e);
            } else {
                tracing::warn!("Request failed: {}", e);
            }
            Response::from_error(&e)
        }
    }
}

/// Accept connections until shutdown, then wait for open ones to finish
/// their current request
pub async fn serve(listener: UnixListener, state: Arc<ServerState>, shutdown: watch::Receiver<bool>) {
    let mut connections = JoinSet::new();
    let mut stop = shutdown.clone();

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, _addr)) => {
                    let state = state.clone();
                    let shutdown = shutdown.clone();
                    connections.spawn(async move {
                        if let Err(e) = handle_connection(stream, state, shutdown).await {
                            tracing::debug!("Connection closed with error: {}", e);
                        }
                    });
                }
                Err(e) => tracing::warn!("Socket accept error: {}", e),
            },
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
            _ = stopped(&mut stop) => break,
        }
    }

    tracing::debug!("Draining {} open connections", connections.len());
    while connections.join_next().await.is_some() {}
}

async fn handle_connection(
    stream: UnixStream,
    state: Arc<ServerState>,
    mut shutdown: watch::Receiver<bool>,
) -> io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    loop {
        let frame = tokio::select! {
            frame = read_frame(&mut reader) => frame?,
            _ = stopped(&mut shutdown) => break,
        };

        let (response, keep_open) = match frame {
            Frame::Eof => break,
            Frame::Line(line) if line.trim().is_empty() => continue,
            Frame::Line(line) => {
                let response = match serde_json::from_str::<Request>(&line) {
                    Ok(request) => dispatch(state.clone(), request).await,
                    Err(e) => Response::error(ErrorCode::BadRequest, format!("Invalid request: {}", e)),
                };
                (response, true)
            }
            // The rest of the line is still unread, so the stream cannot be resynced
            Frame::TooLong => {
                tracing::warn!("Dropping client after a request over {} bytes", MAX_REQUEST_BYTES);
                let message = format!("Request exceeds {} bytes", MAX_REQUEST_BYTES);
                (Response::error(ErrorCode::BadRequest, message), false)
            }
        };

        let mut out = serde_json::to_string(&response)?;
        out.push('\n');
        writer.write_all(out.as_bytes()).await?;
        writer.flush().await?;

        if !keep_open {
            break;
        }
    }

    Ok(())
}

enum Frame {
    Line(String),
    TooLong,
    Eof,
}

/// Read one newline-terminated request, never buffering more than
/// [`MAX_REQUEST_BYTES`] of it
async fn read_frame<R: AsyncBufRead + Unpin>(reader: &mut R) -> io::Result<Frame> {
    let mut buf = Vec::new();
    let limit = MAX_REQUEST_BYTES as u64 + 1;
    let read = reader.take(limit).read_until(b'\n', &mut buf).await?;
    if read == 0 {
        return Ok(Frame::Eof);
    }

    if buf.last() == Some(&b'\n') {
        buf.pop();
    } else if buf.len() > MAX_REQUEST_BYTES {
        return Ok(Frame::TooLong);
    }

    let line = String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(Frame::Line(line))
}

async fn dispatch(state: Arc<ServerState>, request: Request) -> Response {
    match tokio::task::spawn_blocking(move || state.handle(request)).await {
        Ok(response) => response,
        Err(e) => Response::error(ErrorCode::Internal, format!("Request handler failed: {}", e)),
    }
}
