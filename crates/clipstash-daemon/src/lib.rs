//! clipstash-daemon - Background daemon for clipstash
//!
//! This crate provides the background daemon that:
//! - Polls the clipboard and records changes into the history
//! - Serves list/select/delete requests via Unix socket
//! - Keeps restores from being recorded as new clipboard activity
//!
//! Commands reach a running daemon through [`DaemonClient`].

pub mod client;
pub mod poll;
pub mod protocol;
pub mod server;

pub use client::{ClientError, DaemonClient};
pub use protocol::{DaemonStatus, ErrorCode, Request, Response};

use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::net::UnixListener;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;

use clipstash_core::storage::FileLock;
use clipstash_core::{ClipboardSource, Clipstash, ClipstashError, Config};

use server::ServerState;

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("Another clipstash daemon is already running (lock {0} is held)")]
    AlreadyRunning(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Core(#[from] ClipstashError),
}

pub struct Daemon {
    clipstash: Clipstash,
    socket_path: PathBuf,
}

impl Daemon {
    pub fn new(config: Config, clipboard: Arc<dyn ClipboardSource>) -> Result<Self, DaemonError> {
        let socket_path = config.socket_path();
        let clipstash = Clipstash::open(config, clipboard)?;
        Ok(Self {
            clipstash,
            socket_path,
        })
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Run until SIGINT, SIGTERM or a shutdown request
    pub async fn run(self) -> Result<(), DaemonError> {
        let socket_dir = self
            .socket_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&socket_dir)?;

        // Held until run returns: one daemon per socket and one per history file
        let _socket_instance = claim_instance(&socket_dir.join("clipstash.lock"))?;
        let _history_instance = claim_instance(&history_instance_lock(self.clipstash.store().path()))?;

        let engine = Arc::new(self.clipstash.poller());
        engine.prime();

        // Only a crashed daemon leaves a socket behind while the lock is free
        if self.socket_path.exists() {
            tracing::debug!("Removing stale socket {}", self.socket_path.display());
            fs::remove_file(&self.socket_path)?;
        }
        let listener = UnixListener::bind(&self.socket_path)?;
        fs::set_permissions(&self.socket_path, fs::Permissions::from_mode(0o600))?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let state = Arc::new(ServerState::new(
            &self.clipstash,
            self.socket_path.clone(),
            shutdown_tx.clone(),
        ));

        let period = self.clipstash.config().poller.interval();
        let poller = tokio::spawn(poll::poll_loop(engine, period, shutdown_rx.clone()));
        let server = tokio::spawn(server::serve(listener, state, shutdown_rx.clone()));

        tracing::info!(
            "Daemon started: history {} ({} entries), socket {}",
            self.clipstash.store().path().display(),
            self.clipstash.store().len(),
            self.socket_path.display()
        );

        let waited = wait_for_shutdown(shutdown_rx).await;
        shutdown_tx.send_replace(true);

        if let Err(e) = poller.await {
            tracing::error!("Poll task failed: {}", e);
        }
        if let Err(e) = server.await {
            tracing::error!("Server task failed: {}", e);
        }

        let store = self.clipstash.store();
        if store.is_degraded() {
            match store.flush() {
                Ok(_) => tracing::info!("Pending history written on shutdown"),
                Err(e) => tracing::error!("History changes lost on shutdown: {}", e),
            }
        }

        if let Err(e) = fs::remove_file(&self.socket_path) {
            tracing::debug!("Failed to remove socket: {}", e);
        }
        tracing::info!("Daemon stopped");

        waited.map_err(DaemonError::from)
    }
}

fn claim_instance(lock_path: &Path) -> Result<FileLock, DaemonError> {
    FileLock::try_acquire(lock_path)?.ok_or_else(|| DaemonError::AlreadyRunning(lock_path.to_path_buf()))
}

/// `history.json` -> `history.json.daemon.lock`
///
/// Separate from the store's own lock, which is only held per mutation.
fn history_instance_lock(history_path: &Path) -> PathBuf {
    let mut name = history_path.file_name().unwrap_or_default().to_os_string();
    name.push(".daemon.lock");
    history_path.with_file_name(name)
}

async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) -> io::Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigint.recv() => tracing::info!("Received SIGINT"),
        _ = sigterm.recv() => tracing::info!("Received SIGTERM"),
        _ = stopped(&mut shutdown) => {}
    }
    Ok(())
}

/// Resolves once shutdown is signalled or the sender is gone
pub(crate) async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipstash_core::clipboard::MemoryClipboard;
    use clipstash_core::EntryRef;
    use std::time::Duration;
    use tempfile::tempdir;

    fn test_config(dir: &Path) -> Config {
        let mut config = Config::default();
        config.history.storage_path = Some(dir.join("history.json"));
        config.daemon.socket_path = Some(dir.join("clipstash.sock"));
        config.poller.interval_ms = 10;
        config
    }

    async fn wait_until(mut ready: impl FnMut() -> bool) {
        for _ in 0..500 {
            if ready() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_daemon_round_trip() {
        let temp_dir = tempdir().unwrap();
        let config = test_config(temp_dir.path());
        let socket = config.socket_path();

        let clipboard = Arc::new(MemoryClipboard::new());
        clipboard.set("before start");

        let daemon = Daemon::new(config, clipboard.clone()).unwrap();
        let handle = tokio::spawn(daemon.run());

        let ready = socket.clone();
        wait_until(move || DaemonClient::connect_if_running(&ready).is_some()).await;

        clipboard.set("copied");
        let ready = socket.clone();
        wait_until(move || {
            DaemonClient::connect(&ready)
                .and_then(|mut client| client.list(None, None))
                .map(|entries| !entries.is_empty())
                .unwrap_or(false)
        })
        .await;

        let client_clipboard = clipboard.clone();
        tokio::task::spawn_blocking(move || {
            let mut client = DaemonClient::connect(&socket).unwrap();

            // The value present at startup was primed, not recorded
            let entries = client.list(None, None).unwrap();
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].preview, "copied");

            client_clipboard.set("elsewhere");
            let selected = client.select(EntryRef::Id(entries[0].id)).unwrap();
            assert_eq!(selected.text, "copied");
            assert_eq!(client_clipboard.get().as_deref(), Some("copied"));

            let missing = client.delete(EntryRef::Position(9)).unwrap_err();
            assert_eq!(missing.code(), Some(ErrorCode::EntryNotFound));

            let status = client.status().unwrap();
            assert_eq!(status.socket_path, socket);
            assert!(!status.degraded);

            client.shutdown().unwrap();
        })
        .await
        .unwrap();

        handle.await.unwrap().unwrap();
        assert!(!temp_dir.path().join("clipstash.sock").exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_second_daemon_is_rejected() {
        let temp_dir = tempdir().unwrap();
        let config = test_config(temp_dir.path());
        let socket = config.socket_path();

        let first = Daemon::new(config.clone(), Arc::new(MemoryClipboard::new())).unwrap();
        let handle = tokio::spawn(first.run());
        let ready = socket.clone();
        wait_until(move || DaemonClient::connect_if_running(&ready).is_some()).await;

        let second = Daemon::new(config, Arc::new(MemoryClipboard::new())).unwrap();
        assert!(matches!(second.run().await, Err(DaemonError::AlreadyRunning(_))));

        tokio::task::spawn_blocking(move || DaemonClient::connect(&socket).unwrap().shutdown().unwrap())
            .await
            .unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_shared_history_is_rejected_across_sockets() {
        let temp_dir = tempdir().unwrap();
        let config = test_config(temp_dir.path());
        let socket = config.socket_path();

        let first = Daemon::new(config.clone(), Arc::new(MemoryClipboard::new())).unwrap();
        let handle = tokio::spawn(first.run());
        let ready = socket.clone();
        wait_until(move || DaemonClient::connect_if_running(&ready).is_some()).await;

        // Same history file, socket in another directory
        let other_dir = temp_dir.path().join("other");
        let mut other = config.clone();
        other.daemon.socket_path = Some(other_dir.join("clipstash.sock"));
        let second = Daemon::new(other, Arc::new(MemoryClipboard::new())).unwrap();
        match second.run().await {
            Err(DaemonError::AlreadyRunning(lock)) => {
                assert_eq!(lock, temp_dir.path().join("history.json.daemon.lock"))
            }
            result => panic!("expected AlreadyRunning, got {:?}", result),
        }
        assert!(!other_dir.join("clipstash.sock").exists());

        tokio::task::spawn_blocking(move || DaemonClient::connect(&socket).unwrap().shutdown().unwrap())
            .await
            .unwrap();
        handle.await.unwrap().unwrap();
    }

    #[test]
    fn test_history_instance_lock_sits_next_to_history() {
        assert_eq!(
            history_instance_lock(Path::new("/data/clipstash/history.json")),
            PathBuf::from("/data/clipstash/history.json.daemon.lock")
        );
    }
}
