use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use clipstash_core::{PollingEngine, TickOutcome};

use crate::stopped;

/// Drive the polling engine until shutdown
///
/// Ticks run on the blocking pool since clipboard reads and history writes
/// are synchronous. A slow tick delays the next one instead of bursting.
pub async fn poll_loop(engine: Arc<PollingEngine>, period: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = stopped(&mut shutdown) => break,
        }

        let engine = engine.clone();
        match tokio::task::spawn_blocking(move || engine.tick()).await {
            Ok(TickOutcome::Unchanged) | Ok(TickOutcome::BackingOff) => {}
            Ok(outcome) => tracing::trace!("Poll: {:?}", outcome),
            Err(e) => tracing::error!("Poll tick failed: {}", e),
        }
    }

    tracing::debug!("Poll loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipstash_core::clipboard::MemoryClipboard;
    use clipstash_core::{Clipstash, Config};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_poll_loop_records_and_stops() {
        let temp_dir = tempdir().unwrap();
        let mut config = Config::default();
        config.history.storage_path = Some(temp_dir.path().join("history.json"));

        let clipboard = Arc::new(MemoryClipboard::new());
        let clipstash = Clipstash::open(config, clipboard.clone()).unwrap();
        let (tx, rx) = watch::channel(false);

        clipboard.set("copied");
        let task = tokio::spawn(poll_loop(
            Arc::new(clipstash.poller()),
            Duration::from_millis(5),
            rx,
        ));

        for _ in 0..400 {
            if !clipstash.store().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(clipstash.store().list()[0].text, "copied");

        tx.send_replace(true);
        task.await.unwrap();
    }
}
