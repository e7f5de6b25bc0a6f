use anyhow::{Context, Result};

use clipstash_core::{Config, HistoryStore};
use clipstash_daemon::DaemonClient;

use crate::output;
use crate::OutputFormat;

pub fn run(config: Config, format: OutputFormat) -> Result<()> {
    let socket_path = config.socket_path();

    if let Some(mut client) = DaemonClient::connect_if_running(&socket_path) {
        let status = client.status().context("Failed to query daemon")?;
        match format {
            OutputFormat::Json => output::print_json(&status)?,
            OutputFormat::Plain => {
                println!("clipstash status");
                println!("================");
                println!();
                println!("Daemon: running (pid {}, up {}s)", status.pid, status.uptime_secs);
                println!("Socket: {}", status.socket_path.display());
                println!("History: {}", status.storage_path.display());
                println!("Entries: {} / {}", status.entries, status.max_size);
                println!("Poll interval: {} ms", status.poll_interval_ms);
                if status.degraded {
                    println!();
                    println!("Warning: recent changes are not yet written to disk");
                }
            }
        }
        return Ok(());
    }

    // Read-only view of the file; no clipboard needed
    let store = HistoryStore::open_with_config(&config).context("Failed to open history")?;
    match format {
        OutputFormat::Json => output::print_json(&serde_json::json!({
            "running": false,
            "socket_path": socket_path,
            "storage_path": store.path(),
            "entries": store.len(),
            "max_size": store.max_size(),
        }))?,
        OutputFormat::Plain => {
            println!("clipstash status");
            println!("================");
            println!();
            println!("Daemon: not running (start it with `clipstash daemon`)");
            println!("History: {}", store.path().display());
            println!("Entries: {} / {}", store.len(), store.max_size());
        }
    }

    Ok(())
}
