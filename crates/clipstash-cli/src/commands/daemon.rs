use anyhow::{Context, Result};

use clipstash_core::clipboard::create_clipboard;
use clipstash_core::Config;
use clipstash_daemon::Daemon;

pub fn run(config: Config) -> Result<()> {
    let daemon = Daemon::new(config, create_clipboard()).context("Failed to start daemon")?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(daemon.run())?;

    Ok(())
}
