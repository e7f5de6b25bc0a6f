use anyhow::{Context, Result};
use std::io::{BufRead, IsTerminal, Write};
use std::time::Duration;

use clipstash_core::Config;

use crate::backend::Backend;
use crate::output;
use crate::OutputFormat;

pub fn run(config: Config, yes: bool, format: OutputFormat) -> Result<()> {
    if !yes && std::io::stdin().is_terminal() && !confirm()? {
        eprintln!("Aborted");
        return Ok(());
    }

    let mut backend = Backend::connect(config, Duration::ZERO)?;
    let removed = backend.clear().context("Failed to clear history")?;

    match format {
        OutputFormat::Plain => eprintln!("Cleared {} entries", removed),
        OutputFormat::Json => output::print_json(&serde_json::json!({ "removed": removed }))?,
    }

    Ok(())
}

fn confirm() -> Result<bool> {
    eprint!("Delete the entire clipboard history? [y/N] ");
    std::io::stderr().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes" | "YES"))
}
