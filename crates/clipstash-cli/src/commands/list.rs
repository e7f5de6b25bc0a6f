use anyhow::{Context, Result};
use std::time::Duration;

use clipstash_core::Config;

use crate::backend::Backend;
use crate::output;
use crate::OutputFormat;

pub fn run(config: Config, limit: Option<usize>, width: Option<usize>, format: OutputFormat) -> Result<()> {
    let mut backend = Backend::connect(config, Duration::ZERO)?;
    let entries = backend.list(limit, width).context("Failed to list history")?;

    match format {
        OutputFormat::Plain => {
            if entries.is_empty() {
                eprintln!("Clipboard history is empty");
            }
            print!("{}", output::format_listing(&entries));
        }
        OutputFormat::Json => output::print_json(&entries)?,
    }

    Ok(())
}
