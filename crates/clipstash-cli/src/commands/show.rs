use anyhow::Result;
use std::io::Write;
use std::time::Duration;

use clipstash_core::{Config, EntryRef};

use crate::backend::Backend;
use crate::output;
use crate::OutputFormat;

pub fn run(config: Config, entry: EntryRef, format: OutputFormat) -> Result<()> {
    let mut backend = Backend::connect(config, Duration::ZERO)?;
    let entry = backend.show(entry)?;

    match format {
        // Exact text, no trailing newline added
        OutputFormat::Plain => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(entry.text.as_bytes())?;
            stdout.flush()?;
        }
        OutputFormat::Json => output::print_json(&entry)?,
    }

    Ok(())
}
