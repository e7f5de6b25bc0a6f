use anyhow::Result;
use std::time::Duration;

use clipstash_core::{Config, EntryRef};

use crate::backend::Backend;
use crate::output;
use crate::OutputFormat;

pub fn run(config: Config, entry: EntryRef, format: OutputFormat) -> Result<()> {
    let mut backend = Backend::connect(config, Duration::ZERO)?;
    let removed = backend.delete(entry)?;

    match format {
        OutputFormat::Plain => eprintln!("{}", output::describe("Deleted", &removed)),
        OutputFormat::Json => output::print_json(&removed)?,
    }

    Ok(())
}
