use anyhow::Result;
use std::time::Duration;

use clipstash_core::{Config, EntryRef};

use crate::backend::Backend;
use crate::output;
use crate::OutputFormat;

pub fn run(config: Config, entry: EntryRef, hold: Duration, format: OutputFormat) -> Result<()> {
    let mut backend = Backend::connect(config, hold)?;
    if backend.is_local() && !hold.is_zero() {
        eprintln!(
            "clipstash daemon is not running; serving the clipboard until it is replaced (at most {}s)",
            hold.as_secs()
        );
    }
    let entry = backend.select(entry)?;

    match format {
        OutputFormat::Plain => eprintln!("{}", output::describe("Restored", &entry)),
        OutputFormat::Json => output::print_json(&entry)?,
    }

    Ok(())
}
