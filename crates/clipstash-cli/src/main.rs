use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clipstash_core::{Config, EntryRef};

mod backend;
mod commands;
mod output;

#[derive(Parser)]
#[command(name = "clipstash")]
#[command(about = "Clipboard history that survives restarts", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: $XDG_CONFIG_HOME/clipstash/config.toml)
    #[arg(long, global = true, env = "CLIPSTASH_CONFIG")]
    pub config: Option<PathBuf>,

    /// History file
    #[arg(long, global = true, env = "CLIPSTASH_STORAGE")]
    pub storage: Option<PathBuf>,

    /// Maximum number of entries kept
    #[arg(long, global = true, env = "CLIPSTASH_MAX_ITEMS")]
    pub max_items: Option<usize>,

    /// Clipboard poll interval in milliseconds
    #[arg(long, global = true, env = "CLIPSTASH_INTERVAL_MS")]
    pub interval_ms: Option<u64>,

    /// Output format: plain, json
    #[arg(short, long, default_value = "plain", global = true)]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the clipboard poller in the foreground
    Daemon,

    /// List the history, most recent first
    List {
        /// Maximum entries to show
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Preview width in characters
        #[arg(short, long, value_parser = clap::value_parser!(u16).range(4..))]
        width: Option<u16>,
    },

    /// Put an entry back on the clipboard
    Select {
        /// Entry id or 1-based position
        entry: EntryRef,

        /// Without a daemon, seconds to keep serving the clipboard (X11/Wayland)
        #[arg(long, default_value = "30")]
        hold: u64,
    },

    /// Print the full text of an entry
    Show {
        /// Entry id or 1-based position
        entry: EntryRef,
    },

    /// Delete an entry
    Delete {
        /// Entry id or 1-based position
        entry: EntryRef,
    },

    /// Delete every entry
    Clear {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Show daemon and history status
    Status,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// One line per entry (default)
    Plain,
    /// JSON output
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if backend::is_soft_failure(&e) => {
            eprintln!("{}", e);
            ExitCode::from(1)
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn init_logging(cli: &Cli) {
    let default_level = match cli.command {
        Commands::Daemon => "info",
        _ => "warn",
    };
    let filter = if let Ok(directive) = std::env::var("CLIPSTASH_LOG") {
        directive
    } else if cli.verbose || std::env::var("CLIPSTASH_DEBUG").is_ok() {
        "debug".to_string()
    } else {
        default_level.to_string()
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load().context("Failed to load config")?,
    };

    if let Some(storage) = &cli.storage {
        config.history.storage_path = Some(storage.clone());
    }
    if let Some(max_items) = cli.max_items {
        config.history.max_size = max_items;
    }
    if let Some(interval_ms) = cli.interval_ms {
        config.poller.interval_ms = interval_ms;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let format = cli.format;

    match cli.command {
        Commands::Daemon => commands::daemon::run(config),
        Commands::List { limit, width } => {
            commands::list::run(config, limit, width.map(usize::from), format)
        }
        Commands::Select { entry, hold } => {
            commands::select::run(config, entry, Duration::from_secs(hold), format)
        }
        Commands::Show { entry } => commands::show::run(config, entry, format),
        Commands::Delete { entry } => commands::delete::run(config, entry, format),
        Commands::Clear { yes } => commands::clear::run(config, yes, format),
        Commands::Status => commands::status::run(config, format),
    }
}
