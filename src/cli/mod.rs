use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use time::UtcOffset;
use tracing_subscriber::{fmt, EnvFilter};

use crate::app::{App, Journal};
use crate::config::{AppConfig, ConfigLoader, CONFIG_ENV, DATA_ENV};
use crate::journal::{JournalStore, KeyValueBackend, MemoryBackend};
use crate::storage;

pub mod commands;

use self::commands::{ChatArgs, JournalArgs, MoodArgs, QuoteArgs};

#[derive(Parser, Debug)]
#[command(
    name = "mindmend",
    version,
    about = "Terminal wellness companion with a local journal"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over MINDMEND_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over MINDMEND_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Keep the journal in memory only; nothing is written to disk
    #[arg(long)]
    pub ephemeral: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the interactive TUI (default)
    Tui,
    /// Add, list or clear journal entries
    Journal(JournalArgs),
    /// Record how you feel as a journal entry
    Mood(MoodArgs),
    /// Print an encouraging quote
    Quote(QuoteArgs),
    /// Take the five-question stress check
    Quiz,
    /// Talk to the comfort chat
    Chat(ChatArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var(CONFIG_ENV, path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var(DATA_ENV, path);
    }

    // Must be read before anything spawns a thread.
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);

    let loader = ConfigLoader::discover()?;
    loader.paths().ensure_directories()?;
    init_tracing(&cli.log_level)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    let config = loader.load_or_init()?;

    let command = cli.command.unwrap_or(Commands::Tui);
    match command {
        Commands::Tui => {
            let journal = open_journal(&config, cli.ephemeral);
            let mut app = App::new(&config, journal, offset);
            commands::run_tui(&mut app)
        }
        Commands::Journal(args) => {
            let mut journal = open_journal(&config, cli.ephemeral);
            commands::warn_if_unavailable(&journal);
            commands::handle_journal_command(&config, &mut journal, offset, args)
        }
        Commands::Mood(args) => {
            let mut journal = open_journal(&config, cli.ephemeral);
            commands::warn_if_unavailable(&journal);
            commands::record_mood(&mut journal, args)
        }
        Commands::Quote(args) => commands::print_quote(args),
        Commands::Quiz => commands::take_quiz(),
        Commands::Chat(args) => commands::chat(args),
    }
}

/// Never fails: a store that cannot be opened still yields a journal whose
/// startup probe reports it unavailable.
fn open_journal(config: &AppConfig, ephemeral: bool) -> Journal {
    let backend: Box<dyn KeyValueBackend> = if ephemeral {
        tracing::info!("using in-memory journal");
        Box::new(MemoryBackend::new())
    } else {
        match storage::init(&config.storage) {
            Ok(backend) => Box::new(backend),
            Err(err) => {
                tracing::error!(?err, "failed to initialise journal storage");
                Box::new(storage::detached(&config.storage))
            }
        }
    };
    JournalStore::new(backend)
}

fn init_tracing(level: &str) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
        Ok(())
    })
    .map(|_| ())
}
