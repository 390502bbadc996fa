//! floodline admin CLI.
//!
//! Inspects and manages the cache database and sync queue that
//! `floodline-server` uses. Reads the same configuration (defaults, then
//! `FLOODLINE_CONFIG_FILE`, then `FLOODLINE_*` variables).
//!
//! ```bash
//! floodline caches
//! floodline entries dynamic-v1
//! floodline sync --tag flood-report-sync
//! ```

mod commands;

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use floodline_core::{AppConfig, CacheDb};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "floodline", about = "Manage the floodline offline cache", version)]
struct Cli {
    /// TOML config file (overrides FLOODLINE_CONFIG_FILE).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print JSON instead of tables.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List named caches with entry counts and sizes
    Caches,
    /// List the entries of one cache
    Entries {
        /// Cache name, e.g. dynamic-v1
        cache: String,
    },
    /// Delete a whole cache
    Purge {
        cache: String,
    },
    /// Seed the static cache from the asset manifest
    Install,
    /// Delete every cache not belonging to the configured version
    Activate,
    /// List writes waiting for background sync
    Queue,
    /// Replay queued writes against the origin
    Sync {
        /// Sync tag to replay
        #[arg(long, default_value = floodline_client::FLOOD_REPORT_SYNC)]
        tag: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    let db = CacheDb::open(&config.db_path).await?;
    tracing::debug!(db = %config.db_path.display(), "opened cache database");
    let mut out = io::stdout().lock();
    let format = if cli.json { commands::Format::Json } else { commands::Format::Table };

    match cli.command {
        Commands::Caches => commands::caches::list(&db, format, &mut out).await?,
        Commands::Entries { cache } => commands::caches::entries(&db, &cache, format, &mut out).await?,
        Commands::Purge { cache } => commands::caches::purge(&db, &cache, &mut out).await?,
        Commands::Install => commands::lifecycle::install(&config, &db, format, &mut out).await?,
        Commands::Activate => commands::lifecycle::activate(&config, &db, &mut out).await?,
        Commands::Queue => commands::queue::list(&db, format, &mut out).await?,
        Commands::Sync { tag } => commands::queue::sync(&config, &db, &tag, format, &mut out).await?,
    }

    out.flush()?;
    Ok(())
}
