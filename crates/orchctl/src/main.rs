//! orchctl - inspect and edit the orchestrator snapshot
//!
//! Subcommands:
//! - `orchctl show` - Print the snapshot
//! - `orchctl save <json>` - Replace the snapshot
//! - `orchctl set <key> <json>` / `orchctl unset <key>` - Edit one key
//! - `orchctl clear` - Remove the snapshot
//! - `orchctl state` - Print the orchestrator workflows/handoffs document
//! - `orchctl path` / `orchctl config` - Show where things live

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use orchestore::{BackendKind, MemoryBackend, SnapshotStore, StateStore, StoreConfig};

mod commands;

#[derive(Parser)]
#[command(name = "orchctl")]
#[command(about = "Inspect and edit the invoice dashboard orchestrator snapshot")]
#[command(version)]
struct Cli {
    /// Config file (replaces ./orchestore.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Backend override: file or memory (memory only lives for this process)
    #[arg(short, long, global = true)]
    backend: Option<BackendKind>,

    /// Snapshot file override, relative to the current directory
    #[arg(short, long, global = true)]
    path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the snapshot as JSON
    Show,

    /// Replace the snapshot with a JSON object
    Save {
        /// JSON object
        json: String,
    },

    /// Set one key of the snapshot
    Set {
        key: String,

        /// JSON value; anything that is not valid JSON is stored as a string
        value: String,
    },

    /// Remove one key from the snapshot
    Unset { key: String },

    /// Remove the stored snapshot
    Clear,

    /// Print the orchestrator state document
    State,

    /// Print resolved file locations
    Path,

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, sources) =
        StoreConfig::load_from(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(path) = cli.path {
        // Absolute, so it is not joined onto the configured store directory.
        config.file_name = if path.is_absolute() {
            path
        } else {
            std::env::current_dir()
                .context("Failed to resolve current directory")?
                .join(path)
        };
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&config.log_level))
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(
        backend = %config.backend,
        files = ?sources.files,
        env = ?sources.env_overrides,
        "configuration loaded"
    );

    let memory = MemoryBackend::new();
    let snapshots = SnapshotStore::from_config(&config, &memory);

    match cli.command {
        Commands::Show => commands::show(&snapshots).await?,
        Commands::Save { json } => commands::save(&snapshots, &json).await?,
        Commands::Set { key, value } => commands::set(&snapshots, key, &value).await?,
        Commands::Unset { key } => commands::unset(&snapshots, &key).await?,
        Commands::Clear => commands::clear(&snapshots).await?,
        Commands::State => {
            let state = StateStore::from_config(&config, &memory);
            commands::state(&state).await?
        }
        Commands::Path => commands::path(&config),
        Commands::Config => commands::config(&config, &sources),
    }

    Ok(())
}
