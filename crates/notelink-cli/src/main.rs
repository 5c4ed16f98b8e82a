//! notelink CLI
//!
//! Command-line interface for notelink - resolve note links and export notes.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use notelink_core::export::ExportError;
use notelink_core::{Config, InsertPosition, NoteId};

mod commands;
mod host;
mod output;
mod templates;

use commands::export::ExportFlags;
use commands::Context;
use output::{Output, OutputFormat};

/// Time given to dropped exports to erase their temporary notes
const CLEANUP_GRACE: Duration = Duration::from_millis(200);

#[derive(Parser)]
#[command(name = "notelink")]
#[command(about = "notelink - Resolve note links and export notes")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a note
    Export {
        /// Note id
        id: NoteId,
        /// Destination directory
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
        #[command(flatten)]
        flags: ExportFlags,
    },
    /// Export several notes as Markdown files
    ExportAll {
        /// Note ids
        #[arg(required = true)]
        ids: Vec<NoteId>,
        /// Destination directory
        #[arg(short, long)]
        dir: PathBuf,
        /// One self-contained file per note instead of one file per linked note
        #[arg(long)]
        embed: bool,
        /// Register the written files for sync
        #[arg(long, conflicts_with = "embed")]
        sync: bool,
    },
    /// Re-export synced notes (all of them without ids)
    Sync {
        ids: Vec<NoteId>,
        /// Destination for notes that are not synced yet
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
    /// Stop syncing a note
    Unsync { id: NoteId },
    /// Show the heading tree of a note
    Outline { id: NoteId },
    /// Insert links to other notes
    Link {
        /// Note receiving the links
        into: NoteId,
        /// Notes to link to
        #[arg(required = true)]
        targets: Vec<NoteId>,
        /// Line index of the heading to insert under
        #[arg(short, long)]
        section: Option<usize>,
        /// Insert at the start or the end of the section
        #[arg(short, long, value_parser = ["start", "end"])]
        position: Option<String>,
    },
    /// Create a note from a Markdown file
    Import { file: PathBuf },
    /// List all notes
    #[command(alias = "ls")]
    List,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (see `notelink config show`)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands must work even when the stored config is unusable
    if let Commands::Config { command } = &cli.command {
        init_logging(cli.verbose, "warn");
        return match command.clone() {
            Some(ConfigCommands::Show) | None => commands::config::show(&output),
            Some(ConfigCommands::Set { key, value }) => {
                commands::config::set(key, value, &output)
            }
        };
    }

    let config = Config::load()?;
    init_logging(cli.verbose, &config.log_level);
    let ctx = Context::open(config)?;

    let mut task = Box::pin(run(cli.command, &ctx, &output));
    tokio::select! {
        result = &mut task => return result,
        _ = tokio::signal::ctrl_c() => {}
    }

    // Dropping the export erases its temporary notes in the background
    drop(task);
    warn!("Interrupted, cleaning up");
    tokio::time::sleep(CLEANUP_GRACE).await;
    Err(ExportError::Cancelled.into())
}

async fn run(command: Commands, ctx: &Context, output: &Output) -> Result<()> {
    match command {
        Commands::Export { id, dir, flags } => {
            commands::export::export(ctx, id, &flags, dir, output).await
        }
        Commands::ExportAll {
            ids,
            dir,
            embed,
            sync,
        } => commands::export::export_all(ctx, &ids, dir, embed, sync, output).await,
        Commands::Sync { ids, dir } => commands::sync::sync(ctx, ids, dir, output).await,
        Commands::Unsync { id } => commands::sync::unsync(ctx, id, output).await,
        Commands::Outline { id } => commands::outline::show(ctx, id, output).await,
        Commands::Link {
            into,
            targets,
            section,
            position,
        } => {
            let position = position.map(|p| p.parse::<InsertPosition>().unwrap_or_default());
            commands::link::link(ctx, into, &targets, section, position, output).await
        }
        Commands::Import { file } => commands::import::import(ctx, &file, output).await,
        Commands::List => commands::list::list(ctx, output).await,
        Commands::Config { .. } => unreachable!(), // Handled in main
    }
}

/// Log to stderr; RUST_LOG wins over `--verbose` and the configured level
fn init_logging(verbose: bool, config_level: &str) {
    let level = if verbose { "debug" } else { config_level };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("notelink_core={},notelink_cli={}", level, level))
    });

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
