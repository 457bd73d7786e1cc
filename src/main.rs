use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, TimeZone, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use migration_lib::{
    EvernoteDb, IdentifierIndex, Layout, Migration, MigrationOptions, NoteMover, Settings,
};

#[derive(Parser)]
#[command(name = "evernote-migration", about = "Evernote exports migration", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// More logs (same as RUST_LOG=debug)
    #[arg(long, short, global = true)]
    verbose: bool,

    /// YAML settings file (notebook layout)
    #[arg(long, global = true, env = "EVERNOTE_MIGRATION_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Standardize a notebook exported one folder per note
    Migrate(MigrateArgs),

    /// Move the notes updated after a date to another folder
    Move(MoveArgs),
}

#[derive(Args)]
struct MigrateArgs {
    /// Folder where the notes are located
    #[arg(long)]
    folder: PathBuf,

    /// Name of the migration report
    #[arg(long)]
    report: Option<PathBuf>,

    /// Path to the Evernote local database
    #[arg(long)]
    evernote_db: Option<PathBuf>,

    /// Keep the original notes folders
    #[arg(long)]
    keep: bool,

    /// Ignore duplicate note names (will overwrite existing notes)
    #[arg(long)]
    overwrite: bool,

    /// Generate a report without migrating notes (requires --report)
    #[arg(long, requires = "report")]
    report_only: bool,
}

#[derive(Args)]
struct MoveArgs {
    /// Folder where the notes are located
    #[arg(long)]
    folder: PathBuf,

    /// Destination folder where to move the notes
    #[arg(long)]
    dest: PathBuf,

    /// Migration report listing the notes
    #[arg(long)]
    report: PathBuf,

    /// Date of update (YYYY-MM-DD) from which notes are moved (inclusive)
    #[arg(long, value_parser = parse_date)]
    date_updated: Option<NaiveDate>,
}

fn parse_date(value: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| format!("Failed to parse {} ({})", value, e))
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // Also installs the `log` bridge used by the library
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_layout(config: Option<&PathBuf>) -> Result<Layout> {
    match config {
        Some(path) => Ok(Settings::load(path)
            .with_context(|| format!("Failed to load settings {}", path.display()))?
            .layout),
        None => Ok(Layout::default()),
    }
}

fn migrate(args: MigrateArgs, layout: Layout) -> Result<()> {
    if !args.folder.is_dir() {
        bail!("Notebook folder {} does not exist", args.folder.display());
    }

    let mut options = MigrationOptions::new(&args.folder)
        .report_only(args.report_only)
        .keep(args.keep)
        .overwrite(args.overwrite)
        .with_layout(layout);
    if let Some(report) = args.report {
        options = options.with_report(report);
    }

    let index = match &args.evernote_db {
        Some(path) => Some(IdentifierIndex::new(
            EvernoteDb::open(path)
                .with_context(|| format!("Failed to open Evernote database {}", path.display()))?,
        )),
        None => None,
    };

    let summary = Migration::new(options, index)
        .process()
        .context("Migration failed")?;
    log::info!(
        "Done: {} notes, {} attachments, {} links rewritten, {} backlinks",
        summary.notes,
        summary.attachments,
        summary.links_rewritten,
        summary.backlinks
    );
    Ok(())
}

fn move_notes(args: MoveArgs, layout: Layout) -> Result<()> {
    let date_updated = args
        .date_updated
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive));

    NoteMover::new(&args.folder, &args.dest, &args.report)
        .updated_since(date_updated)
        .with_layout(layout)
        .process()
        .context("Move failed")?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let layout = load_layout(cli.config.as_ref())?;
    match cli.command {
        Commands::Migrate(args) => migrate(args, layout),
        Commands::Move(args) => move_notes(args, layout),
    }
}
