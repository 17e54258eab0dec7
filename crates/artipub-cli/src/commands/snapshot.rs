//! Snapshot inspection commands

use artipub_core::diff::{compute_diff, render_human_summary};
use artipub_core::store::SnapshotStore;
use clap::{Args, Subcommand};
use serde::Serialize;

use super::store_args::StoreArgs;

#[derive(Debug, Args)]
pub struct SnapshotArgs {
    #[command(subcommand)]
    pub command: SnapshotCommand,
}

#[derive(Debug, Subcommand)]
pub enum SnapshotCommand {
    /// Show one snapshot and its artifacts
    Show(ShowArgs),
    /// List committed revisions, newest first
    List(ListArgs),
    /// Compare two revisions
    Diff(DiffArgs),
    /// Re-materialize the current file tree from the ledger
    Export(ExportArgs),
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Revision to show (defaults to the current one)
    #[arg(long, value_name = "N")]
    pub revision: Option<u64>,

    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct DiffArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Old revision
    pub from: u64,

    /// New revision
    pub to: u64,

    /// Print a Markdown summary instead of one line per change
    #[arg(long)]
    pub summary: bool,

    #[arg(long, conflicts_with = "summary")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub store: StoreArgs,
}

pub fn execute(args: SnapshotArgs) -> Result<(), Box<dyn std::error::Error>> {
    match args.command {
        SnapshotCommand::Show(show_args) => execute_show(show_args),
        SnapshotCommand::List(list_args) => execute_list(list_args),
        SnapshotCommand::Diff(diff_args) => execute_diff(diff_args),
        SnapshotCommand::Export(export_args) => execute_export(export_args),
    }
}

#[derive(Serialize)]
struct ShowOutput {
    #[serde(flatten)]
    summary: artipub_core::model::SnapshotSummary,
    artifacts: Vec<artipub_core::model::ArtifactEntry>,
}

fn execute_show(args: ShowArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = args.store.open_store()?;
    let snapshot = match args.revision {
        Some(revision) => store.snapshot_at(revision)?,
        None => store.current()?,
    };

    let output = ShowOutput {
        summary: snapshot.summary(),
        artifacts: snapshot.entries(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Snapshot {}:", output.summary.revision);
    match output.summary.parent_revision {
        Some(parent) => println!("  parent_revision: {}", parent),
        None => println!("  parent_revision: (none)"),
    }
    println!("  created_at: {}", output.summary.created_at.to_rfc3339());
    println!("  set_digest: {}", output.summary.set_digest);
    println!(
        "  artifacts: {} ({} bytes)",
        output.summary.artifact_count, output.summary.total_bytes
    );
    for entry in &output.artifacts {
        println!("    {}  {:>10}  {}", entry.digest, entry.size_bytes, entry.name);
    }

    Ok(())
}

fn execute_list(args: ListArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = args.store.open_store()?;
    let history = store.history(args.limit)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }

    if history.is_empty() {
        println!("No revisions");
        return Ok(());
    }
    for summary in &history {
        println!(
            "{:>6}  {}  {:>4} artifacts  {}",
            summary.revision,
            summary.created_at.to_rfc3339(),
            summary.artifact_count,
            summary.set_digest
        );
    }

    Ok(())
}

fn execute_diff(args: DiffArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = args.store.open_store()?;
    let old = store.snapshot_at(args.from)?;
    let new = store.snapshot_at(args.to)?;
    let changes = compute_diff(old.artifacts(), new.artifacts());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&changes)?);
    } else if args.summary {
        print!("{}", render_human_summary(&changes));
    } else if changes.is_empty() {
        println!("No changes between {} and {}", args.from, args.to);
    } else {
        for record in &changes {
            println!("{} {}", record.kind.as_str(), record.name);
        }
    }

    Ok(())
}

fn execute_export(args: ExportArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = args.store.open_store()?;
    let head = store.export_current()?;

    if head.is_genesis() {
        println!("Nothing to export (no revisions)");
    } else {
        println!(
            "Exported revision {} to {}",
            head.revision(),
            store.current_dir().display()
        );
    }

    Ok(())
}
