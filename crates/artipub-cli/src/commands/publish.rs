//! Publish command

use std::path::PathBuf;
use std::sync::Arc;

use artipub_core::diff::render_human_summary;
use artipub_engine::config::{validate_config, GeneratorSection, PublishConfigV0};
use artipub_engine::{PublishCoordinator, PublishOptions, PublishResult};
use artipub_store::SqliteSnapshotStore;
use clap::Args;

use super::store_args::{absolutize, StoreArgs};

#[derive(Debug, Args)]
pub struct PublishArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Publish the files under DIR
    #[arg(long, value_name = "DIR", conflicts_with = "command")]
    pub from_dir: Option<PathBuf>,

    /// Report what would change without committing
    #[arg(long)]
    pub dry_run: bool,

    /// Publish cycles to attempt before giving up on conflicts
    #[arg(long, value_name = "N")]
    pub max_attempts: Option<u32>,

    /// Deadline for one generator run
    #[arg(long, value_name = "N")]
    pub generator_timeout_secs: Option<u64>,

    /// Print a Markdown summary of the changes
    #[arg(long)]
    pub summary: bool,

    /// Print the outcome as JSON
    #[arg(long, conflicts_with = "summary")]
    pub json: bool,

    /// Generator program and its arguments
    #[arg(last = true, value_name = "PROGRAM")]
    pub command: Vec<String>,
}

pub fn execute(args: PublishArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(&args)?;

    let generator = config.build_generator()?;
    let store = Arc::new(SqliteSnapshotStore::open(
        config.store_root(),
        config.store_options(),
    )?);
    let options = PublishOptions {
        retry: config.retry_policy(),
        generator_timeout: config.generator_timeout(),
        dry_run: args.dry_run,
    };

    let outcome = PublishCoordinator::new(store, generator)
        .with_options(options)
        .run()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    print_outcome(&outcome);
    if args.summary {
        if let Some(changes) = outcome.changes() {
            println!();
            print!("{}", render_human_summary(changes));
        }
    }

    Ok(())
}

/// Config file with command-line overrides applied
fn resolve_config(args: &PublishArgs) -> artipub_core::errors::Result<PublishConfigV0> {
    let mut config = args.store.load_config()?;

    let timeout_secs = config.generator.as_ref().map(|g| g.timeout_secs);
    let cli_generator = if let Some(dir) = &args.from_dir {
        Some(GeneratorSection::directory(absolutize(dir)?))
    } else if let Some((program, rest)) = args.command.split_first() {
        Some(GeneratorSection::command(program.clone(), rest.to_vec()))
    } else {
        None
    };
    if let Some(mut section) = cli_generator {
        if let Some(secs) = timeout_secs {
            section.timeout_secs = secs;
        }
        config.generator = Some(section);
    }

    if let Some(max_attempts) = args.max_attempts {
        config.retry.max_attempts = max_attempts;
    }
    if let (Some(secs), Some(section)) = (args.generator_timeout_secs, config.generator.as_mut()) {
        section.timeout_secs = secs;
    }

    validate_config(&config)?;
    Ok(config)
}

fn print_outcome(outcome: &PublishResult) {
    match outcome {
        PublishResult::Published(receipt) => {
            let counts = receipt.changes.counts();
            println!("Published revision {}:", receipt.revision);
            println!("  parent_revision: {}", receipt.parent_revision);
            println!("  set_digest: {}", receipt.set_digest);
            println!(
                "  changes: {} ({} added, {} removed, {} modified)",
                counts.total(),
                counts.added,
                counts.removed,
                counts.modified
            );
            println!("  attempts: {}", receipt.attempts);
            println!("  run_id: {}", receipt.run_id);
        }
        PublishResult::NoChange { revision } => {
            println!("No changes (revision {})", revision);
        }
        PublishResult::WouldPublish {
            base_revision,
            changes,
        } => {
            println!("Dry run (no commit):");
            println!("  base_revision: {}", base_revision);
            for record in changes {
                println!("  {} {}", record.kind.as_str(), record.name);
            }
        }
    }
}
