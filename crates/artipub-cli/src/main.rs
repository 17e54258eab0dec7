//! artipub CLI
//!
//! Command-line interface for the artipub publish pipeline

use artipub_core::errors::{ExError, ExErrorKind};
use artipub_core::logging_facility::{init, init_with_filter, Profile};
use clap::{Parser, Subcommand, ValueEnum};

mod commands;

/// Filter used when neither `--log-level` nor `RUST_LOG` is set
const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Parser)]
#[command(name = "artipub")]
#[command(about = "artipub - Idempotent artifact publishing", long_about = None)]
struct Cli {
    /// Log output format (logs go to stderr)
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Log filter: a level (`info`) or an EnvFilter directive
    #[arg(long, global = true, value_name = "FILTER")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one publish cycle
    Publish(commands::publish::PublishArgs),
    /// Inspect and re-export published snapshots
    Snapshot(commands::snapshot::SnapshotArgs),
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.log_format, cli.log_level.as_deref()) {
        eprintln!("Error: {}", e);
        std::process::exit(exit_code(&e));
    }

    let result = match cli.command {
        Commands::Publish(args) => commands::publish::execute(args),
        Commands::Snapshot(args) => commands::snapshot::execute(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        let code = e.downcast_ref::<ExError>().map_or(1, exit_code);
        std::process::exit(code);
    }
}

fn init_logging(format: LogFormat, level: Option<&str>) -> Result<(), ExError> {
    let profile = match format {
        LogFormat::Text => Profile::Development,
        LogFormat::Json => Profile::Production,
    };
    match level {
        Some(directive) => init_with_filter(profile, directive),
        None if std::env::var_os("RUST_LOG").is_some() => {
            init(profile);
            Ok(())
        }
        None => init_with_filter(profile, DEFAULT_LOG_LEVEL),
    }
}

/// Process exit status for an error kind
fn exit_code(err: &ExError) -> i32 {
    match err.kind() {
        ExErrorKind::InvalidInput
        | ExErrorKind::InvalidConfig
        | ExErrorKind::InvalidArtifactName
        | ExErrorKind::DuplicateArtifact => 2,
        ExErrorKind::PublishConflict | ExErrorKind::ConcurrentModification => 3,
        ExErrorKind::GeneratorTimeout => 4,
        ExErrorKind::GeneratorError => 5,
        ExErrorKind::StoreUnavailable => 6,
        _ => 1,
    }
}
