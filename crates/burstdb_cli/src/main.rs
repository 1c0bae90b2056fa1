//! BurstDB CLI
//!
//! Command-line tools for BurstDB directories.
//!
//! # Commands
//!
//! - `inspect` - List bursts and snapshots and the recoverable id range
//! - `verify` - Check every frame of every burst and snapshot
//! - `dump` - Print the frames of one burst or snapshot
//! - `prune` - Remove history made redundant by a snapshot

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// BurstDB command-line database tools.
#[derive(Parser)]
#[command(name = "burstdb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the database directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List bursts, snapshots and the recoverable id range
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Verify every burst and snapshot
    Verify,

    /// Print the frames of one burst or snapshot
    Dump {
        /// Blob name, e.g. burst-1-10.bdb
        #[arg(short, long)]
        name: String,

        /// Maximum number of frames to print
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Remove bursts and snapshots made redundant by a snapshot
    Prune {
        /// Anchor on the newest snapshot with an id at or below this one
        #[arg(short, long)]
        through: u64,

        /// Dry run - show what would be removed
        #[arg(short, long)]
        dry_run: bool,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Inspect { format } => {
            let path = cli.path.ok_or("Database path required for inspect")?;
            commands::inspect::run(&path, &format)?;
        }
        Commands::Verify => {
            let path = cli.path.ok_or("Database path required for verify")?;
            commands::verify::run(&path)?;
        }
        Commands::Dump {
            name,
            limit,
            format,
        } => {
            let path = cli.path.ok_or("Database path required for dump")?;
            commands::dump::run(&path, &name, limit, &format)?;
        }
        Commands::Prune { through, dry_run } => {
            let path = cli.path.ok_or("Database path required for prune")?;
            commands::prune::run(&path, through, dry_run)?;
        }
        Commands::Version => {
            println!("BurstDB CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
