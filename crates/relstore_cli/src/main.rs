//! RelStore CLI
//!
//! Runs JSON scripts against an in-memory store.
//!
//! # Commands
//!
//! - `run` - Register collections, apply operations and print the result
//! - `check` - Run a script and verify index consistency afterwards
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// RelStore command-line tools.
#[derive(Parser)]
#[command(name = "relstore")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a script and print every collection and the statistics
    Run {
        /// Path to the JSON script
        script: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Record failing operations and continue
        #[arg(short, long)]
        keep_going: bool,
    },

    /// Run a script and verify the store afterwards
    Check {
        /// Path to the JSON script
        script: PathBuf,
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
        Commands::Run {
            script,
            format,
            keep_going,
        } => {
            commands::run::run(&script, &format, keep_going)?;
        }
        Commands::Check { script } => {
            commands::check::run(&script)?;
        }
        Commands::Version => {
            println!("RelStore CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("RelStore Core v{}", relstore_core::VERSION);
        }
    }

    Ok(())
}
