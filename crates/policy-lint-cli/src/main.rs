//! policy-lint CLI tool.
//!
//! Usage:
//! ```bash
//! policy-lint check [OPTIONS] [PATHS]...
//! policy-lint list-rules
//! policy-lint init
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config_resolver;

/// Coding-policy linter over C++ syntax tree dumps
#[derive(Parser)]
#[command(name = "policy-lint")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run lint checks
    Check(commands::check::CheckArgs),

    /// List available rules
    ListRules,

    /// Initialize configuration file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

/// Output format for lint results.
#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output.
    Json,
    /// One-line-per-diagnostic compact format.
    Compact,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Check(args) => {
            let project = std::env::current_dir()?;
            let source = config_resolver::resolve(&project, cli.config.as_deref());
            let failed = commands::check::run(&args, &source)?;
            if failed {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::ListRules => {
            commands::list_rules::run();
            Ok(())
        }
        Commands::Init { force } => commands::init::run(force),
    }
}
