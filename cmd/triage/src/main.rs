//! triage - cluster unbound alerts and check incoming alerts for duplicates.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{ClustersCommand, DedupCommand};

/// Alert triage tool.
///
/// Loads an alert dump (JSON array) named by the config file and runs
/// density-based clustering or duplicate detection over it.
#[derive(Parser)]
#[command(name = "triage")]
#[command(about = "Cluster security alerts and detect duplicates")]
#[command(version)]
pub struct Cli {
    /// Config file (YAML). Defaults apply when omitted.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Cluster unbound alerts and print the summary
    Clusters(ClustersCommand),
    /// Check whether an alert duplicates a recent unbound alert
    Dedup(DedupCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cfg = config::load(cli.config.as_deref())?;

    match &cli.command {
        Commands::Clusters(cmd) => cmd.run(&cfg).await,
        Commands::Dedup(cmd) => cmd.run(&cfg).await,
    }
}
