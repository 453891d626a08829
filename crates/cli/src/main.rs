//! Tickwatch CLI - tw command

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;
mod config;

/// Tickwatch - polling file change watcher
#[derive(Parser)]
#[command(name = "tw")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (TOML, `[watcher]` table)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch files or directories and print change events
    Watch {
        /// Files or directories to watch
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,
        /// File poll interval in milliseconds (overrides config)
        #[arg(long)]
        interval_ms: Option<u64>,
        /// Directory poll interval in milliseconds (overrides config)
        #[arg(long)]
        dir_interval_ms: Option<u64>,
        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so event output stays machine-readable
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let base = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Watch { paths, recursive, interval_ms, dir_interval_ms, json } => {
            let config = config::with_overrides(base, interval_ms, dir_interval_ms)?;
            cmd::watch::run(&paths, recursive, config, json).await
        }
        Commands::Config => cmd::config::run(&base),
    }
}
