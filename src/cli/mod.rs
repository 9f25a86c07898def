use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use crate::config::Config;

pub mod commands;

#[derive(Parser)]
#[command(
    name = "losscoach",
    about = "Educational loss-review pipeline for stock trades",
    version = "0.1.0"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full loss review over a trade description
    Analyze {
        /// JSON file with the trade description; reads stdin when omitted
        file: Option<PathBuf>,

        /// Score the finished run against the metric targets
        #[arg(long)]
        metrics: bool,
    },

    /// Check that the local model runtime is reachable
    Health,
}

pub async fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Analyze { file, metrics } => {
            info!("Running loss review");
            commands::analyze(config, file, metrics).await?;
        }
        Commands::Health => {
            commands::health(config).await?;
        }
    }
    Ok(())
}
