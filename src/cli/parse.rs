//! CLI parse: clap types for nbtelemetry. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// nbtelemetry - notebook telemetry producer
#[derive(Parser)]
#[command(name = "nbtelemetry")]
#[command(about = "Capture notebook activity and export it to a telemetry service")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (for config/config.toml lookup)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Telemetry service base URL (overrides configuration)
    #[arg(long)]
    pub service_url: Option<String>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, both)
    #[arg(long)]
    pub log_output: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the exporters that would be active for a notebook
    Config {
        /// Notebook document (JSON seed) whose metadata may override exporters
        #[arg(long)]
        document: Option<PathBuf>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Print the telemetry service version
    Version,
    /// Replay scripted notebook activity through the full producer pipeline
    Replay {
        /// Notebook document (JSON seed) to open
        #[arg(long)]
        document: PathBuf,
        /// JSON-lines script of session actions
        #[arg(long)]
        script: PathBuf,
        /// How long to wait for in-flight publishes after the script ends
        #[arg(long, default_value = "5000")]
        settle_ms: u64,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}

/// Stable dotted name for logging.
pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Config { .. } => "config",
        Commands::Version => "version",
        Commands::Replay { .. } => "replay",
    }
}
