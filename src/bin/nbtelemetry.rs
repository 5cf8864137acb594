//! nbtelemetry CLI Binary
//!
//! Inspect exporter configuration and replay notebook activity against a
//! telemetry service.

use anyhow::{anyhow, Context};
use clap::Parser;
use nbtelemetry::cli::{map_error, Cli, RunContext};
use nbtelemetry::config::ConfigLoader;
use nbtelemetry::logging::{init_logging, LoggingConfig};
use std::process;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    // Build logging config from CLI args, env vars, and config file
    let logging_config = build_logging_config(&cli);

    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("nbtelemetry starting");

    match run(&cli) {
        Ok(output) => {
            info!("Command completed successfully");
            println!("{}", output);
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("{:#}", e);
            process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<String> {
    let context = RunContext::new(
        cli.workspace.clone(),
        cli.config.clone(),
        cli.service_url.clone(),
    )
    .map_err(|e| anyhow!(map_error(&e)))
    .context("Error initializing nbtelemetry")?;

    context
        .execute(&cli.command)
        .map_err(|e| anyhow!(map_error(&e)))
}

/// Build logging configuration from CLI args and config file.
/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let mut config = if let Some(ref config_path) = cli.config {
        ConfigLoader::load_from_file(config_path)
            .ok()
            .map(|c| c.logging)
            .unwrap_or_default()
    } else {
        ConfigLoader::load(&cli.workspace)
            .ok()
            .map(|c| c.logging)
            .unwrap_or_default()
    };

    if cli.verbose {
        config.level = "debug".to_string();
    }
    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        config.output = output.clone();
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_logging_config_default() {
        let temp = tempfile::tempdir().unwrap();
        let ws = temp.path().to_string_lossy();
        let cli = Cli::try_parse_from(["nbtelemetry", "--workspace", ws.as_ref(), "version"]).unwrap();
        let config = build_logging_config(&cli);
        assert_eq!(config.level, "info");
        assert_eq!(config.output, "stderr");
    }

    #[test]
    fn test_build_logging_config_verbose_then_explicit_level() {
        let temp = tempfile::tempdir().unwrap();
        let ws = temp.path().to_string_lossy();
        let cli = Cli::try_parse_from([
            "nbtelemetry",
            "--workspace",
            ws.as_ref(),
            "--verbose",
            "version",
        ])
        .unwrap();
        assert_eq!(build_logging_config(&cli).level, "debug");

        let cli = Cli::try_parse_from([
            "nbtelemetry",
            "--workspace",
            ws.as_ref(),
            "--verbose",
            "--log-level",
            "warn",
            "--log-format",
            "json",
            "version",
        ])
        .unwrap();
        let config = build_logging_config(&cli);
        assert_eq!(config.level, "warn");
        assert_eq!(config.format, "json");
    }

    #[test]
    fn test_replay_arguments_parse() {
        let cli = Cli::try_parse_from([
            "nbtelemetry",
            "--service-url",
            "http://127.0.0.1:9/telemetry",
            "replay",
            "--document",
            "doc.json",
            "--script",
            "steps.jsonl",
        ])
        .unwrap();
        assert_eq!(
            cli.service_url.as_deref(),
            Some("http://127.0.0.1:9/telemetry")
        );
        assert_eq!(nbtelemetry::cli::command_name(&cli.command), "replay");
    }
}
