//! CLI route: single route table and run context. Dispatches to the pipeline and presentation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::runtime::Runtime;
use tracing::{info, warn};

use crate::cli::parse::{command_name, Commands};
use crate::cli::presentation::{
    format_exporters_json, format_exporters_text, format_replay_summary_json,
    format_replay_summary_text,
};
use crate::cli::replay::{parse_script, run_replay};
use crate::config::{ConfigLoader, NbTelemetryConfig};
use crate::error::TelemetryError;
use crate::telemetry::coordinator::Coordinator;
use crate::telemetry::pipeline::Pipeline;
use crate::telemetry::routing::bus::PublishBus;
use crate::telemetry::session::memory::{DocumentSeed, MemorySession};
use crate::transport::{HttpTransport, Transport};

/// Runtime context for CLI execution: resolved config, transport and async runtime.
pub struct RunContext {
    config: NbTelemetryConfig,
    transport: Arc<dyn Transport>,
    runtime: Runtime,
}

impl RunContext {
    /// Load configuration, apply the `--service-url` override and connect over HTTP.
    pub fn new(
        workspace_root: PathBuf,
        config_path: Option<PathBuf>,
        service_url: Option<String>,
    ) -> Result<Self, TelemetryError> {
        let mut config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        if let Some(url) = service_url {
            config.service.base_url = url;
            config = config.validated()?;
        }
        let transport = Arc::new(HttpTransport::new(&config.service)?);
        info!(service = %transport.base_url(), "using telemetry service");
        Self::with_transport(config, transport)
    }

    /// Build a context around an existing transport.
    pub fn with_transport(
        config: NbTelemetryConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, TelemetryError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            config,
            transport,
            runtime,
        })
    }

    pub fn config(&self) -> &NbTelemetryConfig {
        &self.config
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, TelemetryError> {
        let started = Instant::now();
        let result = match command {
            Commands::Config { document, format } => {
                self.handle_config(document.as_deref(), format)
            }
            Commands::Version => self.runtime.block_on(self.transport.fetch_version()),
            Commands::Replay {
                document,
                script,
                settle_ms,
                format,
            } => self.handle_replay(document, script, *settle_ms, format),
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => info!(command = command_name(command), elapsed_ms, "command finished"),
            Err(e) => warn!(command = command_name(command), elapsed_ms, error = %e, "command failed"),
        }
        result
    }

    fn handle_config(&self, document: Option<&Path>, format: &str) -> Result<String, TelemetryError> {
        let seed = match document {
            Some(path) => DocumentSeed::from_file(path)?,
            None => DocumentSeed::new("untitled.ipynb"),
        };
        let session = MemorySession::new(seed);
        let (bus, _reports) = PublishBus::new_pair();
        let coordinator = Coordinator::new(Arc::clone(&self.transport), bus);
        self.runtime.block_on(coordinator.load_exporters(&session))?;
        let exporters = coordinator.exporters();
        match format {
            "json" => Ok(format_exporters_json(&exporters)),
            "text" => Ok(format_exporters_text(&exporters)),
            other => Err(invalid_format(other)),
        }
    }

    fn handle_replay(
        &self,
        document: &Path,
        script: &Path,
        settle_ms: u64,
        format: &str,
    ) -> Result<String, TelemetryError> {
        if format != "json" && format != "text" {
            return Err(invalid_format(format));
        }
        let seed = DocumentSeed::from_file(document)?;
        let steps = parse_script(&std::fs::read_to_string(script)?)?;
        let pipeline = Pipeline::new(Arc::clone(&self.transport), self.config.producers.clone());
        let summary = self.runtime.block_on(run_replay(
            &pipeline,
            seed,
            &steps,
            Duration::from_millis(self.config.producers.scroll_debounce_ms),
            Duration::from_millis(settle_ms),
        ))?;
        Ok(if format == "json" {
            format_replay_summary_json(&summary)
        } else {
            format_replay_summary_text(&summary)
        })
    }
}

fn invalid_format(format: &str) -> TelemetryError {
    TelemetryError::ConfigError(format!(
        "Invalid output format: {} (must be 'text' or 'json')",
        format
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::events::EventKind;
    use crate::telemetry::exporters::{Activation, ExporterConfig, ServiceConfig};
    use crate::transport::RecordingTransport;
    use serde_json::Value;
    use tempfile::TempDir;

    fn context(transport: Arc<RecordingTransport>) -> RunContext {
        RunContext::with_transport(NbTelemetryConfig::default(), transport).unwrap()
    }

    fn service_config() -> ServiceConfig {
        ServiceConfig {
            active_events: Some(vec![Activation::new(EventKind::CellAdd, false)]),
            exporters: vec![ExporterConfig::new("console_exporter")],
        }
    }

    #[test]
    fn config_command_applies_document_override() {
        let temp = TempDir::new().unwrap();
        let doc = temp.path().join("doc.json");
        std::fs::write(
            &doc,
            r#"{
  "path": "doc.ipynb",
  "metadata": {
    "exporters": [
      {"type": "s3_exporter", "activeEvents": [{"name": "NotebookSaveEvent", "logWholeNotebook": true}]}
    ]
  }
}"#,
        )
        .unwrap();

        let ctx = context(Arc::new(RecordingTransport::new(service_config())));
        let out = ctx
            .execute(&Commands::Config {
                document: Some(doc),
                format: "json".to_string(),
            })
            .unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        let exporters = value["exporters"].as_array().unwrap();
        assert_eq!(exporters.len(), 1);
        assert_eq!(exporters[0]["type"], "s3_exporter");
        assert_eq!(exporters[0]["activeEvents"][0]["logWholeDocument"], true);
    }

    #[test]
    fn version_command_returns_service_version() {
        let ctx = context(Arc::new(RecordingTransport::new(service_config())));
        let out = ctx.execute(&Commands::Version).unwrap();
        assert_eq!(out, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn replay_command_exports_scripted_events() {
        let temp = TempDir::new().unwrap();
        let doc = temp.path().join("doc.json");
        let script = temp.path().join("script.jsonl");
        std::fs::write(&doc, r#"{"path": "replay.ipynb", "cells": [{"id": "a", "source": "1"}]}"#)
            .unwrap();
        std::fs::write(
            &script,
            "{\"op\": \"insert_cell\", \"index\": 1, \"source\": \"2\"}\n{\"op\": \"insert_cell\", \"index\": 0}\n",
        )
        .unwrap();

        let transport = Arc::new(RecordingTransport::new(service_config()));
        let ctx = context(transport.clone());
        let out = ctx
            .execute(&Commands::Replay {
                document: doc,
                script,
                settle_ms: 5000,
                format: "json".to_string(),
            })
            .unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["steps"], 2);
        assert_eq!(value["publishes"], 2);
        assert_eq!(transport.requests_for("CellAddEvent").len(), 2);
    }

    #[test]
    fn unknown_output_format_is_rejected() {
        let ctx = context(Arc::new(RecordingTransport::new(service_config())));
        let err = ctx
            .execute(&Commands::Config {
                document: None,
                format: "yaml".to_string(),
            })
            .unwrap_err();
        assert!(err.to_string().contains("yaml"));
    }
}
