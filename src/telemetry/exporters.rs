//! Exporter descriptors and the global/per-document resolution rule.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::telemetry::events::EventKind;

/// Notebook metadata key whose value replaces the service's exporter list.
pub const EXPORTERS_METADATA_KEY: &str = "exporters";

/// Pairing of an event name with whether the whole document rides along.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activation {
    pub name: String,
    #[serde(rename = "logWholeDocument", alias = "logWholeNotebook", default)]
    pub log_whole_document: bool,
}

impl Activation {
    pub fn new(kind: EventKind, log_whole_document: bool) -> Self {
        Self {
            name: kind.as_str().to_string(),
            log_whole_document,
        }
    }

    /// `None` for names outside the known event set; those never match.
    pub fn kind(&self) -> Option<EventKind> {
        self.name.parse().ok()
    }
}

/// Declarative sink description. Interpreted by the telemetry service, not by this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExporterConfig {
    #[serde(rename = "type", alias = "target")]
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
    #[serde(
        rename = "activeEvents",
        alias = "activations",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub activations: Option<Vec<Activation>>,
}

impl ExporterConfig {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            args: None,
            activations: None,
        }
    }

    pub fn with_args(mut self, args: Value) -> Self {
        self.args = Some(args);
        self
    }

    pub fn with_activations(mut self, activations: Vec<Activation>) -> Self {
        self.activations = Some(activations);
        self
    }

    /// Activation entry for `kind`, if this exporter wants that event.
    pub fn activation_for(&self, kind: EventKind) -> Option<&Activation> {
        self.activations
            .as_deref()?
            .iter()
            .find(|activation| activation.kind() == Some(kind))
    }

    fn has_activations(&self) -> bool {
        self.activations.as_ref().is_some_and(|a| !a.is_empty())
    }

    /// Human-facing name: `args.id` when present, otherwise the exporter type.
    pub fn label(&self) -> String {
        self.args
            .as_ref()
            .and_then(|args| args.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| self.target.clone())
    }
}

/// Payload of `GET /config`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(rename = "activeEvents", default)]
    pub active_events: Option<Vec<Activation>>,
    #[serde(default)]
    pub exporters: Vec<ExporterConfig>,
}

/// Parse the per-document exporter override from notebook metadata.
///
/// A value that is not a list of exporters is ignored with a warning and the
/// global list stays in effect.
pub fn document_override(metadata: Option<Value>) -> Option<Vec<ExporterConfig>> {
    let value = metadata?;
    match serde_json::from_value::<Vec<ExporterConfig>>(value) {
        Ok(exporters) => Some(exporters),
        Err(err) => {
            warn!(error = %err, "ignoring malformed notebook exporter override");
            None
        }
    }
}

/// Resolve the effective exporter list for one session.
///
/// A document override replaces the global list wholesale. Exporters without
/// their own activations inherit the global `activeEvents`, or are dropped
/// when that set is empty.
pub fn resolve_exporters(
    global: ServiceConfig,
    document: Option<Vec<ExporterConfig>>,
) -> Vec<ExporterConfig> {
    let default_activations = global.active_events.unwrap_or_default();
    let candidates = document.unwrap_or(global.exporters);

    candidates
        .into_iter()
        .filter_map(|mut exporter| {
            if exporter.has_activations() {
                return Some(exporter);
            }
            if default_activations.is_empty() {
                debug!(exporter = %exporter.label(), "dropping exporter without active events");
                return None;
            }
            exporter.activations = Some(default_activations.clone());
            Some(exporter)
        })
        .collect()
}
