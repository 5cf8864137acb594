//! Exporter resolution against service config and notebook metadata.

use std::sync::Arc;

use nbtelemetry::telemetry::coordinator::Coordinator;
use nbtelemetry::telemetry::events::EventKind;
use nbtelemetry::telemetry::exporters::{Activation, ExporterConfig, ServiceConfig};
use nbtelemetry::telemetry::routing::bus::PublishBus;
use nbtelemetry::telemetry::session::memory::{DocumentSeed, MemorySession};
use nbtelemetry::transport::RecordingTransport;
use serde_json::json;

async fn resolve(config: ServiceConfig, seed: DocumentSeed) -> Vec<ExporterConfig> {
    let transport = Arc::new(RecordingTransport::new(config));
    let (bus, _reports) = PublishBus::new_pair();
    let coordinator = Coordinator::new(transport, bus);
    let session = MemorySession::new(seed);
    coordinator.load_exporters(&session).await.unwrap();
    coordinator.exporters()
}

fn service_response(body: serde_json::Value) -> ServiceConfig {
    serde_json::from_value(body).unwrap()
}

#[tokio::test]
async fn exporters_without_activations_inherit_global_events() {
    let config = service_response(json!({
        "activeEvents": [{"name": "CellExecuteEvent", "logWholeNotebook": true}],
        "exporters": [
            {"type": "console_exporter"},
            {"type": "file_exporter", "args": {"path": "log"}, "activeEvents": [{"name": "NotebookSaveEvent"}]}
        ]
    }));
    let exporters = resolve(config, DocumentSeed::new("a.ipynb")).await;

    assert_eq!(exporters.len(), 2);
    let console = exporters[0].activation_for(EventKind::CellExecute).unwrap();
    assert!(console.log_whole_document);
    assert!(exporters[1].activation_for(EventKind::CellExecute).is_none());
    assert!(!exporters[1]
        .activation_for(EventKind::DocumentSave)
        .unwrap()
        .log_whole_document);
}

#[tokio::test]
async fn exporters_without_activations_are_dropped_when_global_set_is_empty() {
    for active in [json!(null), json!([])] {
        let config = service_response(json!({
            "activeEvents": active,
            "exporters": [
                {"type": "console_exporter"},
                {"type": "s3_exporter", "activeEvents": [{"name": "CellAddEvent"}]}
            ]
        }));
        let exporters = resolve(config, DocumentSeed::new("b.ipynb")).await;
        assert_eq!(exporters.len(), 1);
        assert_eq!(exporters[0].target, "s3_exporter");
    }
}

#[tokio::test]
async fn document_metadata_replaces_the_global_list() {
    let config = ServiceConfig {
        active_events: Some(vec![Activation::new(EventKind::CellAdd, false)]),
        exporters: vec![
            ExporterConfig::new("console_exporter"),
            ExporterConfig::new("command_line_exporter"),
        ],
    };
    let seed = DocumentSeed::new("c.ipynb").with_metadata(
        "exporters",
        json!([{"type": "remote_exporter", "args": {"id": "course-1", "url": "https://collector"}}]),
    );
    let exporters = resolve(config, seed).await;

    assert_eq!(exporters.len(), 1);
    assert_eq!(exporters[0].label(), "course-1");
    assert!(exporters[0].activation_for(EventKind::CellAdd).is_some());
}

#[tokio::test]
async fn malformed_document_override_keeps_global_list() {
    let config = ServiceConfig {
        active_events: Some(vec![Activation::new(EventKind::CellAdd, false)]),
        exporters: vec![ExporterConfig::new("console_exporter")],
    };
    let seed = DocumentSeed::new("d.ipynb").with_metadata("exporters", json!({"type": "nope"}));
    let exporters = resolve(config, seed).await;
    assert_eq!(exporters.len(), 1);
    assert_eq!(exporters[0].target, "console_exporter");
}

#[tokio::test]
async fn unknown_event_names_never_match() {
    let config = service_response(json!({
        "activeEvents": null,
        "exporters": [{"type": "console_exporter", "activeEvents": [{"name": "CellMoveEvent"}]}]
    }));
    let exporters = resolve(config, DocumentSeed::new("e.ipynb")).await;
    assert_eq!(exporters.len(), 1);
    assert!(EventKind::ALL
        .iter()
        .all(|kind| exporters[0].activation_for(*kind).is_none()));
}
