//! End-to-end flows: session signals through producers, coordinator and transport.

use std::sync::Arc;
use std::time::Duration;

use nbtelemetry::config::ProducerSettings;
use nbtelemetry::telemetry::coordinator::Coordinator;
use nbtelemetry::telemetry::events::{Event, EventInfo, EventKind, KernelError, TextChange};
use nbtelemetry::telemetry::exporters::{Activation, ExporterConfig};
use nbtelemetry::telemetry::pipeline::Pipeline;
use nbtelemetry::telemetry::producers::ProducerRegistry;
use nbtelemetry::telemetry::routing::bus::{PublishBus, PublishOutcome};
use nbtelemetry::telemetry::session::memory::{CellSeed, DocumentSeed, MemorySession};
use nbtelemetry::telemetry::session::{ClipboardAction, SaveState, Session};
use nbtelemetry::transport::RecordingTransport;
use serde_json::Value;

use super::test_utils::{every_event, service_with, start};

fn two_cells(path: &str) -> DocumentSeed {
    DocumentSeed::new(path)
        .with_cell(CellSeed::code("import os").with_id("a"))
        .with_cell(CellSeed::code("os.getcwd()").with_id("b"))
}

#[tokio::test]
async fn session_lifecycle_exports_each_activated_event() {
    let mut run = start(
        two_cells("lifecycle.ipynb"),
        service_with(
            vec![ExporterConfig::new("console_exporter")],
            every_event(false),
        ),
    )
    .await;

    let session = &run.session;
    session.mark_ready();
    session.activate(1).unwrap();
    session
        .execute(
            "b",
            false,
            Some(KernelError {
                error_name: "NameError".to_string(),
                error_value: "name 'os' is not defined".to_string(),
            }),
        )
        .unwrap();
    session.clipboard(ClipboardAction::Copy, "os.getcwd");
    session.set_hidden(true);
    session.set_hidden(false);
    session.save(SaveState::Started);
    session.save(SaveState::Completed);
    session.remove_cell(0).unwrap();
    run.finish().await;

    let t = &run.transport;
    for name in [
        "NotebookOpenEvent",
        "ActiveCellChangeEvent",
        "CellExecuteEvent",
        "ClipboardCopyEvent",
        "NotebookHiddenEvent",
        "NotebookVisibleEvent",
        "NotebookSaveEvent",
        "CellRemoveEvent",
    ] {
        assert_eq!(t.requests_for(name).len(), 1, "expected one {name}");
    }
    assert_eq!(t.requests_for("CellEditEvent").len(), 2);

    let execute = &t.requests_for("CellExecuteEvent")[0]["eventDetail"]["eventInfo"];
    assert_eq!(execute["success"], false);
    assert_eq!(execute["kernelError"]["errorName"], "NameError");

    let clip = &t.requests_for("ClipboardCopyEvent")[0]["eventDetail"]["eventInfo"];
    assert_eq!(clip["selection"], "os.getcwd");

    let removed = &t.requests_for("CellRemoveEvent")[0]["eventDetail"]["eventInfo"];
    assert_eq!(removed["cells"][0]["index"], 0);

    let open = &t.requests_for("NotebookOpenEvent")[0];
    assert_eq!(open["eventDetail"]["eventInfo"]["environ"]["JUPYTERHUB_USER"], "local");
    assert_eq!(open["notebookState"]["notebookPath"], "lifecycle.ipynb");
    assert!(open["notebookState"]["sessionID"].is_string());
}

#[tokio::test]
async fn open_is_published_once_per_coordinator() {
    let transport = Arc::new(RecordingTransport::new(service_with(
        vec![ExporterConfig::new("console_exporter")],
        vec![Activation::new(EventKind::DocumentOpen, false)],
    )));
    let session = Arc::new(MemorySession::new(two_cells("open.ipynb")));
    let dyn_session: Arc<dyn Session> = session.clone();
    let (bus, mut reports) = PublishBus::new_pair();
    let coordinator = Arc::new(Coordinator::new(transport.clone(), bus));
    coordinator.load_exporters(dyn_session.as_ref()).await.unwrap();

    let registry = ProducerRegistry::standard(&ProducerSettings::default());
    registry.listen_all(&dyn_session, &coordinator).unwrap();
    registry.listen_all(&dyn_session, &coordinator).unwrap();
    session.mark_ready();

    let report = tokio::time::timeout(Duration::from_secs(5), reports.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.event, EventKind::DocumentOpen);
    tokio::time::sleep(Duration::from_millis(100)).await;
    registry.listen_all(&dyn_session, &coordinator).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(transport.requests_for("NotebookOpenEvent").len(), 1);
    assert_eq!(coordinator.bus().dispatched(), 1);
}

#[tokio::test]
async fn whole_document_follows_the_activation_flag() {
    let mut run = start(
        two_cells("content.ipynb"),
        service_with(
            vec![
                ExporterConfig::new("full_exporter").with_activations(vec![Activation::new(
                    EventKind::CellAdd,
                    true,
                )]),
                ExporterConfig::new("light_exporter").with_activations(vec![Activation::new(
                    EventKind::CellAdd,
                    false,
                )]),
            ],
            Vec::new(),
        ),
    )
    .await;

    run.session.insert_cell(2, Some("c".to_string()), "print('hi')").unwrap();
    run.finish().await;

    let bodies = run.transport.requests_for("CellAddEvent");
    assert_eq!(bodies.len(), 2);
    let by_type = |target: &str| -> Value {
        bodies
            .iter()
            .find(|b| b["exporter"]["type"] == target)
            .unwrap()
            .clone()
    };
    let full = by_type("full_exporter");
    assert_eq!(full["notebookState"]["notebookContent"]["cells"][2]["source"], "print('hi')");
    assert_eq!(by_type("light_exporter")["notebookState"]["notebookContent"], Value::Null);
}

#[tokio::test]
async fn transport_failure_is_contained_and_later_events_still_publish() {
    let mut run = start(
        two_cells("failing.ipynb"),
        service_with(
            vec![
                ExporterConfig::new("broken_exporter"),
                ExporterConfig::new("console_exporter"),
            ],
            vec![Activation::new(EventKind::DocumentSave, false)],
        ),
    )
    .await;
    run.transport.fail_exports_to("broken_exporter");

    run.session.save(SaveState::Completed);
    run.session.save(SaveState::Completed);
    tokio::time::sleep(Duration::from_millis(100)).await;
    let reports = run.attachment.drain(Duration::from_secs(5)).await;

    assert_eq!(reports.len(), 4);
    let failed = reports
        .iter()
        .filter(|r| matches!(r.outcome, PublishOutcome::Failed(_)))
        .count();
    assert_eq!(failed, 2);
    assert!(reports
        .iter()
        .filter(|r| r.exporter == "console_exporter")
        .all(|r| r.outcome.is_delivered()));
    assert_eq!(run.transport.requests_for("NotebookSaveEvent").len(), 4);
}

#[tokio::test]
async fn edits_stream_a_snapshot_then_diffs() {
    let mut run = start(
        DocumentSeed::new("edits.ipynb").with_cell(CellSeed::code("x").with_id("a")),
        service_with(
            vec![ExporterConfig::new("console_exporter")],
            vec![Activation::new(EventKind::CellEdit, true)],
        ),
    )
    .await;

    for (offset, ch) in ["y", "z"].iter().enumerate() {
        run.session
            .edit_cell(
                "a",
                TextChange {
                    from: offset + 1,
                    to: offset + 1,
                    insert: ch.to_string(),
                },
            )
            .unwrap();
    }
    run.finish().await;

    let bodies = run.transport.requests_for("CellEditEvent");
    let types: Vec<&str> = bodies
        .iter()
        .map(|b| b["eventDetail"]["eventInfo"]["type"].as_str().unwrap())
        .collect();
    assert_eq!(types, vec!["snapshot", "change", "change"]);
    assert!(bodies[0]["notebookState"]["notebookContent"].is_object());
    assert!(bodies[1..]
        .iter()
        .all(|b| b["notebookState"]["notebookContent"].is_null()));
}

#[tokio::test]
async fn background_notebook_visibility_is_ignored() {
    let mut run = start(
        two_cells("background.ipynb"),
        service_with(
            vec![ExporterConfig::new("console_exporter")],
            every_event(false),
        ),
    )
    .await;
    run.session.set_attached(false);
    run.session.set_hidden(true);
    run.session.set_hidden(false);
    run.finish().await;

    assert!(run.transport.requests_for("NotebookHiddenEvent").is_empty());
    assert!(run.transport.requests_for("NotebookVisibleEvent").is_empty());
}

#[tokio::test]
async fn disposed_session_stops_producers_and_skips_publishes() {
    let mut run = start(
        two_cells("closing.ipynb"),
        service_with(
            vec![ExporterConfig::new("console_exporter")],
            every_event(false),
        ),
    )
    .await;
    run.finish().await;
    let before = run.transport.requests().len();

    run.session.dispose();
    run.session.save(SaveState::Completed);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(run.transport.requests().len(), before);

    let dyn_session: Arc<dyn Session> = run.session.clone();
    let exporter = run.attachment.coordinator.exporters()[0].clone();
    let outcome = run
        .attachment
        .coordinator
        .publish_event(
            dyn_session.as_ref(),
            &Event::new(EventKind::DocumentSave, EventInfo::Empty {}),
            &exporter,
            true,
        )
        .await;
    assert!(matches!(outcome, PublishOutcome::Skipped(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn one_pipeline_opens_every_session_it_attaches() {
    let transport = Arc::new(RecordingTransport::new(service_with(
        vec![ExporterConfig::new("console_exporter")],
        vec![Activation::new(EventKind::DocumentOpen, false)],
    )));
    let pipeline = Pipeline::new(transport.clone(), ProducerSettings::default());

    let mut attachments = Vec::new();
    for path in ["one.ipynb", "two.ipynb", "three.ipynb"] {
        let session = Arc::new(MemorySession::new(two_cells(path)));
        attachments.push(pipeline.attach(session.clone()).await.unwrap());
        session.mark_ready();
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    for attachment in &mut attachments {
        attachment.drain(Duration::from_secs(5)).await;
    }

    assert_eq!(transport.requests_for("NotebookOpenEvent").len(), 3);
}
