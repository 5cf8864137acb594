//! Shared fixture for producer tests: a memory session wired to a recording transport.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;

use crate::telemetry::coordinator::Coordinator;
use crate::telemetry::events::EventKind;
use crate::telemetry::exporters::{Activation, ExporterConfig, ServiceConfig};
use crate::telemetry::routing::bus::{PublishBus, PublishReport};
use crate::telemetry::session::memory::{DocumentSeed, MemorySession};
use crate::telemetry::session::Session;
use crate::transport::recording::RecordingTransport;

pub(crate) struct Harness {
    pub session: Arc<MemorySession>,
    pub transport: Arc<RecordingTransport>,
    pub coordinator: Arc<Coordinator>,
    pub reports: UnboundedReceiver<PublishReport>,
}

/// Every event kind, all with the same `logWholeDocument` flag.
pub(crate) fn every_event(log_whole_document: bool) -> Vec<Activation> {
    EventKind::ALL
        .iter()
        .map(|kind| Activation::new(*kind, log_whole_document))
        .collect()
}

impl Harness {
    pub async fn new(seed: DocumentSeed, activations: Vec<Activation>) -> Self {
        let transport = Arc::new(RecordingTransport::new(ServiceConfig {
            active_events: None,
            exporters: vec![ExporterConfig::new("console_exporter").with_activations(activations)],
        }));
        let (bus, reports) = PublishBus::new_pair();
        let coordinator = Arc::new(Coordinator::new(transport.clone(), bus));
        let session = Arc::new(MemorySession::new(seed));
        coordinator
            .load_exporters(session.as_ref())
            .await
            .expect("recording transport serves config");
        Self {
            session,
            transport,
            coordinator,
            reports,
        }
    }

    pub fn dyn_session(&self) -> Arc<dyn Session> {
        self.session.clone()
    }

    pub async fn next_report(&mut self) -> PublishReport {
        tokio::time::timeout(Duration::from_secs(5), self.reports.recv())
            .await
            .expect("publish report within timeout")
            .expect("bus open")
    }

    /// Let spawned producer and publish tasks run to quiescence.
    pub async fn settle(&mut self) {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
