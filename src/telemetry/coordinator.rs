//! Per-session coordinator: resolves exporters and publishes events to them.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, error, info, warn};

use crate::error::TelemetryError;
use crate::telemetry::events::Event;
use crate::telemetry::exporters::{
    document_override, resolve_exporters, ExporterConfig, EXPORTERS_METADATA_KEY,
};
use crate::telemetry::routing::bus::{PublishBus, PublishOutcome, PublishReport};
use crate::telemetry::session::Session;
use crate::transport::Transport;

/// Body of `POST /export`.
#[derive(Debug, Clone, Serialize)]
pub struct ExportRequest {
    #[serde(rename = "eventDetail")]
    pub event_detail: Event,
    #[serde(rename = "notebookState")]
    pub document_state: DocumentState,
    pub exporter: ExporterConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentState {
    #[serde(rename = "sessionID")]
    pub session_id: Option<String>,
    #[serde(rename = "notebookPath")]
    pub document_path: String,
    #[serde(rename = "notebookContent")]
    pub document_content: Option<Value>,
}

impl ExportRequest {
    pub fn assemble(
        session: &dyn Session,
        event: &Event,
        exporter: &ExporterConfig,
        log_whole_document: bool,
    ) -> Self {
        Self {
            event_detail: event.clone(),
            document_state: DocumentState {
                session_id: session.session_id(),
                document_path: session.document_path(),
                document_content: log_whole_document.then(|| session.document_content()),
            },
            exporter: exporter.clone(),
        }
    }
}

/// How the `logWholeDocument` flag is chosen when routing an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentPolicy {
    /// Use the matching activation's `logWholeDocument`.
    FromActivation,
    /// Never attach the document, whatever the activation says.
    Never,
}

/// One routed publish waiting in an exporter's lane.
struct PublishJob {
    session: Arc<dyn Session>,
    event: Event,
    exporter: ExporterConfig,
    log_whole_document: bool,
}

/// Resolves a session's exporters and delivers its events to them.
///
/// Each exporter gets its own publish lane: a queue drained by a single task,
/// so one exporter sees events in the order they were routed while a slow or
/// failing exporter never holds up the others.
pub struct Coordinator {
    transport: Arc<dyn Transport>,
    exporters: RwLock<Vec<ExporterConfig>>,
    lanes: Mutex<HashMap<usize, UnboundedSender<PublishJob>>>,
    bus: PublishBus,
}

impl Coordinator {
    pub fn new(transport: Arc<dyn Transport>, bus: PublishBus) -> Self {
        Self {
            transport,
            exporters: RwLock::new(Vec::new()),
            lanes: Mutex::new(HashMap::new()),
            bus,
        }
    }

    /// Resolve the session's exporters from the service config and notebook metadata.
    ///
    /// Runs once when a session opens; later metadata edits are not picked up.
    pub async fn load_exporters(&self, session: &dyn Session) -> Result<usize, TelemetryError> {
        let global = self.transport.fetch_config().await?;
        let document = document_override(session.metadata(EXPORTERS_METADATA_KEY));
        let overridden = document.is_some();
        let resolved = resolve_exporters(global, document);
        info!(
            path = %session.document_path(),
            exporters = resolved.len(),
            document_override = overridden,
            "resolved telemetry exporters"
        );
        let count = resolved.len();
        *self.exporters.write() = resolved;
        // Lanes are keyed by position; queued jobs still drain before old lanes stop.
        self.lanes.lock().clear();
        Ok(count)
    }

    pub fn exporters(&self) -> Vec<ExporterConfig> {
        self.exporters.read().clone()
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn bus(&self) -> &PublishBus {
        &self.bus
    }

    /// Send one event to one exporter. Never returns an error: failures are
    /// logged and reported as [`PublishOutcome::Failed`].
    pub async fn publish_event(
        &self,
        session: &dyn Session,
        event: &Event,
        exporter: &ExporterConfig,
        log_whole_document: bool,
    ) -> PublishOutcome {
        deliver(self.transport.as_ref(), session, event, exporter, log_whole_document).await
    }

    /// Fan an event out to every exporter activated for its kind by queueing
    /// it on that exporter's lane. Returns the number of publishes queued.
    pub fn route(&self, session: &Arc<dyn Session>, event: Event, policy: ContentPolicy) -> usize {
        let targets: Vec<(usize, ExporterConfig, bool)> = self
            .exporters
            .read()
            .iter()
            .enumerate()
            .filter_map(|(position, exporter)| {
                let activation = exporter.activation_for(event.name())?;
                let log_whole_document = match policy {
                    ContentPolicy::FromActivation => activation.log_whole_document,
                    ContentPolicy::Never => false,
                };
                Some((position, exporter.clone(), log_whole_document))
            })
            .collect();

        if targets.is_empty() {
            debug!(event = %event.name(), "no exporter activated for event");
            return 0;
        }

        let count = targets.len();
        let mut lanes = self.lanes.lock();
        for (position, exporter, log_whole_document) in targets {
            self.bus.mark_dispatched();
            let lane = lanes
                .entry(position)
                .or_insert_with(|| self.open_lane(&exporter));
            let job = PublishJob {
                session: Arc::clone(session),
                event: event.clone(),
                exporter,
                log_whole_document,
            };
            if let Err(mpsc::error::SendError(job)) = lane.send(job) {
                error!(event = %job.event.name(), exporter = %job.exporter.label(), "publish lane closed");
                self.bus.report(PublishReport {
                    event: job.event.name(),
                    exporter: job.exporter.label(),
                    outcome: PublishOutcome::Skipped("publish lane closed".to_string()),
                });
                lanes.remove(&position);
            }
        }
        count
    }

    fn open_lane(&self, exporter: &ExporterConfig) -> UnboundedSender<PublishJob> {
        let (sender, mut jobs) = mpsc::unbounded_channel::<PublishJob>();
        let transport = Arc::clone(&self.transport);
        let bus = self.bus.clone();
        debug!(exporter = %exporter.label(), "opening publish lane");
        tokio::spawn(async move {
            while let Some(job) = jobs.recv().await {
                let outcome = deliver(
                    transport.as_ref(),
                    job.session.as_ref(),
                    &job.event,
                    &job.exporter,
                    job.log_whole_document,
                )
                .await;
                bus.report(PublishReport {
                    event: job.event.name(),
                    exporter: job.exporter.label(),
                    outcome,
                });
            }
        });
        sender
    }
}

async fn deliver(
    transport: &dyn Transport,
    session: &dyn Session,
    event: &Event,
    exporter: &ExporterConfig,
    log_whole_document: bool,
) -> PublishOutcome {
    if session.is_disposed() {
        let err = TelemetryError::DetachedSession(session.document_path());
        error!(event = %event.name(), exporter = %exporter.label(), error = %err, "refusing to publish");
        return PublishOutcome::Skipped(err.to_string());
    }

    let request = ExportRequest::assemble(session, event, exporter, log_whole_document);
    match transport.export(&request).await {
        Ok(response) => {
            debug!(
                event = %event.name(),
                exporter = %exporter.label(),
                session_id = ?request.document_state.session_id,
                response = %response,
                "exported event"
            );
            PublishOutcome::Delivered(response)
        }
        Err(err) => {
            warn!(
                event = %event.name(),
                exporter = %exporter.label(),
                session_id = ?request.document_state.session_id,
                error = %err,
                "failed to export event"
            );
            PublishOutcome::Failed(err.to_string())
        }
    }
}
