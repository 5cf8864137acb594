//! Session wiring: resolve exporters, then start every producer.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

use crate::config::ProducerSettings;
use crate::error::TelemetryError;
use crate::telemetry::coordinator::Coordinator;
use crate::telemetry::events::EventKind;
use crate::telemetry::producers::{ensure_attached, ProducerRegistry};
use crate::telemetry::routing::bus::{PublishBus, PublishReport};
use crate::telemetry::session::Session;
use crate::transport::Transport;

/// Handle returned by [`Pipeline::attach`].
pub struct Attachment {
    pub coordinator: Arc<Coordinator>,
    pub reports: UnboundedReceiver<PublishReport>,
}

impl Attachment {
    /// Receive reports until every publish dispatched so far has reported, or
    /// `timeout` passes. Returns the reports collected.
    pub async fn drain(&mut self, timeout: Duration) -> Vec<PublishReport> {
        let mut collected = Vec::new();
        let deadline = tokio::time::Instant::now() + timeout;
        let mut received: u64 = 0;
        while received < self.coordinator.bus().dispatched() {
            match tokio::time::timeout_at(deadline, self.reports.recv()).await {
                Ok(Some(report)) => {
                    received += 1;
                    collected.push(report);
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        outstanding = self.coordinator.bus().dispatched() - received,
                        "timed out waiting for in-flight publishes"
                    );
                    break;
                }
            }
        }
        collected
    }
}

/// Attaches sessions to a transport. Every attached session gets its own
/// coordinator and its own producer instances.
pub struct Pipeline {
    transport: Arc<dyn Transport>,
    settings: ProducerSettings,
}

impl Pipeline {
    pub fn new(transport: Arc<dyn Transport>, settings: ProducerSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    pub fn producer_kinds(&self) -> Vec<EventKind> {
        ProducerRegistry::standard(&self.settings).kinds()
    }

    /// Resolve exporters for the session, then attach a fresh set of producers to it.
    pub async fn attach(&self, session: Arc<dyn Session>) -> Result<Attachment, TelemetryError> {
        ensure_attached(session.as_ref(), EventKind::DocumentOpen)?;
        let (bus, reports) = PublishBus::new_pair();
        let coordinator = Arc::new(Coordinator::new(Arc::clone(&self.transport), bus));
        coordinator.load_exporters(session.as_ref()).await?;
        let registry = ProducerRegistry::standard(&self.settings);
        registry.listen_all(&session, &coordinator)?;
        info!(
            path = %session.document_path(),
            producers = registry.len(),
            "telemetry producers attached"
        );
        Ok(Attachment {
            coordinator,
            reports,
        })
    }
}
