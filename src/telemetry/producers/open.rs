//! Notebook open: published once, after the notebook first reports ready.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::TelemetryError;
use crate::telemetry::coordinator::{ContentPolicy, Coordinator};
use crate::telemetry::events::{Event, EventInfo, EventKind};
use crate::telemetry::producers::{ensure_attached, Producer};
use crate::telemetry::session::Session;

/// Publishes at most once per instance. The registry creates one instance per
/// coordinator, so repeated `listen` calls never produce a second open event.
pub struct DocumentOpenProducer {
    produced: AtomicBool,
}

impl DocumentOpenProducer {
    pub fn new() -> Self {
        Self {
            produced: AtomicBool::new(false),
        }
    }

    pub fn has_produced(&self) -> bool {
        self.produced.load(Ordering::Acquire)
    }
}

impl Default for DocumentOpenProducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Producer for DocumentOpenProducer {
    fn kind(&self) -> EventKind {
        EventKind::DocumentOpen
    }

    fn listen(
        self: Arc<Self>,
        session: Arc<dyn Session>,
        coordinator: Arc<Coordinator>,
    ) -> Result<(), TelemetryError> {
        ensure_attached(session.as_ref(), self.kind())?;
        if self.has_produced() {
            debug!(path = %session.document_path(), "open event already produced");
            return Ok(());
        }

        tokio::spawn(async move {
            session.ready().await;
            if self.produced.swap(true, Ordering::AcqRel) {
                return;
            }
            let environ = match coordinator.transport().fetch_environ().await {
                Ok(environ) => environ,
                Err(err) => {
                    warn!(error = %err, "failed to fetch environment for open event");
                    Value::Null
                }
            };
            let event = Event::new(EventKind::DocumentOpen, EventInfo::Environment { environ });
            coordinator.route(&session, event, ContentPolicy::FromActivation);
        });
        Ok(())
    }
}
