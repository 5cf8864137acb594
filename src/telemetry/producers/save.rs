//! Notebook save completion.

use std::sync::Arc;

use crate::error::TelemetryError;
use crate::telemetry::coordinator::{ContentPolicy, Coordinator};
use crate::telemetry::events::{Event, EventInfo, EventKind};
use crate::telemetry::producers::{ensure_attached, spawn_signal_loop, Producer};
use crate::telemetry::session::{SaveState, Session, SessionSignal};

pub struct DocumentSaveProducer;

impl Producer for DocumentSaveProducer {
    fn kind(&self) -> EventKind {
        EventKind::DocumentSave
    }

    fn listen(
        self: Arc<Self>,
        session: Arc<dyn Session>,
        coordinator: Arc<Coordinator>,
    ) -> Result<(), TelemetryError> {
        ensure_attached(session.as_ref(), self.kind())?;
        let observed = Arc::clone(&session);
        spawn_signal_loop(self.kind(), &session, move |signal| {
            if signal == SessionSignal::SaveStateChanged(SaveState::Completed) {
                let event = Event::new(EventKind::DocumentSave, EventInfo::Empty {});
                coordinator.route(&observed, event, ContentPolicy::FromActivation);
            }
        });
        Ok(())
    }
}
