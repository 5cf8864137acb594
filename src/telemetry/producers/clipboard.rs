//! Clipboard copy, cut and paste on the notebook surface.

use std::sync::Arc;

use crate::error::TelemetryError;
use crate::telemetry::coordinator::{ContentPolicy, Coordinator};
use crate::telemetry::events::{Event, EventInfo, EventKind};
use crate::telemetry::producers::{ensure_attached, spawn_signal_loop, Producer};
use crate::telemetry::session::{ClipboardAction, Session, SessionSignal};

/// One instance per clipboard action.
pub struct ClipboardProducer {
    action: ClipboardAction,
}

impl ClipboardProducer {
    pub fn new(action: ClipboardAction) -> Self {
        Self { action }
    }
}

impl Producer for ClipboardProducer {
    fn kind(&self) -> EventKind {
        self.action.event_kind()
    }

    fn listen(
        self: Arc<Self>,
        session: Arc<dyn Session>,
        coordinator: Arc<Coordinator>,
    ) -> Result<(), TelemetryError> {
        ensure_attached(session.as_ref(), self.kind())?;
        let observed = Arc::clone(&session);
        let wanted = self.action;
        spawn_signal_loop(self.kind(), &session, move |signal| {
            let SessionSignal::Clipboard {
                action,
                selection,
                cell,
            } = signal
            else {
                return;
            };
            if action != wanted {
                return;
            }
            let cells = cell.into_iter().collect();
            let event = Event::new(
                wanted.event_kind(),
                EventInfo::Clipboard { cells, selection },
            );
            coordinator.route(&observed, event, ContentPolicy::FromActivation);
        });
        Ok(())
    }
}
