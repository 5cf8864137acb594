//! Page visibility toggles for the foreground notebook.

use std::sync::Arc;

use crate::error::TelemetryError;
use crate::telemetry::coordinator::{ContentPolicy, Coordinator};
use crate::telemetry::events::{Event, EventInfo, EventKind};
use crate::telemetry::producers::{ensure_attached, spawn_signal_loop, Producer};
use crate::telemetry::session::{Session, SessionSignal};

/// Emits `NotebookHiddenEvent` or `NotebookVisibleEvent`, depending on the instance.
///
/// Signals are ignored unless the session's root was attached when the page
/// toggled, so background notebooks stay quiet.
pub struct VisibilityProducer {
    hidden: bool,
}

impl VisibilityProducer {
    pub fn hidden() -> Self {
        Self { hidden: true }
    }

    pub fn visible() -> Self {
        Self { hidden: false }
    }
}

impl Producer for VisibilityProducer {
    fn kind(&self) -> EventKind {
        if self.hidden {
            EventKind::DocumentHidden
        } else {
            EventKind::DocumentVisible
        }
    }

    fn listen(
        self: Arc<Self>,
        session: Arc<dyn Session>,
        coordinator: Arc<Coordinator>,
    ) -> Result<(), TelemetryError> {
        ensure_attached(session.as_ref(), self.kind())?;
        let observed = Arc::clone(&session);
        let kind = self.kind();
        let wants_hidden = self.hidden;
        spawn_signal_loop(kind, &session, move |signal| {
            let SessionSignal::VisibilityChanged {
                hidden,
                visible,
                attached,
            } = signal
            else {
                return;
            };
            if hidden != wants_hidden || !attached {
                return;
            }
            let info = if hidden {
                EventInfo::Empty {}
            } else {
                EventInfo::Cells { cells: visible }
            };
            coordinator.route(&observed, Event::new(kind, info), ContentPolicy::FromActivation);
        });
        Ok(())
    }
}
