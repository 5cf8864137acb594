//! Cell execution results.

use std::sync::Arc;

use crate::error::TelemetryError;
use crate::telemetry::coordinator::{ContentPolicy, Coordinator};
use crate::telemetry::events::{Event, EventInfo, EventKind};
use crate::telemetry::producers::{ensure_attached, spawn_signal_loop, Producer};
use crate::telemetry::session::{Session, SessionSignal};

pub struct CellExecuteProducer;

impl Producer for CellExecuteProducer {
    fn kind(&self) -> EventKind {
        EventKind::CellExecute
    }

    fn listen(
        self: Arc<Self>,
        session: Arc<dyn Session>,
        coordinator: Arc<Coordinator>,
    ) -> Result<(), TelemetryError> {
        ensure_attached(session.as_ref(), self.kind())?;
        let observed = Arc::clone(&session);
        spawn_signal_loop(self.kind(), &session, move |signal| {
            if let SessionSignal::ExecutionCompleted {
                cell,
                success,
                error,
            } = signal
            {
                let event = Event::new(
                    EventKind::CellExecute,
                    EventInfo::Execution {
                        cells: vec![cell],
                        success,
                        kernel_error: if success { None } else { error },
                    },
                );
                coordinator.route(&observed, event, ContentPolicy::FromActivation);
            }
        });
        Ok(())
    }
}
