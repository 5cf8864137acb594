//! Cell list producers: active-cell changes, insertions and removals.

use std::sync::Arc;

use crate::error::TelemetryError;
use crate::telemetry::coordinator::{ContentPolicy, Coordinator};
use crate::telemetry::events::{Event, EventInfo, EventKind, RemovedCell};
use crate::telemetry::producers::{ensure_attached, spawn_signal_loop, Producer};
use crate::telemetry::session::{Session, SessionSignal};

pub struct ActiveCellChangeProducer;

impl Producer for ActiveCellChangeProducer {
    fn kind(&self) -> EventKind {
        EventKind::ActiveCellChange
    }

    fn listen(
        self: Arc<Self>,
        session: Arc<dyn Session>,
        coordinator: Arc<Coordinator>,
    ) -> Result<(), TelemetryError> {
        ensure_attached(session.as_ref(), self.kind())?;
        let observed = Arc::clone(&session);
        spawn_signal_loop(self.kind(), &session, move |signal| {
            if let SessionSignal::ActiveCellChanged(Some(cell)) = signal {
                let event = Event::new(
                    EventKind::ActiveCellChange,
                    EventInfo::Cells { cells: vec![cell] },
                );
                coordinator.route(&observed, event, ContentPolicy::FromActivation);
            }
        });
        Ok(())
    }
}

pub struct CellAddProducer;

impl Producer for CellAddProducer {
    fn kind(&self) -> EventKind {
        EventKind::CellAdd
    }

    fn listen(
        self: Arc<Self>,
        session: Arc<dyn Session>,
        coordinator: Arc<Coordinator>,
    ) -> Result<(), TelemetryError> {
        ensure_attached(session.as_ref(), self.kind())?;
        let observed = Arc::clone(&session);
        spawn_signal_loop(self.kind(), &session, move |signal| {
            if let SessionSignal::CellInserted { cell, .. } = signal {
                let event = Event::new(EventKind::CellAdd, EventInfo::Cells { cells: vec![cell] });
                coordinator.route(&observed, event, ContentPolicy::FromActivation);
            }
        });
        Ok(())
    }
}

pub struct CellRemoveProducer;

impl Producer for CellRemoveProducer {
    fn kind(&self) -> EventKind {
        EventKind::CellRemove
    }

    fn listen(
        self: Arc<Self>,
        session: Arc<dyn Session>,
        coordinator: Arc<Coordinator>,
    ) -> Result<(), TelemetryError> {
        ensure_attached(session.as_ref(), self.kind())?;
        let observed = Arc::clone(&session);
        spawn_signal_loop(self.kind(), &session, move |signal| {
            if let SessionSignal::CellRemoved { index, .. } = signal {
                let event = Event::new(
                    EventKind::CellRemove,
                    EventInfo::Removed {
                        cells: vec![RemovedCell { index }],
                    },
                );
                coordinator.route(&observed, event, ContentPolicy::FromActivation);
            }
        });
        Ok(())
    }
}
