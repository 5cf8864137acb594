//! Cell text edits.
//!
//! Every cell gets one full snapshot before any of its diffs: existing cells
//! when the producer starts listening, new cells when they are inserted, and
//! any cell not seen yet right before its first diff. Diffs never carry the
//! whole notebook, whatever the exporter's activation asks for.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::TelemetryError;
use crate::telemetry::coordinator::{ContentPolicy, Coordinator};
use crate::telemetry::events::{CellEditInfo, CellRef, EditChange, Event, EventInfo, EventKind};
use crate::telemetry::producers::{ensure_attached, spawn_signal_loop, Producer};
use crate::telemetry::session::{Session, SessionSignal};

pub struct CellEditProducer {
    seen: Mutex<HashSet<String>>,
}

impl CellEditProducer {
    pub fn new() -> Self {
        Self {
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// Record the cell as seen; true if this is the first time.
    fn first_sight(&self, id: &str) -> bool {
        self.seen.lock().insert(id.to_string())
    }

    fn forget(&self, id: &str) {
        self.seen.lock().remove(id);
    }

    fn publish_snapshot(
        &self,
        session: &Arc<dyn Session>,
        coordinator: &Arc<Coordinator>,
        cell: CellRef,
        source: &str,
    ) {
        let event = Event::new(
            EventKind::CellEdit,
            EventInfo::Edit(CellEditInfo {
                index: cell.index,
                id: cell.id,
                change: EditChange::snapshot_of(source),
            }),
        );
        coordinator.route(session, event, ContentPolicy::FromActivation);
    }

    fn handle(&self, session: &Arc<dyn Session>, coordinator: &Arc<Coordinator>, signal: SessionSignal) {
        match signal {
            SessionSignal::CellInserted { cell, source } => {
                if self.first_sight(&cell.id) {
                    self.publish_snapshot(session, coordinator, cell, &source);
                }
            }
            SessionSignal::CellContentChanged { cell, changes } => {
                if self.first_sight(&cell.id) {
                    let source = session
                        .cells()
                        .into_iter()
                        .find(|snapshot| snapshot.cell.id == cell.id)
                        .map(|snapshot| snapshot.source)
                        .unwrap_or_default();
                    self.publish_snapshot(session, coordinator, cell.clone(), &source);
                }
                let event = Event::new(
                    EventKind::CellEdit,
                    EventInfo::Edit(CellEditInfo {
                        index: cell.index,
                        id: cell.id,
                        change: EditChange::Change { changes },
                    }),
                );
                coordinator.route(session, event, ContentPolicy::Never);
            }
            SessionSignal::CellRemoved { id, .. } => self.forget(&id),
            _ => {}
        }
    }
}

impl Default for CellEditProducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Producer for CellEditProducer {
    fn kind(&self) -> EventKind {
        EventKind::CellEdit
    }

    fn listen(
        self: Arc<Self>,
        session: Arc<dyn Session>,
        coordinator: Arc<Coordinator>,
    ) -> Result<(), TelemetryError> {
        ensure_attached(session.as_ref(), self.kind())?;

        // Subscribe before the initial snapshots so no edit slips between them.
        let observed = Arc::clone(&session);
        let producer = Arc::clone(&self);
        let routing = Arc::clone(&coordinator);
        spawn_signal_loop(self.kind(), &session, move |signal| {
            producer.handle(&observed, &routing, signal);
        });

        for snapshot in session.cells() {
            if self.first_sight(&snapshot.cell.id) {
                self.publish_snapshot(&session, &coordinator, snapshot.cell, &snapshot.source);
            }
        }
        Ok(())
    }
}
