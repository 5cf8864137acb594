//! Event producers.
//!
//! Each producer watches one kind of session signal, turns it into an
//! [`Event`](crate::telemetry::events::Event) and hands it to the
//! [`Coordinator`] for routing. Producers are listed explicitly in a
//! [`ProducerRegistry`] value; there is no global registration.

pub mod cells;
pub mod clipboard;
pub mod edit;
pub mod execution;
pub mod open;
pub mod save;
pub mod scroll;
pub mod visibility;

#[cfg(test)]
mod harness;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::config::ProducerSettings;
use crate::error::TelemetryError;
use crate::telemetry::coordinator::Coordinator;
use crate::telemetry::events::EventKind;
use crate::telemetry::session::{ClipboardAction, Session, SessionSignal};

pub use cells::{ActiveCellChangeProducer, CellAddProducer, CellRemoveProducer};
pub use clipboard::ClipboardProducer;
pub use edit::CellEditProducer;
pub use execution::CellExecuteProducer;
pub use open::DocumentOpenProducer;
pub use save::DocumentSaveProducer;
pub use scroll::{Debouncer, DocumentScrollProducer};
pub use visibility::VisibilityProducer;

pub trait Producer: Send + Sync {
    /// Event kind this producer emits.
    fn kind(&self) -> EventKind;

    /// Subscribe to `session`. Fails fast when the session is already disposed.
    fn listen(
        self: Arc<Self>,
        session: Arc<dyn Session>,
        coordinator: Arc<Coordinator>,
    ) -> Result<(), TelemetryError>;
}

/// Wiring error check shared by every producer.
pub(crate) fn ensure_attached(session: &dyn Session, kind: EventKind) -> Result<(), TelemetryError> {
    if session.is_disposed() {
        return Err(TelemetryError::DetachedSession(format!(
            "{} cannot listen to disposed notebook '{}'",
            kind,
            session.document_path()
        )));
    }
    Ok(())
}

/// Subscribe now and drive `handler` with every later signal, in emission order,
/// until the session's signal channel closes.
pub(crate) fn spawn_signal_loop<H>(kind: EventKind, session: &Arc<dyn Session>, mut handler: H)
where
    H: FnMut(SessionSignal) + Send + 'static,
{
    let mut signals = session.subscribe();
    tokio::spawn(async move {
        loop {
            match signals.recv().await {
                Ok(signal) => handler(signal),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(producer = %kind, skipped, "producer fell behind session signals");
                }
                Err(RecvError::Closed) => {
                    debug!(producer = %kind, "session closed; producer stopped");
                    break;
                }
            }
        }
    });
}

/// Explicit, per-session list of producer instances.
#[derive(Clone, Default)]
pub struct ProducerRegistry {
    producers: Vec<Arc<dyn Producer>>,
}

impl ProducerRegistry {
    pub fn from_producers(producers: Vec<Arc<dyn Producer>>) -> Self {
        Self { producers }
    }

    /// One fresh instance of every producer, minus the kinds disabled in settings.
    pub fn standard(settings: &ProducerSettings) -> Self {
        let debounce = Duration::from_millis(settings.scroll_debounce_ms);
        let all: Vec<Arc<dyn Producer>> = vec![
            Arc::new(ActiveCellChangeProducer),
            Arc::new(CellAddProducer),
            Arc::new(CellEditProducer::new()),
            Arc::new(CellExecuteProducer),
            Arc::new(CellRemoveProducer),
            Arc::new(ClipboardProducer::new(ClipboardAction::Copy)),
            Arc::new(ClipboardProducer::new(ClipboardAction::Cut)),
            Arc::new(ClipboardProducer::new(ClipboardAction::Paste)),
            Arc::new(VisibilityProducer::hidden()),
            Arc::new(DocumentOpenProducer::new()),
            Arc::new(DocumentSaveProducer),
            Arc::new(DocumentScrollProducer::new(debounce)),
            Arc::new(VisibilityProducer::visible()),
        ];

        let disabled = settings.disabled_kinds();
        let producers = all
            .into_iter()
            .filter(|producer| !disabled.contains(&producer.kind()))
            .collect();
        Self { producers }
    }

    pub fn len(&self) -> usize {
        self.producers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.producers.is_empty()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.producers.iter().map(|p| p.kind()).collect()
    }

    /// Attach every producer to the session, stopping at the first wiring error.
    pub fn listen_all(
        &self,
        session: &Arc<dyn Session>,
        coordinator: &Arc<Coordinator>,
    ) -> Result<(), TelemetryError> {
        for producer in &self.producers {
            Arc::clone(producer).listen(Arc::clone(session), Arc::clone(coordinator))?;
        }
        Ok(())
    }
}
