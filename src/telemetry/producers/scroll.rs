//! Viewport scrolling, debounced on the trailing edge.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::error::TelemetryError;
use crate::telemetry::coordinator::{ContentPolicy, Coordinator};
use crate::telemetry::events::{Event, EventInfo, EventKind};
use crate::telemetry::producers::{ensure_attached, spawn_signal_loop, Producer};
use crate::telemetry::session::{Session, SessionSignal};

pub const DEFAULT_SCROLL_DEBOUNCE: Duration = Duration::from_millis(1500);

/// Single outstanding delayed task; scheduling a new one aborts the previous.
pub struct Debouncer {
    window: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: Mutex::new(None),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Run `action` once `window` has passed without another call to `schedule`.
    pub fn schedule<F>(&self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let window = self.window;
        let task = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            action.await;
        });
        if let Some(previous) = self.pending.lock().replace(task) {
            previous.abort();
        }
    }

    pub fn cancel(&self) {
        if let Some(pending) = self.pending.lock().take() {
            pending.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Publishes the cells visible at the last scroll of a burst.
pub struct DocumentScrollProducer {
    debouncer: Debouncer,
}

impl DocumentScrollProducer {
    pub fn new(window: Duration) -> Self {
        Self {
            debouncer: Debouncer::new(window),
        }
    }
}

impl Default for DocumentScrollProducer {
    fn default() -> Self {
        Self::new(DEFAULT_SCROLL_DEBOUNCE)
    }
}

impl Producer for DocumentScrollProducer {
    fn kind(&self) -> EventKind {
        EventKind::DocumentScroll
    }

    fn listen(
        self: Arc<Self>,
        session: Arc<dyn Session>,
        coordinator: Arc<Coordinator>,
    ) -> Result<(), TelemetryError> {
        ensure_attached(session.as_ref(), self.kind())?;
        let observed = Arc::clone(&session);
        let producer = Arc::clone(&self);
        spawn_signal_loop(self.kind(), &session, move |signal| {
            let SessionSignal::Scrolled(viewport) = signal else {
                return;
            };
            let cells = observed.layout().with_viewport(viewport).visible_cells();
            let session = Arc::clone(&observed);
            let coordinator = Arc::clone(&coordinator);
            producer.debouncer.schedule(async move {
                let event = Event::new(EventKind::DocumentScroll, EventInfo::Cells { cells });
                coordinator.route(&session, event, ContentPolicy::FromActivation);
            });
        });
        Ok(())
    }
}
