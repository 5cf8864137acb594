//! In-process outcome bus for publish tasks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::telemetry::events::EventKind;

/// Result of a single publish call.
#[derive(Debug, Clone, PartialEq)]
pub enum PublishOutcome {
    /// The service acknowledged the export; carries its response.
    Delivered(Value),
    /// The transport failed. Never retried.
    Failed(String),
    /// Nothing was sent, e.g. the session was already disposed.
    Skipped(String),
}

impl PublishOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, PublishOutcome::Delivered(_))
    }
}

#[derive(Debug, Clone)]
pub struct PublishReport {
    pub event: EventKind,
    pub exporter: String,
    pub outcome: PublishOutcome,
}

/// Sender side of the outcome channel. Cloned into every spawned publish task.
#[derive(Clone)]
pub struct PublishBus {
    sender: UnboundedSender<PublishReport>,
    dispatched: Arc<AtomicU64>,
}

impl PublishBus {
    pub fn new_pair() -> (Self, UnboundedReceiver<PublishReport>) {
        let (sender, receiver) = unbounded_channel();
        (
            Self {
                sender,
                dispatched: Arc::new(AtomicU64::new(0)),
            },
            receiver,
        )
    }

    /// Count a publish task as in flight. Called before the task is spawned.
    pub fn mark_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of publish tasks spawned so far on this bus.
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    /// Deliver a report. A dropped receiver only means nobody is listening.
    pub fn report(&self, report: PublishReport) {
        if self.sender.send(report).is_err() {
            tracing::trace!("publish report dropped; receiver closed");
        }
    }
}
