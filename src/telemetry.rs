//! Telemetry domain: events, exporters, sessions, producers, routing and the coordinator.

mod types;

pub mod coordinator;
pub mod events;
pub mod exporters;
pub mod pipeline;
pub mod producers;
pub mod routing;
pub mod session;

pub use coordinator::{ContentPolicy, Coordinator, DocumentState, ExportRequest};
pub use events::{
    CellEditInfo, CellRef, EditChange, Event, EventInfo, EventKind, KernelError, RemovedCell,
    TextChange,
};
pub use exporters::{Activation, ExporterConfig, ServiceConfig, EXPORTERS_METADATA_KEY};
pub use pipeline::{Attachment, Pipeline};
pub use producers::{Producer, ProducerRegistry};
pub use routing::bus::{PublishBus, PublishOutcome, PublishReport};
pub use session::memory::{CellSeed, DocumentSeed, MemorySession};
pub use session::{Session, SessionSignal};
pub use types::{new_session_id, now_millis};
