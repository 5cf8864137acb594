//! The live notebook session producers observe.
//!
//! A [`Session`] is owned by the host; producers only hold an `Arc` to it and
//! subscribe to its [`SessionSignal`] broadcast.

pub mod layout;
pub mod memory;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::telemetry::events::{CellRef, EventKind, KernelError, TextChange};
use crate::telemetry::session::layout::{DocumentLayout, Viewport};

/// A cell's identity, position and current text.
#[derive(Debug, Clone, PartialEq)]
pub struct CellSnapshot {
    pub cell: CellRef,
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipboardAction {
    Copy,
    Cut,
    Paste,
}

impl ClipboardAction {
    pub fn event_kind(self) -> EventKind {
        match self {
            ClipboardAction::Copy => EventKind::ClipboardCopy,
            ClipboardAction::Cut => EventKind::ClipboardCut,
            ClipboardAction::Paste => EventKind::ClipboardPaste,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveState {
    Started,
    Completed,
    Failed,
}

/// Raw lifecycle signals emitted by a session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionSignal {
    ActiveCellChanged(Option<CellRef>),
    CellInserted {
        cell: CellRef,
        source: String,
    },
    CellRemoved {
        id: String,
        index: usize,
    },
    CellContentChanged {
        cell: CellRef,
        changes: Vec<TextChange>,
    },
    ExecutionCompleted {
        cell: CellRef,
        success: bool,
        error: Option<KernelError>,
    },
    /// `cell` is the cell that was active when the action happened.
    Clipboard {
        action: ClipboardAction,
        selection: String,
        cell: Option<CellRef>,
    },
    /// `visible` and `attached` describe the page at the moment it toggled.
    VisibilityChanged {
        hidden: bool,
        visible: Vec<CellRef>,
        attached: bool,
    },
    SaveStateChanged(SaveState),
    Scrolled(Viewport),
}

#[async_trait]
pub trait Session: Send + Sync {
    /// Kernel session id, if a kernel is connected.
    fn session_id(&self) -> Option<String>;

    fn document_path(&self) -> String;

    /// Notebook-level metadata entry.
    fn metadata(&self, key: &str) -> Option<Value>;

    /// Full serialized notebook, attached to exports that ask for it.
    fn document_content(&self) -> Value;

    fn cells(&self) -> Vec<CellSnapshot>;

    fn active_cell(&self) -> Option<CellRef>;

    /// Current scroll window plus per-cell vertical extents.
    fn layout(&self) -> DocumentLayout;

    /// Whether this notebook is the one currently attached to the page.
    fn is_attached(&self) -> bool;

    /// A disposed session is the equivalent of having no session at all.
    fn is_disposed(&self) -> bool;

    /// New receiver for signals emitted after this call. Closed once the session is disposed.
    fn subscribe(&self) -> broadcast::Receiver<SessionSignal>;

    /// Resolves once the notebook has finished loading.
    async fn ready(&self);
}
