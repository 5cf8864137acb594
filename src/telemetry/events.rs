//! Event schema for notebook telemetry.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::telemetry::types::now_millis;

/// Closed set of event kinds. Serialized names are the ones exporter configs refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "ActiveCellChangeEvent")]
    ActiveCellChange,
    #[serde(rename = "CellAddEvent")]
    CellAdd,
    #[serde(rename = "CellEditEvent")]
    CellEdit,
    #[serde(rename = "CellExecuteEvent")]
    CellExecute,
    #[serde(rename = "CellRemoveEvent")]
    CellRemove,
    #[serde(rename = "ClipboardCopyEvent")]
    ClipboardCopy,
    #[serde(rename = "ClipboardCutEvent")]
    ClipboardCut,
    #[serde(rename = "ClipboardPasteEvent")]
    ClipboardPaste,
    #[serde(rename = "NotebookHiddenEvent")]
    DocumentHidden,
    #[serde(rename = "NotebookOpenEvent")]
    DocumentOpen,
    #[serde(rename = "NotebookSaveEvent")]
    DocumentSave,
    #[serde(rename = "NotebookScrollEvent")]
    DocumentScroll,
    #[serde(rename = "NotebookVisibleEvent")]
    DocumentVisible,
}

impl EventKind {
    pub const ALL: [EventKind; 13] = [
        EventKind::ActiveCellChange,
        EventKind::CellAdd,
        EventKind::CellEdit,
        EventKind::CellExecute,
        EventKind::CellRemove,
        EventKind::ClipboardCopy,
        EventKind::ClipboardCut,
        EventKind::ClipboardPaste,
        EventKind::DocumentHidden,
        EventKind::DocumentOpen,
        EventKind::DocumentSave,
        EventKind::DocumentScroll,
        EventKind::DocumentVisible,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::ActiveCellChange => "ActiveCellChangeEvent",
            EventKind::CellAdd => "CellAddEvent",
            EventKind::CellEdit => "CellEditEvent",
            EventKind::CellExecute => "CellExecuteEvent",
            EventKind::CellRemove => "CellRemoveEvent",
            EventKind::ClipboardCopy => "ClipboardCopyEvent",
            EventKind::ClipboardCut => "ClipboardCutEvent",
            EventKind::ClipboardPaste => "ClipboardPasteEvent",
            EventKind::DocumentHidden => "NotebookHiddenEvent",
            EventKind::DocumentOpen => "NotebookOpenEvent",
            EventKind::DocumentSave => "NotebookSaveEvent",
            EventKind::DocumentScroll => "NotebookScrollEvent",
            EventKind::DocumentVisible => "NotebookVisibleEvent",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEventKind(pub String);

impl fmt::Display for UnknownEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown event kind '{}'", self.0)
    }
}

impl std::error::Error for UnknownEventKind {}

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    /// Accepts the wire names plus `Document*Event` spellings of the notebook events.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(kind) = EventKind::ALL.iter().find(|k| k.as_str() == s) {
            return Ok(*kind);
        }
        match s {
            "DocumentHiddenEvent" => Ok(EventKind::DocumentHidden),
            "DocumentOpenEvent" => Ok(EventKind::DocumentOpen),
            "DocumentSaveEvent" => Ok(EventKind::DocumentSave),
            "DocumentScrollEvent" => Ok(EventKind::DocumentScroll),
            "DocumentVisibleEvent" => Ok(EventKind::DocumentVisible),
            other => Err(UnknownEventKind(other.to_string())),
        }
    }
}

/// Reference to a cell by stable id and current position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRef {
    pub id: String,
    pub index: usize,
}

impl CellRef {
    pub fn new(id: impl Into<String>, index: usize) -> Self {
        Self {
            id: id.into(),
            index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedCell {
    pub index: usize,
}

/// One replaced range of a cell's text, in character offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChange {
    pub from: usize,
    pub to: usize,
    pub insert: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KernelError {
    pub error_name: String,
    pub error_value: String,
}

/// Either the full text of a cell (split into lines) or the changes applied to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EditChange {
    Snapshot { doc: Vec<String> },
    Change { changes: Vec<TextChange> },
}

impl EditChange {
    pub fn snapshot_of(source: &str) -> Self {
        EditChange::Snapshot {
            doc: source.split('\n').map(str::to_string).collect(),
        }
    }

    pub fn is_snapshot(&self) -> bool {
        matches!(self, EditChange::Snapshot { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellEditInfo {
    pub index: usize,
    pub id: String,
    #[serde(flatten)]
    pub change: EditChange,
}

/// Kind-specific payload. Serialized untagged; the event name carries the discriminant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventInfo {
    Cells {
        cells: Vec<CellRef>,
    },
    Removed {
        cells: Vec<RemovedCell>,
    },
    Edit(CellEditInfo),
    Execution {
        cells: Vec<CellRef>,
        success: bool,
        #[serde(rename = "kernelError")]
        kernel_error: Option<KernelError>,
    },
    Clipboard {
        cells: Vec<CellRef>,
        selection: String,
    },
    Environment {
        environ: Value,
    },
    Empty {},
}

/// A single telemetry event. Built once per signal and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    #[serde(rename = "eventName")]
    name: EventKind,
    #[serde(rename = "eventTime")]
    time: u64,
    #[serde(rename = "eventInfo")]
    info: EventInfo,
}

impl Event {
    pub fn new(name: EventKind, info: EventInfo) -> Self {
        Self::at(name, now_millis(), info)
    }

    pub fn at(name: EventKind, time: u64, info: EventInfo) -> Self {
        Self { name, time, info }
    }

    pub fn name(&self) -> EventKind {
        self.name
    }

    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn info(&self) -> &EventInfo {
        &self.info
    }
}
