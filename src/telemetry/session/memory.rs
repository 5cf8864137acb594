//! In-memory notebook session.
//!
//! Holds a notebook model, applies mutations the way a notebook host would and
//! broadcasts the matching [`SessionSignal`]s. Used by the `replay` command and
//! by the test suites.

use std::path::Path;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::sync::{broadcast, watch};
use tracing::trace;

use crate::error::TelemetryError;
use crate::telemetry::events::{CellRef, KernelError, TextChange};
use crate::telemetry::session::layout::{CellGeometry, DocumentLayout, Viewport};
use crate::telemetry::session::{CellSnapshot, ClipboardAction, SaveState, Session, SessionSignal};
use crate::telemetry::types::new_session_id;

const SIGNAL_CAPACITY: usize = 256;

fn default_cell_type() -> String {
    "code".to_string()
}

fn default_cell_height() -> f64 {
    120.0
}

fn default_viewport_height() -> f64 {
    800.0
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct CellSeed {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default = "default_cell_type")]
    pub cell_type: String,
    #[serde(default)]
    pub source: String,
    #[serde(default = "default_cell_height")]
    pub height: f64,
}

impl CellSeed {
    pub fn code(source: impl Into<String>) -> Self {
        Self {
            id: None,
            cell_type: default_cell_type(),
            source: source.into(),
            height: default_cell_height(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_height(mut self, height: f64) -> Self {
        self.height = height;
        self
    }
}

/// Initial notebook contents for a [`MemorySession`].
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentSeed {
    pub path: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub cells: Vec<CellSeed>,
    #[serde(default = "default_viewport_height")]
    pub viewport_height: f64,
    #[serde(default = "default_true")]
    pub attached: bool,
}

impl DocumentSeed {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            session_id: None,
            metadata: Map::new(),
            cells: Vec::new(),
            viewport_height: default_viewport_height(),
            attached: true,
        }
    }

    pub fn with_cell(mut self, cell: CellSeed) -> Self {
        self.cells.push(cell);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn with_viewport_height(mut self, height: f64) -> Self {
        self.viewport_height = height;
        self
    }

    pub fn from_file(path: &Path) -> Result<Self, TelemetryError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[derive(Debug, Clone)]
struct MemoryCell {
    id: String,
    cell_type: String,
    source: String,
    height: f64,
}

#[derive(Debug)]
struct DocumentModel {
    cells: Vec<MemoryCell>,
    active: Option<usize>,
    metadata: Map<String, Value>,
    viewport: Viewport,
    attached: bool,
    disposed: bool,
    save_state: Option<SaveState>,
    next_cell_id: u64,
}

impl DocumentModel {
    fn fresh_id(&mut self) -> String {
        loop {
            let candidate = format!("cell-{}", self.next_cell_id);
            self.next_cell_id += 1;
            if !self.cells.iter().any(|cell| cell.id == candidate) {
                return candidate;
            }
        }
    }

    fn position(&self, id: &str) -> Result<usize, TelemetryError> {
        self.cells
            .iter()
            .position(|cell| cell.id == id)
            .ok_or_else(|| TelemetryError::InvalidCell(format!("no cell with id '{id}'")))
    }

    fn cell_ref(&self, index: usize) -> CellRef {
        CellRef::new(self.cells[index].id.clone(), index)
    }
}

pub struct MemorySession {
    session_id: Option<String>,
    path: String,
    model: RwLock<DocumentModel>,
    signals: Mutex<Option<broadcast::Sender<SessionSignal>>>,
    ready: watch::Sender<bool>,
}

impl MemorySession {
    pub fn new(seed: DocumentSeed) -> Self {
        let mut model = DocumentModel {
            cells: Vec::with_capacity(seed.cells.len()),
            active: None,
            metadata: seed.metadata,
            viewport: Viewport::new(0.0, seed.viewport_height),
            attached: seed.attached,
            disposed: false,
            save_state: None,
            next_cell_id: 1,
        };
        for cell in seed.cells {
            let id = match cell.id {
                Some(id) => id,
                None => model.fresh_id(),
            };
            model.cells.push(MemoryCell {
                id,
                cell_type: cell.cell_type,
                source: cell.source,
                height: cell.height,
            });
        }
        if !model.cells.is_empty() {
            model.active = Some(0);
        }
        let (sender, _) = broadcast::channel(SIGNAL_CAPACITY);
        let (ready, _) = watch::channel(false);
        Self {
            session_id: seed.session_id.or_else(|| Some(new_session_id())),
            path: seed.path,
            model: RwLock::new(model),
            signals: Mutex::new(Some(sender)),
            ready,
        }
    }

    fn emit(&self, signal: SessionSignal) {
        if let Some(sender) = self.signals.lock().as_ref() {
            if sender.send(signal).is_err() {
                trace!(path = %self.path, "session signal emitted with no subscribers");
            }
        }
    }

    /// Insert a cell at `index`, shifting later cells down.
    pub fn insert_cell(
        &self,
        index: usize,
        id: Option<String>,
        source: impl Into<String>,
    ) -> Result<CellRef, TelemetryError> {
        let source = source.into();
        let cell = {
            let mut model = self.model.write();
            if index > model.cells.len() {
                return Err(TelemetryError::InvalidCell(format!(
                    "insert index {index} is past the end ({} cells)",
                    model.cells.len()
                )));
            }
            let id = match id {
                Some(id) => id,
                None => model.fresh_id(),
            };
            model.cells.insert(
                index,
                MemoryCell {
                    id,
                    cell_type: default_cell_type(),
                    source: source.clone(),
                    height: default_cell_height(),
                },
            );
            if let Some(active) = model.active.as_mut() {
                if *active >= index {
                    *active += 1;
                }
            }
            model.cell_ref(index)
        };
        self.emit(SessionSignal::CellInserted {
            cell: cell.clone(),
            source,
        });
        Ok(cell)
    }

    pub fn remove_cell(&self, index: usize) -> Result<CellRef, TelemetryError> {
        let removed = {
            let mut model = self.model.write();
            if index >= model.cells.len() {
                return Err(TelemetryError::InvalidCell(format!(
                    "remove index {index} out of range ({} cells)",
                    model.cells.len()
                )));
            }
            let removed = model.cell_ref(index);
            model.cells.remove(index);
            let remaining = model.cells.len();
            model.active = match model.active {
                _ if remaining == 0 => None,
                Some(active) if active > index => Some(active - 1),
                Some(active) => Some(active.min(remaining - 1)),
                None => None,
            };
            removed
        };
        self.emit(SessionSignal::CellRemoved {
            id: removed.id.clone(),
            index: removed.index,
        });
        Ok(removed)
    }

    /// Replace characters `from..to` of the cell's text with `insert`.
    pub fn edit_cell(&self, id: &str, change: TextChange) -> Result<CellRef, TelemetryError> {
        let cell = {
            let mut model = self.model.write();
            let index = model.position(id)?;
            let source = &mut model.cells[index].source;
            let length = source.chars().count();
            if change.from > change.to || change.to > length {
                return Err(TelemetryError::InvalidCell(format!(
                    "edit range {}..{} outside cell '{id}' of length {length}",
                    change.from, change.to
                )));
            }
            let start = char_to_byte(source, change.from);
            let end = char_to_byte(source, change.to);
            source.replace_range(start..end, &change.insert);
            model.cell_ref(index)
        };
        self.emit(SessionSignal::CellContentChanged {
            cell: cell.clone(),
            changes: vec![change],
        });
        Ok(cell)
    }

    pub fn activate(&self, index: usize) -> Result<CellRef, TelemetryError> {
        let cell = {
            let mut model = self.model.write();
            if index >= model.cells.len() {
                return Err(TelemetryError::InvalidCell(format!(
                    "activate index {index} out of range ({} cells)",
                    model.cells.len()
                )));
            }
            model.active = Some(index);
            model.cell_ref(index)
        };
        self.emit(SessionSignal::ActiveCellChanged(Some(cell.clone())));
        Ok(cell)
    }

    /// Report that the kernel finished running the cell.
    pub fn execute(
        &self,
        id: &str,
        success: bool,
        error: Option<KernelError>,
    ) -> Result<CellRef, TelemetryError> {
        let cell = {
            let model = self.model.read();
            let index = model.position(id)?;
            model.cell_ref(index)
        };
        self.emit(SessionSignal::ExecutionCompleted {
            cell: cell.clone(),
            success,
            error,
        });
        Ok(cell)
    }

    pub fn clipboard(&self, action: ClipboardAction, selection: impl Into<String>) {
        self.emit(SessionSignal::Clipboard {
            action,
            selection: selection.into(),
            cell: self.active_cell(),
        });
    }

    pub fn set_hidden(&self, hidden: bool) {
        self.emit(SessionSignal::VisibilityChanged {
            hidden,
            visible: self.layout().visible_cells(),
            attached: self.is_attached(),
        });
    }

    /// Whether this notebook's root is the one attached to the page.
    pub fn set_attached(&self, attached: bool) {
        self.model.write().attached = attached;
    }

    pub fn save(&self, state: SaveState) {
        self.model.write().save_state = Some(state);
        self.emit(SessionSignal::SaveStateChanged(state));
    }

    pub fn scroll_to(&self, scroll_top: f64) {
        let viewport = {
            let mut model = self.model.write();
            model.viewport.scroll_top = scroll_top.max(0.0);
            model.viewport
        };
        self.emit(SessionSignal::Scrolled(viewport));
    }

    pub fn set_metadata(&self, key: impl Into<String>, value: Value) {
        self.model.write().metadata.insert(key.into(), value);
    }

    pub fn last_save_state(&self) -> Option<SaveState> {
        self.model.read().save_state
    }

    pub fn mark_ready(&self) {
        self.ready.send_replace(true);
    }

    /// Dispose the session. Closes the signal channel so producer loops end.
    pub fn dispose(&self) {
        self.model.write().disposed = true;
        self.signals.lock().take();
    }
}

fn char_to_byte(text: &str, char_offset: usize) -> usize {
    text.char_indices()
        .nth(char_offset)
        .map(|(byte, _)| byte)
        .unwrap_or(text.len())
}

#[async_trait]
impl Session for MemorySession {
    fn session_id(&self) -> Option<String> {
        self.session_id.clone()
    }

    fn document_path(&self) -> String {
        self.path.clone()
    }

    fn metadata(&self, key: &str) -> Option<Value> {
        self.model.read().metadata.get(key).cloned()
    }

    fn document_content(&self) -> Value {
        let model = self.model.read();
        let cells: Vec<Value> = model
            .cells
            .iter()
            .map(|cell| {
                json!({
                    "id": cell.id,
                    "cell_type": cell.cell_type,
                    "source": cell.source,
                    "metadata": {},
                })
            })
            .collect();
        json!({
            "cells": cells,
            "metadata": Value::Object(model.metadata.clone()),
            "nbformat": 4,
            "nbformat_minor": 5,
        })
    }

    fn cells(&self) -> Vec<CellSnapshot> {
        let model = self.model.read();
        model
            .cells
            .iter()
            .enumerate()
            .map(|(index, cell)| CellSnapshot {
                cell: CellRef::new(cell.id.clone(), index),
                source: cell.source.clone(),
            })
            .collect()
    }

    fn active_cell(&self) -> Option<CellRef> {
        let model = self.model.read();
        model.active.map(|index| model.cell_ref(index))
    }

    fn layout(&self) -> DocumentLayout {
        let model = self.model.read();
        let mut top = 0.0;
        let cells = model
            .cells
            .iter()
            .enumerate()
            .map(|(index, cell)| {
                let geometry = CellGeometry {
                    cell: CellRef::new(cell.id.clone(), index),
                    top,
                    bottom: top + cell.height,
                };
                top += cell.height;
                geometry
            })
            .collect();
        DocumentLayout {
            viewport: model.viewport,
            cells,
        }
    }

    fn is_attached(&self) -> bool {
        self.model.read().attached
    }

    fn is_disposed(&self) -> bool {
        self.model.read().disposed
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionSignal> {
        match self.signals.lock().as_ref() {
            Some(sender) => sender.subscribe(),
            None => {
                let (sender, receiver) = broadcast::channel(1);
                drop(sender);
                receiver
            }
        }
    }

    async fn ready(&self) {
        let mut receiver = self.ready.subscribe();
        if receiver.wait_for(|ready| *ready).await.is_err() {
            trace!(path = %self.path, "ready channel closed before the notebook loaded");
        }
    }
}
