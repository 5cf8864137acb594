//! Viewport geometry and the visible-cell computation.

use serde::{Deserialize, Serialize};

use crate::telemetry::events::CellRef;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub scroll_top: f64,
    pub client_height: f64,
}

impl Viewport {
    pub fn new(scroll_top: f64, client_height: f64) -> Self {
        Self {
            scroll_top,
            client_height,
        }
    }

    pub fn top(&self) -> f64 {
        self.scroll_top
    }

    pub fn bottom(&self) -> f64 {
        self.scroll_top + self.client_height
    }
}

/// Vertical extent of one rendered cell, in the scroll container's coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct CellGeometry {
    pub cell: CellRef,
    pub top: f64,
    pub bottom: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentLayout {
    pub viewport: Viewport,
    pub cells: Vec<CellGeometry>,
}

impl DocumentLayout {
    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn visible_cells(&self) -> Vec<CellRef> {
        self.cells
            .iter()
            .filter(|geometry| {
                is_visible(
                    geometry.top,
                    geometry.bottom,
                    self.viewport.top(),
                    self.viewport.bottom(),
                )
            })
            .map(|geometry| geometry.cell.clone())
            .collect()
    }
}

/// Inclusive interval overlap between a cell and the scroll window.
pub fn is_visible(cell_top: f64, cell_bottom: f64, view_top: f64, view_bottom: f64) -> bool {
    cell_top <= view_bottom && cell_bottom >= view_top
}
