//! Selection management and spatial queries.
//!
//! Provides marquee (rectangle) selection of blocks and connectors, toggling
//! and single selection, and the rectangle queries bulk operations are built
//! from. All coordinates are model coordinates; converting from screen space
//! is the rendering layer's job.
//!
//! # Usage
//!
//! ```rust,ignore
//! use flowcanvas::editor::selection::EditorSelection;
//!
//! let mut sel = EditorSelection::new();
//! sel.start_rect(10.0, 20.0);
//! sel.update_rect(300.0, 120.0);
//! sel.finish_rect(&diagram);
//! ```

use crate::model::{BlockId, ConnectorId, Point, Rect};

use super::operations::Diagram;

/// A drag-selection rectangle. The start corner is where the drag began, so
/// the end corner may lie on any side of it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionRect {
    pub start_x: f64,
    pub start_y: f64,
    pub end_x: f64,
    pub end_y: f64,
}

impl SelectionRect {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            start_x: x,
            start_y: y,
            end_x: x,
            end_y: y,
        }
    }

    pub fn update(&mut self, x: f64, y: f64) {
        self.end_x = x;
        self.end_y = y;
    }

    /// Normalized bounds, independent of drag direction.
    pub fn normalized(&self) -> Rect {
        Rect::from_corners(
            Point::new(self.start_x, self.start_y),
            Point::new(self.end_x, self.end_y),
        )
    }
}

/// Blocks whose bounds intersect `rect`, in diagram order.
pub fn blocks_in_rect(diagram: &Diagram, rect: &Rect) -> Vec<BlockId> {
    diagram
        .blocks()
        .filter(|b| b.bounds().intersects(rect))
        .map(|b| b.id)
        .collect()
}

/// Connectors whose drawn segment's bounding box intersects `rect`.
///
/// Connectors are drawn between their two anchors, so the bounding box test
/// is exact for the straight and orthogonal routes the canvas uses.
pub fn connectors_in_rect(diagram: &Diagram, rect: &Rect) -> Vec<ConnectorId> {
    diagram
        .connectors()
        .filter(|c| {
            diagram
                .connector_segment(c)
                .is_some_and(|(from, to)| Rect::from_corners(from, to).intersects(rect))
        })
        .map(|c| c.id)
        .collect()
}

/// Tracks which blocks and connectors are selected, in selection order.
#[derive(Debug, Clone, Default)]
pub struct EditorSelection {
    pub selected_blocks: Vec<BlockId>,
    pub selected_connectors: Vec<ConnectorId>,
    /// Active drag-selection rectangle, if any.
    pub selection_rect: Option<SelectionRect>,
}

impl EditorSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.selected_blocks.clear();
        self.selected_connectors.clear();
        self.selection_rect = None;
    }

    pub fn is_empty(&self) -> bool {
        self.selected_blocks.is_empty() && self.selected_connectors.is_empty()
    }

    pub fn count(&self) -> usize {
        self.selected_blocks.len() + self.selected_connectors.len()
    }

    pub fn is_block_selected(&self, id: BlockId) -> bool {
        self.selected_blocks.contains(&id)
    }

    pub fn is_connector_selected(&self, id: ConnectorId) -> bool {
        self.selected_connectors.contains(&id)
    }

    /// Add the block if unselected, remove it otherwise (ctrl+click).
    pub fn toggle_block(&mut self, id: BlockId) {
        if let Some(pos) = self.selected_blocks.iter().position(|&b| b == id) {
            self.selected_blocks.remove(pos);
        } else {
            self.selected_blocks.push(id);
        }
    }

    pub fn toggle_connector(&mut self, id: ConnectorId) {
        if let Some(pos) = self.selected_connectors.iter().position(|&c| c == id) {
            self.selected_connectors.remove(pos);
        } else {
            self.selected_connectors.push(id);
        }
    }

    /// Select only this block.
    pub fn select_block(&mut self, id: BlockId) {
        self.selected_blocks.clear();
        self.selected_connectors.clear();
        self.selected_blocks.push(id);
    }

    /// Select only this connector.
    pub fn select_connector(&mut self, id: ConnectorId) {
        self.selected_blocks.clear();
        self.selected_connectors.clear();
        self.selected_connectors.push(id);
    }

    /// Select every block and connector of the diagram.
    pub fn select_all(&mut self, diagram: &Diagram) {
        self.selected_blocks = diagram.block_ids().collect();
        self.selected_connectors = diagram.connectors().map(|c| c.id).collect();
    }

    /// Replace the selection with everything intersecting `rect`.
    pub fn select_in_rect(&mut self, diagram: &Diagram, rect: &Rect) {
        self.selected_blocks = blocks_in_rect(diagram, rect);
        self.selected_connectors = connectors_in_rect(diagram, rect);
    }

    pub fn start_rect(&mut self, x: f64, y: f64) {
        self.selection_rect = Some(SelectionRect::new(x, y));
    }

    /// Move the free corner of the rectangle and reselect live, the way the
    /// canvas highlights items while the user is still dragging.
    pub fn update_rect(&mut self, x: f64, y: f64, diagram: &Diagram) {
        if let Some(rect) = &mut self.selection_rect {
            rect.update(x, y);
            let bounds = rect.normalized();
            self.select_in_rect(diagram, &bounds);
        }
    }

    /// End the drag, keeping whatever the rectangle covers.
    pub fn finish_rect(&mut self, diagram: &Diagram) {
        if let Some(rect) = self.selection_rect.take() {
            self.select_in_rect(diagram, &rect.normalized());
        }
    }

    /// Forget ids that no longer exist in `diagram` (after undo, redo or a
    /// cascading delete).
    pub fn retain_existing(&mut self, diagram: &Diagram) {
        self.selected_blocks.retain(|&id| diagram.contains_block(id));
        self.selected_connectors.retain(|&id| diagram.connector(id).is_some());
    }
}
