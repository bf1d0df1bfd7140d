//! Editor state management.
//!
//! [`EditorState`] is what the rendering layer talks to. It owns one
//! [`Diagram`] together with its selection, undo/redo history, clipboard and
//! outgoing event queue, and turns user gestures into recorded, validated
//! graph edits.

use std::collections::HashMap;
use std::rc::Rc;

use log::{info, warn};
use serde::Deserialize;

use super::block_catalog::{BlockCatalog, BlockTemplate};
use super::events::{DiagramEvent, EventQueue};
use super::history::CommandHistory;
use super::operations::{Alignment, CanvasLimits, Diagram};
use super::selection::EditorSelection;
use crate::config::{CanvasBounds, EditorConfig};
use crate::error::{DiagramError, Result};
use crate::model::{Block, BlockId, Connector, ConnectorId, PendingConnector, Point, Rect};

// ────────────────────────────────────────────────────────────────────────────
// Context
// ────────────────────────────────────────────────────────────────────────────

/// Everything an editor needs from its host, passed in explicitly.
#[derive(Clone)]
pub struct EditorContext {
    pub config: EditorConfig,
    pub catalog: Rc<BlockCatalog>,
    /// Canvas size as currently reported by the rendering layer.
    pub canvas: Rc<dyn CanvasBounds>,
}

impl EditorContext {
    /// Built-in catalog, canvas bounds taken from `config`.
    pub fn with_config(config: EditorConfig) -> Self {
        Self::new(config.clone(), BlockCatalog::builtin(), Rc::new(config))
    }

    pub fn new(config: EditorConfig, catalog: BlockCatalog, canvas: Rc<dyn CanvasBounds>) -> Self {
        Self {
            config,
            catalog: Rc::new(catalog),
            canvas,
        }
    }
}

impl Default for EditorContext {
    fn default() -> Self {
        Self::with_config(EditorConfig::default())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Clipboard
// ────────────────────────────────────────────────────────────────────────────

/// Clipboard contents for copy/paste. Items are held by shared reference,
/// exactly as they were when copied.
#[derive(Debug, Clone, Default)]
pub struct EditorClipboard {
    pub blocks: Vec<Rc<Block>>,
    pub connectors: Vec<Rc<Connector>>,
}

impl EditorClipboard {
    pub fn has_content(&self) -> bool {
        !self.blocks.is_empty()
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
        self.connectors.clear();
    }
}

/// Arrow-key direction for nudging the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

// ────────────────────────────────────────────────────────────────────────────
// EditorState
// ────────────────────────────────────────────────────────────────────────────

/// The complete editing state of one open document.
///
/// # Example
///
/// ```rust,ignore
/// use flowcanvas::editor::{EditorContext, EditorState};
/// use flowcanvas::model::Point;
///
/// let mut state = EditorState::new(EditorContext::default());
/// let a = state.insert_block("new_double", Point::new(10.0, 10.0))?;
/// let b = state.insert_block("print_double", Point::new(200.0, 10.0))?;
/// state.start_connection(a, 0);
/// state.end_connection(b, 0)?;
/// state.undo();
/// ```
pub struct EditorState {
    pub diagram: Diagram,
    pub selection: EditorSelection,
    pub history: CommandHistory,
    pub clipboard: EditorClipboard,
    context: EditorContext,
    events: EventQueue,
}

impl EditorState {
    pub fn new(context: EditorContext) -> Self {
        let port_types = Rc::new(context.catalog.port_types().clone());
        Self {
            diagram: Diagram::new(port_types),
            selection: EditorSelection::new(),
            history: CommandHistory::new(),
            clipboard: EditorClipboard::default(),
            context,
            events: EventQueue::new(),
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.context.config
    }

    pub fn catalog(&self) -> &BlockCatalog {
        &self.context.catalog
    }

    /// Take the notifications produced since the last call.
    pub fn drain_events(&mut self) -> Vec<DiagramEvent> {
        self.events.drain()
    }

    pub fn is_modified(&self) -> bool {
        self.history.is_modified()
    }

    /// Record that the document was saved. History is kept.
    pub fn mark_saved(&mut self) {
        self.history.mark_saved();
    }

    fn limits(&self) -> CanvasLimits {
        let (width, height) = self.context.canvas.canvas_size();
        CanvasLimits {
            width,
            height,
            margin: self.context.config.block_margin,
        }
    }

    fn report<T>(&mut self, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => self.events.changed(),
            Err(e) => self.events.failed(e),
        }
        result
    }

    // ── Blocks ───────────────────────────────────────────────────────────

    /// Add a block of catalog kind `kind` at `position`.
    pub fn insert_block(&mut self, kind: &str, position: Point) -> Result<BlockId> {
        let Some(template) = self.context.catalog.get(kind).cloned() else {
            let err = DiagramError::UnknownTemplate(kind.to_string());
            self.events.failed(&err);
            return Err(err);
        };
        self.insert_template(&template, position)
    }

    /// Add a block built from an arbitrary template (e.g. one dropped from a
    /// plugin palette that is not in the catalog).
    pub fn insert_template(&mut self, template: &BlockTemplate, position: Point) -> Result<BlockId> {
        let block = template.instantiate(position, self.context.config.default_block_size);
        let snapshot = self.diagram.snapshot("Add");
        let result = self.diagram.insert_block(block, None);
        if result.is_ok() {
            self.history.push(snapshot);
        }
        self.report(result)
    }

    // ── Connections ──────────────────────────────────────────────────────

    /// Begin dragging a connection out of an output port.
    pub fn start_connection(&mut self, block: BlockId, output: usize) -> Option<&PendingConnector> {
        let aborted = self.diagram.pending().is_some();
        let started = self.diagram.start_connection(block, output).is_some();
        if started || aborted {
            self.events.changed();
        }
        if started { self.diagram.pending() } else { None }
    }

    pub fn update_connection(&mut self, point: Point) {
        if self.diagram.pending().is_some() {
            self.diagram.update_tracking(point);
            self.events.changed();
        }
    }

    /// Drop the loose end on an input port.
    pub fn end_connection(&mut self, block: BlockId, input: usize) -> Result<ConnectorId> {
        let snapshot = self.diagram.snapshot("Connect");
        let result = self.diagram.end_connection(block, input);
        if result.is_ok() {
            self.history.push(snapshot);
        }
        self.report(result)
    }

    /// Cancel the connection being drawn (Escape, or a click on empty canvas).
    pub fn abort_connection(&mut self) {
        if self.diagram.abort_connection() {
            self.events.changed();
        }
    }

    // ── Selection ────────────────────────────────────────────────────────

    pub fn select_rectangle(&mut self, rect: &Rect) {
        self.selection.select_in_rect(&self.diagram, rect);
        self.events.changed();
    }

    pub fn select_all(&mut self) {
        self.selection.select_all(&self.diagram);
        self.events.changed();
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
        self.events.changed();
    }

    // ── Bulk operations ──────────────────────────────────────────────────

    /// Delete every selected connector and block (with its connectors).
    pub fn delete(&mut self) {
        self.selection.retain_existing(&self.diagram);
        if self.selection.is_empty() {
            return;
        }
        self.history.record(&self.diagram, "Delete");
        self.delete_selected_items();
        self.events.changed();
    }

    fn delete_selected_items(&mut self) {
        for id in std::mem::take(&mut self.selection.selected_connectors) {
            self.diagram.delete_connection(id);
        }
        for id in std::mem::take(&mut self.selection.selected_blocks) {
            self.diagram.delete_block(id);
        }
        self.selection.clear();
    }

    /// Translate the selected blocks, each clamped to the canvas.
    pub fn move_selected(&mut self, dx: f64, dy: f64) {
        if self.selection.selected_blocks.is_empty() {
            return;
        }
        let limits = self.limits();
        let snapshot = self.diagram.snapshot("Move blocks");
        let ids = self.selection.selected_blocks.clone();
        let moved = self.diagram.move_blocks(&ids, dx, dy, &limits);
        let normalized = self.diagram.normalize_origin();
        if moved || normalized {
            self.history.push(snapshot);
            self.events.changed();
        }
    }

    /// Arrow-key nudge: one grid step, or five with `coarse`.
    pub fn nudge(&mut self, direction: Direction, coarse: bool) {
        let step = self.context.config.grid_size * if coarse { 5.0 } else { 1.0 };
        let (dx, dy) = match direction {
            Direction::Up => (0.0, -step),
            Direction::Down => (0.0, step),
            Direction::Left => (-step, 0.0),
            Direction::Right => (step, 0.0),
        };
        self.move_selected(dx, dy);
    }

    pub fn align_top(&mut self) {
        self.align(Alignment::Top, "Align top");
    }

    pub fn align_bottom(&mut self) {
        self.align(Alignment::Bottom, "Align bottom");
    }

    pub fn align_left(&mut self) {
        self.align(Alignment::Left, "Align left");
    }

    pub fn align_right(&mut self) {
        self.align(Alignment::Right, "Align right");
    }

    fn align(&mut self, alignment: Alignment, description: &str) {
        if self.selection.selected_blocks.is_empty() {
            return;
        }
        let snapshot = self.diagram.snapshot(description);
        let ids = self.selection.selected_blocks.clone();
        if self.diagram.align(&ids, alignment) {
            self.diagram.normalize_origin();
            self.history.push(snapshot);
            self.events.changed();
        }
    }

    // ── Clipboard ────────────────────────────────────────────────────────

    /// Copy the selection to the clipboard by reference.
    pub fn copy(&mut self) {
        self.clipboard.clear();
        for &id in &self.selection.selected_blocks {
            if let Some(block) = self.diagram.block_rc(id) {
                self.clipboard.blocks.push(Rc::clone(block));
            }
        }
        for &id in &self.selection.selected_connectors {
            if let Some(connector) = self.diagram.connector_rc(id) {
                self.clipboard.connectors.push(Rc::clone(connector));
            }
        }
    }

    /// Copy the selection, then delete it.
    pub fn cut(&mut self) {
        self.selection.retain_existing(&self.diagram);
        if self.selection.is_empty() {
            return;
        }
        self.history.record(&self.diagram, "Cut");
        self.copy();
        self.delete_selected_items();
        self.events.changed();
    }

    /// Paste clones of the clipboard blocks, offset by the configured delta,
    /// and reconnect the copied connectors whose both ends were copied.
    ///
    /// The whole paste is one undo step. If any block is rejected the
    /// diagram is rolled back and nothing is pasted.
    pub fn paste(&mut self) {
        if !self.clipboard.has_content() {
            return;
        }
        let offset = self.context.config.paste_offset;
        let snapshot = self.diagram.snapshot("Paste");
        let mut replace: HashMap<BlockId, BlockId> = HashMap::new();
        let mut new_blocks = Vec::new();

        for original in self.clipboard.blocks.clone() {
            let mut block = Block::clone(&original);
            block.move_by(offset, offset);
            match self.diagram.insert_block(block, None) {
                Ok(id) => {
                    replace.insert(original.id, id);
                    new_blocks.push(id);
                }
                Err(e) => {
                    warn!("Paste aborted: {e}");
                    self.diagram.restore(snapshot);
                    self.events.failed(&e);
                    return;
                }
            }
        }

        let mut new_connectors = Vec::new();
        for c in self.clipboard.connectors.clone() {
            let (Some(&source), Some(&sink)) = (replace.get(&c.source), replace.get(&c.sink)) else {
                continue;
            };
            match self.diagram.connect(source, c.source_port, sink, c.sink_port) {
                Ok(id) => new_connectors.push(id),
                Err(e) => info!("Skipped pasted connector {}: {e}", c.id),
            }
        }

        self.history.push(snapshot);
        self.selection.clear();
        self.selection.selected_blocks = new_blocks;
        self.selection.selected_connectors = new_connectors;
        self.events.changed();
    }

    // ── History ──────────────────────────────────────────────────────────

    pub fn undo(&mut self) {
        if self.history.undo(&mut self.diagram).is_some() {
            self.selection.retain_existing(&self.diagram);
            self.events.changed();
        }
    }

    pub fn redo(&mut self) {
        if self.history.redo(&mut self.diagram).is_some() {
            self.selection.retain_existing(&self.diagram);
            self.events.changed();
        }
    }
}
