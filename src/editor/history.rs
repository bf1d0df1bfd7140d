//! Undo/redo history using whole-graph snapshots.
//!
//! Each user-level action records the graph as it was *before* the action,
//! so a compound edit (paste of several blocks and connectors, a bulk move)
//! is a single undo step. Snapshots share unchanged blocks with the live
//! diagram through `Rc`, so recording is cheap.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut history = CommandHistory::new();
//! history.record(&diagram, "Add");
//! diagram.insert_block(block, None)?;
//! history.undo(&mut diagram); // the block is gone again
//! history.redo(&mut diagram); // and back, with the same id
//! ```

use std::rc::Rc;

use indexmap::IndexMap;
use log::debug;

use super::operations::Diagram;
use crate::model::{Block, BlockId, Connector};

/// Blocks and connectors of a diagram at one point in time.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub blocks: IndexMap<BlockId, Rc<Block>>,
    pub connectors: Vec<Rc<Connector>>,
    /// Label of the action this snapshot precedes (e.g. `"Move blocks"`).
    pub description: String,
}

/// Undo and redo stacks plus the document's modified flag.
///
/// The stacks are only cleared when the document is reloaded; saving just
/// resets the modified flag.
#[derive(Debug, Clone, Default)]
pub struct CommandHistory {
    undo_stack: Vec<Snapshot>,
    redo_stack: Vec<Snapshot>,
    modified: bool,
}

impl CommandHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current state of `diagram` before a user action.
    pub fn record(&mut self, diagram: &Diagram, description: &str) {
        self.push(diagram.snapshot(description));
    }

    /// Push an already captured snapshot. Any redo history is discarded
    /// because a new action branches off from the current state.
    pub fn push(&mut self, snapshot: Snapshot) {
        debug!("Do: {}", snapshot.description);
        self.undo_stack.push(snapshot);
        self.redo_stack.clear();
        self.modified = true;
    }

    /// Restore the most recent snapshot. Returns its description, or `None`
    /// if there was nothing to undo.
    pub fn undo(&mut self, diagram: &mut Diagram) -> Option<String> {
        let snapshot = self.undo_stack.pop()?;
        let description = snapshot.description.clone();
        let current = diagram.restore(snapshot);
        self.redo_stack.push(current);
        // No history left is taken to mean "same as last save".
        self.modified = !self.undo_stack.is_empty();
        debug!("Undo: {}", description);
        Some(description)
    }

    /// Re-apply the most recently undone action.
    pub fn redo(&mut self, diagram: &mut Diagram) -> Option<String> {
        let snapshot = self.redo_stack.pop()?;
        let description = snapshot.description.clone();
        let current = diagram.restore(snapshot);
        self.undo_stack.push(current);
        self.modified = true;
        debug!("Redo: {}", description);
        Some(description)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Description of the action `undo` would revert.
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.last().map(|s| s.description.as_str())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.last().map(|s| s.description.as_str())
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Clear the modified flag after the document was saved.
    pub fn mark_saved(&mut self) {
        self.modified = false;
    }

    /// Drop all history, as happens when the document is reloaded.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.modified = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Point, Port, Size};
    use crate::port_types::{PortTypeInfo, PortTypeRegistry};

    fn make_diagram() -> Diagram {
        Diagram::new(Rc::new(PortTypeRegistry::from_definitions([PortTypeInfo::new(
            "double", "Double", false,
        )])))
    }

    fn make_block(x: f64) -> Block {
        Block {
            id: BlockId::default(),
            kind: "gain".to_string(),
            label: "Gain".to_string(),
            language: "c".to_string(),
            in_ports: vec![Port::new("double", "i0", "")],
            out_ports: vec![Port::new("double", "o0", "")],
            position: Point::new(x, 0.0),
            size: Size::default(),
        }
    }

    #[test]
    fn test_new_history_is_empty() {
        let h = CommandHistory::new();
        assert!(!h.can_undo());
        assert!(!h.can_redo());
        assert!(!h.is_modified());
    }

    #[test]
    fn test_undo_redo_insert() {
        let mut d = make_diagram();
        let mut h = CommandHistory::new();
        h.record(&d, "Add");
        let id = d.insert_block(make_block(0.0), None).unwrap();
        assert!(h.is_modified());

        assert_eq!(h.undo(&mut d).as_deref(), Some("Add"));
        assert_eq!(d.block_count(), 0);
        assert!(!h.is_modified());
        assert_eq!(h.redo_description(), Some("Add"));

        assert_eq!(h.redo(&mut d).as_deref(), Some("Add"));
        assert_eq!(d.block(id).map(|b| b.id), Some(id));
        assert!(h.is_modified());
    }

    #[test]
    fn test_undo_on_empty_is_noop() {
        let mut d = make_diagram();
        let mut h = CommandHistory::new();
        assert!(h.undo(&mut d).is_none());
        assert!(h.redo(&mut d).is_none());
    }

    #[test]
    fn test_record_clears_redo() {
        let mut d = make_diagram();
        let mut h = CommandHistory::new();
        h.record(&d, "Add");
        d.insert_block(make_block(0.0), None).unwrap();
        h.undo(&mut d);
        assert!(h.can_redo());
        h.record(&d, "Add");
        d.insert_block(make_block(10.0), None).unwrap();
        assert!(!h.can_redo());
    }

    #[test]
    fn test_modified_stays_set_with_remaining_history() {
        let mut d = make_diagram();
        let mut h = CommandHistory::new();
        h.record(&d, "Add");
        d.insert_block(make_block(0.0), None).unwrap();
        h.record(&d, "Add");
        d.insert_block(make_block(10.0), None).unwrap();
        h.undo(&mut d);
        assert!(h.is_modified());
        assert_eq!(h.undo_description(), Some("Add"));
        h.undo(&mut d);
        assert!(!h.is_modified());
    }

    #[test]
    fn test_mark_saved_keeps_stacks() {
        let mut d = make_diagram();
        let mut h = CommandHistory::new();
        h.record(&d, "Add");
        d.insert_block(make_block(0.0), None).unwrap();
        h.mark_saved();
        assert!(!h.is_modified());
        assert!(h.can_undo());
        h.clear();
        assert!(!h.can_undo());
    }

    #[test]
    fn test_undo_redo_connection() {
        let mut d = make_diagram();
        let mut h = CommandHistory::new();
        let a = d.insert_block(make_block(0.0), None).unwrap();
        let b = d.insert_block(make_block(200.0), None).unwrap();
        h.record(&d, "Connect");
        d.connect(a, 0, b, 0).unwrap();
        h.undo(&mut d);
        assert_eq!(d.connector_count(), 0);
        h.redo(&mut d);
        assert_eq!(d.connector_count(), 1);
    }
}
