//! Diagram editing engine.
//!
//! This module holds everything a visual block editor needs below its
//! rendering layer:
//!
//! - **Block catalog**: templates that blocks are instantiated from
//! - **Diagram**: blocks, committed connectors and the in-flight connection
//! - **Validation**: single-language, single-sink, acyclic, type-safe wiring
//! - **Selection**: rectangle selection of blocks and connectors
//! - **Bulk operations**: move, align, delete, cut, copy and paste
//! - **Undo/Redo**: snapshot history with one entry per user action
//! - **Events**: redraw and validation notifications for the host

pub mod block_catalog;
pub mod events;
pub mod history;
pub mod operations;
pub mod selection;
pub mod state;

pub use block_catalog::{BlockCatalog, BlockCatalogCategory, BlockKind, BlockTemplate};
pub use events::{DiagramEvent, EventQueue};
pub use history::{CommandHistory, Snapshot};
pub use operations::{Alignment, CanvasLimits, Diagram, check_limit};
pub use selection::{EditorSelection, SelectionRect, blocks_in_rect, connectors_in_rect};
pub use state::{Direction, EditorClipboard, EditorContext, EditorState};
