//! Graph engine for visual block-diagram editors.
//!
//! This crate provides the model behind a dataflow canvas: typed blocks,
//! validated connectors, selection, bulk editing and undo/redo. Drawing is
//! left to the host; it drives an [`editor::EditorState`] and redraws on the
//! events it drains from it.
//!
//! The binary `flowcanvas` replays a JSON script of editor commands and prints
//! the resulting diagram as JSON.

pub mod config;
pub mod editor;
pub mod error;
pub mod model;
pub mod port_types;
pub mod script;
