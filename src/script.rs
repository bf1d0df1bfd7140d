//! Replay of recorded editor sessions.
//!
//! A script is a JSON array of commands, each tagged by `op`:
//!
//! ```json
//! [
//!   {"op": "insert", "kind": "new_double", "x": 10, "y": 10},
//!   {"op": "insert", "kind": "print_double", "x": 200, "y": 10},
//!   {"op": "connect", "source": 0, "output": 0, "sink": 1, "input": 0},
//!   {"op": "select_all"},
//!   {"op": "move", "dx": 30, "dy": 0},
//!   {"op": "undo"}
//! ]
//! ```
//!
//! Rejected commands do not stop the replay; they are collected in the
//! report next to the final diagram.

use anyhow::{Context, Result};
use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::editor::{Alignment, DiagramEvent, Direction, EditorState};
use crate::model::{Block, BlockId, Connector, ConnectorId, Point, Rect};

/// One recorded user action.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptCommand {
    Insert {
        kind: String,
        x: f64,
        y: f64,
    },
    /// Drag from an output port and drop on an input port.
    Connect {
        source: BlockId,
        output: usize,
        sink: BlockId,
        input: usize,
    },
    StartConnection {
        source: BlockId,
        output: usize,
    },
    Track {
        x: f64,
        y: f64,
    },
    EndConnection {
        sink: BlockId,
        input: usize,
    },
    AbortConnection,
    Select {
        #[serde(default)]
        blocks: Vec<BlockId>,
        #[serde(default)]
        connectors: Vec<ConnectorId>,
    },
    SelectRect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    SelectAll,
    ClearSelection,
    Move {
        dx: f64,
        dy: f64,
    },
    Nudge {
        direction: Direction,
        #[serde(default)]
        coarse: bool,
    },
    Align {
        edge: Alignment,
    },
    Delete,
    Copy,
    Cut,
    Paste,
    Undo,
    Redo,
    Save,
}

/// Read a script file.
pub fn load_script(path: &Utf8Path) -> Result<Vec<ScriptCommand>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("Open {}", path))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path))
}

/// A command the editor rejected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepError {
    /// Zero-based index of the command in the script.
    pub step: usize,
    pub message: String,
}

/// State of the editor after a replay.
#[derive(Debug, Clone, Serialize)]
pub struct ScriptReport {
    pub language: Option<String>,
    pub blocks: Vec<Block>,
    pub connectors: Vec<Connector>,
    pub selected_blocks: Vec<BlockId>,
    pub selected_connectors: Vec<ConnectorId>,
    pub modified: bool,
    pub undo: Option<String>,
    pub redo: Option<String>,
    pub errors: Vec<StepError>,
    pub events: Vec<DiagramEvent>,
}

impl ScriptReport {
    fn capture(state: &EditorState, errors: Vec<StepError>, events: Vec<DiagramEvent>) -> Self {
        let diagram = &state.diagram;
        Self {
            language: diagram.language().map(str::to_string),
            blocks: diagram.blocks().cloned().collect(),
            connectors: diagram.connectors().cloned().collect(),
            selected_blocks: state.selection.selected_blocks.clone(),
            selected_connectors: state.selection.selected_connectors.clone(),
            modified: state.is_modified(),
            undo: state.history.undo_description().map(str::to_string),
            redo: state.history.redo_description().map(str::to_string),
            errors,
            events,
        }
    }
}

/// Apply `commands` to `state` in order.
pub fn run(state: &mut EditorState, commands: &[ScriptCommand]) -> ScriptReport {
    let mut errors = Vec::new();
    let mut events = Vec::new();
    for (step, command) in commands.iter().enumerate() {
        if let Err(message) = apply(state, command) {
            errors.push(StepError { step, message });
        }
        events.extend(state.drain_events());
    }
    ScriptReport::capture(state, errors, events)
}

fn apply(state: &mut EditorState, command: &ScriptCommand) -> std::result::Result<(), String> {
    match command {
        ScriptCommand::Insert { kind, x, y } => {
            state.insert_block(kind, Point::new(*x, *y)).map_err(|e| e.to_string())?;
        }
        ScriptCommand::Connect { source, output, sink, input } => {
            if state.start_connection(*source, *output).is_none() {
                return Err(format!("Block {source} has no output port {output}"));
            }
            state.end_connection(*sink, *input).map_err(|e| e.to_string())?;
        }
        ScriptCommand::StartConnection { source, output } => {
            if state.start_connection(*source, *output).is_none() {
                return Err(format!("Block {source} has no output port {output}"));
            }
        }
        ScriptCommand::Track { x, y } => state.update_connection(Point::new(*x, *y)),
        ScriptCommand::EndConnection { sink, input } => {
            state.end_connection(*sink, *input).map_err(|e| e.to_string())?;
        }
        ScriptCommand::AbortConnection => state.abort_connection(),
        ScriptCommand::Select { blocks, connectors } => {
            state.selection.clear();
            state.selection.selected_blocks = blocks.clone();
            state.selection.selected_connectors = connectors.clone();
            state.selection.retain_existing(&state.diagram);
        }
        ScriptCommand::SelectRect { x, y, width, height } => {
            state.select_rectangle(&Rect { x: *x, y: *y, width: *width, height: *height });
        }
        ScriptCommand::SelectAll => state.select_all(),
        ScriptCommand::ClearSelection => state.clear_selection(),
        ScriptCommand::Move { dx, dy } => state.move_selected(*dx, *dy),
        ScriptCommand::Nudge { direction, coarse } => state.nudge(*direction, *coarse),
        ScriptCommand::Align { edge } => match edge {
            Alignment::Top => state.align_top(),
            Alignment::Bottom => state.align_bottom(),
            Alignment::Left => state.align_left(),
            Alignment::Right => state.align_right(),
        },
        ScriptCommand::Delete => state.delete(),
        ScriptCommand::Copy => state.copy(),
        ScriptCommand::Cut => state.cut(),
        ScriptCommand::Paste => state.paste(),
        ScriptCommand::Undo => state.undo(),
        ScriptCommand::Redo => state.redo(),
        ScriptCommand::Save => state.mark_saved(),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::EditorContext;

    fn parse(json: &str) -> Vec<ScriptCommand> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_parse_commands() {
        let cmds = parse(
            r#"[
                {"op": "insert", "kind": "new_double", "x": 1, "y": 2},
                {"op": "nudge", "direction": "left"},
                {"op": "align", "edge": "top"},
                {"op": "select", "blocks": [0]},
                {"op": "undo"}
            ]"#,
        );
        assert_eq!(cmds.len(), 5);
        assert_eq!(cmds[0], ScriptCommand::Insert { kind: "new_double".into(), x: 1.0, y: 2.0 });
        assert_eq!(cmds[1], ScriptCommand::Nudge { direction: Direction::Left, coarse: false });
        assert_eq!(cmds[2], ScriptCommand::Align { edge: Alignment::Top });
        assert_eq!(
            cmds[3],
            ScriptCommand::Select { blocks: vec![BlockId(0)], connectors: vec![] }
        );
    }

    #[test]
    fn test_unknown_op_is_rejected() {
        let res: std::result::Result<Vec<ScriptCommand>, _> = serde_json::from_str(r#"[{"op": "explode"}]"#);
        assert!(res.is_err());
    }

    #[test]
    fn test_run_collects_errors_and_continues() {
        let cmds = parse(
            r#"[
                {"op": "insert", "kind": "new_double", "x": 10, "y": 10},
                {"op": "insert", "kind": "show_image", "x": 200, "y": 10},
                {"op": "connect", "source": 0, "output": 0, "sink": 1, "input": 0},
                {"op": "insert", "kind": "print_double", "x": 200, "y": 100},
                {"op": "connect", "source": 0, "output": 0, "sink": 2, "input": 0}
            ]"#,
        );
        let mut state = EditorState::new(EditorContext::default());
        let report = run(&mut state, &cmds);
        assert_eq!(report.blocks.len(), 3);
        assert_eq!(report.connectors.len(), 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].step, 2);
        assert!(report.errors[0].message.starts_with("Connection types mismatch"));
        assert_eq!(report.undo.as_deref(), Some("Connect"));
        assert_eq!(report.language.as_deref(), Some("c"));
        assert!(report.events.iter().any(|e| matches!(e, DiagramEvent::ValidationFailed { .. })));
    }

    #[test]
    fn test_select_ignores_missing_ids() {
        let cmds = parse(
            r#"[
                {"op": "insert", "kind": "new_double", "x": 10, "y": 10},
                {"op": "select", "blocks": [0, 5]},
                {"op": "save"}
            ]"#,
        );
        let mut state = EditorState::new(EditorContext::default());
        let report = run(&mut state, &cmds);
        assert_eq!(report.selected_blocks, vec![BlockId(0)]);
        assert!(!report.modified);
    }

    #[test]
    fn test_report_serializes() {
        let mut state = EditorState::new(EditorContext::default());
        let report = run(&mut state, &parse(r#"[{"op": "insert", "kind": "oscillator", "x": 0, "y": 0}]"#));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["language"], "javascript");
        assert_eq!(json["blocks"][0]["out_ports"][0]["type"], "sound");
        assert_eq!(json["events"][0]["event"], "graph_changed");
    }
}
