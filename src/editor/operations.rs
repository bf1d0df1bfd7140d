//! The diagram graph: blocks, committed connectors and the rules that keep
//! them valid.
//!
//! Every mutation either applies completely or is rejected before anything
//! changes. The invariants held at each mutation boundary are:
//!
//! - all blocks share the language of the first inserted block;
//! - a non-multiple input port has at most one incoming connector;
//! - no connector joins a block to itself;
//! - the committed connectors form a directed acyclic graph;
//! - both ends of a connector carry the same port type;
//! - block ids are never handed out twice.
//!
//! Blocks and connectors are held behind `Rc` so a [`Snapshot`] is a cheap
//! structural copy. Edits go through `Rc::make_mut`, which clones a block only
//! when a snapshot still shares it; untouched blocks keep their identity
//! across undo and redo.

use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use indexmap::IndexMap;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::history::Snapshot;
use crate::error::{DiagramError, PortDirection, Result};
use crate::model::{
    Block, BlockId, Connector, ConnectorId, LanguageId, PendingConnector, Point, Rect,
};
use crate::port_types::PortTypeRegistry;

/// Bounds a block's top-left corner must stay within while moving.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasLimits {
    pub width: f64,
    pub height: f64,
    /// Room reserved at the right edge for the block's rendered footprint.
    pub margin: f64,
}

/// Edge used by the align operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    Top,
    Bottom,
    Left,
    Right,
}

/// Clamp a proposed translation so that `position + (dx, dy)` stays within
/// `[0, width - margin] x [0, height]`.
///
/// A canvas narrower than the margin pins blocks to `x = 0`.
pub fn check_limit(dx: f64, dy: f64, position: Point, limits: &CanvasLimits) -> (f64, f64) {
    let max_x = (limits.width - limits.margin).max(0.0);
    let max_y = limits.height.max(0.0);
    (
        clamp_axis(dx, position.x, max_x),
        clamp_axis(dy, position.y, max_y),
    )
}

fn clamp_axis(delta: f64, current: f64, max: f64) -> f64 {
    let target = current + delta;
    if target < 0.0 {
        -current
    } else if target > max {
        max - current
    } else {
        delta
    }
}

/// The block/connector graph of one open document.
#[derive(Debug, Clone)]
pub struct Diagram {
    blocks: IndexMap<BlockId, Rc<Block>>,
    connectors: Vec<Rc<Connector>>,
    /// Sinks of each block's outgoing connectors, one entry per connector.
    downstream: HashMap<BlockId, Vec<BlockId>>,
    /// One past the highest block id ever assigned. Wider than `BlockId` so
    /// that `u32::MAX` itself can be handed out.
    next_block_id: u64,
    next_connector_id: u32,
    language: Option<LanguageId>,
    pending: Option<PendingConnector>,
    port_types: Rc<PortTypeRegistry>,
}

impl Diagram {
    pub fn new(port_types: Rc<PortTypeRegistry>) -> Self {
        Self {
            blocks: IndexMap::new(),
            connectors: Vec::new(),
            downstream: HashMap::new(),
            next_block_id: 0,
            next_connector_id: 0,
            language: None,
            pending: None,
            port_types,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────────

    /// Language fixed by the first inserted block.
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn port_types(&self) -> &PortTypeRegistry {
        &self.port_types
    }

    /// Highest block id handed out so far.
    pub fn last_id(&self) -> Option<BlockId> {
        self.next_block_id
            .checked_sub(1)
            .and_then(|n| u32::try_from(n).ok())
            .map(BlockId)
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(&id).map(|b| b.as_ref())
    }

    /// Shared handle of a block, for identity comparisons across snapshots.
    pub fn block_rc(&self, id: BlockId) -> Option<&Rc<Block>> {
        self.blocks.get(&id)
    }

    /// Blocks in insertion order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values().map(|b| b.as_ref())
    }

    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.blocks.keys().copied()
    }

    pub fn contains_block(&self, id: BlockId) -> bool {
        self.blocks.contains_key(&id)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn connector(&self, id: ConnectorId) -> Option<&Connector> {
        self.connectors.iter().find(|c| c.id == id).map(|c| c.as_ref())
    }

    pub fn connector_rc(&self, id: ConnectorId) -> Option<&Rc<Connector>> {
        self.connectors.iter().find(|c| c.id == id)
    }

    pub fn connectors(&self) -> impl Iterator<Item = &Connector> {
        self.connectors.iter().map(|c| c.as_ref())
    }

    pub fn connector_count(&self) -> usize {
        self.connectors.len()
    }

    /// Connectors that start or end at `block`.
    pub fn connectors_of(&self, block: BlockId) -> impl Iterator<Item = &Connector> {
        self.connectors().filter(move |c| c.touches(block))
    }

    pub fn pending(&self) -> Option<&PendingConnector> {
        self.pending.as_ref()
    }

    /// Line segment of a committed connector, output anchor to input anchor.
    pub fn connector_segment(&self, connector: &Connector) -> Option<(Point, Point)> {
        let from = self.block(connector.source)?.output_anchor(connector.source_port)?;
        let to = self.block(connector.sink)?.input_anchor(connector.sink_port)?;
        Some((from, to))
    }

    /// Rubber-band segment of the connection being drawn.
    pub fn pending_segment(&self) -> Option<(Point, Point)> {
        let pending = self.pending.as_ref()?;
        let from = self.block(pending.source)?.output_anchor(pending.source_port)?;
        Some((from, pending.tracking.unwrap_or(from)))
    }

    /// Every block reachable from `start` by following committed connectors
    /// forward. `start` itself is only included if it lies on a cycle.
    pub fn reachable_from(&self, start: BlockId) -> HashSet<BlockId> {
        let mut visited = HashSet::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            for &n in self.downstream.get(&id).into_iter().flatten() {
                if visited.insert(n) {
                    stack.push(n);
                }
            }
        }
        visited
    }

    /// Whether a new edge `source -> sink` would close a directed cycle.
    pub fn would_create_cycle(&self, source: BlockId, sink: BlockId) -> bool {
        source == sink || self.reachable_from(sink).contains(&source)
    }

    /// Kahn's algorithm over the committed connectors.
    pub fn is_acyclic(&self) -> bool {
        let mut in_degree: HashMap<BlockId, usize> = self.blocks.keys().map(|&id| (id, 0)).collect();
        for c in &self.connectors {
            *in_degree.entry(c.sink).or_insert(0) += 1;
        }
        let mut queue: VecDeque<BlockId> = in_degree
            .iter()
            .filter(|&(_, &deg)| deg == 0)
            .map(|(&id, _)| id)
            .collect();

        let mut visited = 0;
        while let Some(id) = queue.pop_front() {
            visited += 1;
            for c in self.connectors.iter().filter(|c| c.source == id) {
                if let Some(deg) = in_degree.get_mut(&c.sink) {
                    *deg -= 1;
                    if *deg == 0 {
                        queue.push_back(c.sink);
                    }
                }
            }
        }
        visited == in_degree.len()
    }

    /// Smallest rectangle enclosing every block, or `None` when empty.
    pub fn bounding_box(&self) -> Option<Rect> {
        let mut iter = self.blocks.values();
        let first = iter.next()?.bounds();
        let (min_x, min_y, max_x, max_y) = iter.fold(
            (first.x, first.y, first.right(), first.bottom()),
            |(l, t, r, b), block| {
                let bb = block.bounds();
                (l.min(bb.x), t.min(bb.y), r.max(bb.right()), b.max(bb.bottom()))
            },
        );
        Some(Rect {
            x: min_x,
            y: min_y,
            width: max_x - min_x,
            height: max_y - min_y,
        })
    }

    // ── Blocks ───────────────────────────────────────────────────────────

    /// Insert a block, assigning the next free id unless `id` is given.
    ///
    /// The block's own `id` field is overwritten with the assigned id. The
    /// first block inserted fixes the diagram's language.
    pub fn insert_block(&mut self, mut block: Block, id: Option<BlockId>) -> Result<BlockId> {
        if let Some(language) = &self.language {
            if *language != block.language {
                let err = DiagramError::LanguageMismatch {
                    diagram: language.clone(),
                    block: block.language.clone(),
                };
                warn!("{err}");
                return Err(err);
            }
        }

        let id = match id {
            Some(id) if self.blocks.contains_key(&id) => {
                return Err(DiagramError::DuplicateBlockId(id));
            }
            Some(id) => {
                self.next_block_id = self.next_block_id.max(u64::from(id.0) + 1);
                id
            }
            None => {
                let id = u32::try_from(self.next_block_id)
                    .map(BlockId)
                    .map_err(|_| DiagramError::IdsExhausted)?;
                if self.blocks.contains_key(&id) {
                    return Err(DiagramError::DuplicateBlockId(id));
                }
                self.next_block_id += 1;
                id
            }
        };

        if self.language.is_none() {
            self.language = Some(block.language.clone());
        }
        block.id = id;
        info!("Inserted block {} ({})", id, block.kind);
        self.blocks.insert(id, Rc::new(block));
        Ok(id)
    }

    /// Remove a block and every connector attached to it.
    ///
    /// Returns `false` (and changes nothing) if the block is not present.
    pub fn delete_block(&mut self, id: BlockId) -> bool {
        if !self.blocks.contains_key(&id) {
            warn!("Block {} is not present in this diagram.", id);
            return false;
        }
        let before = self.connectors.len();
        self.connectors.retain(|c| !c.touches(id));
        self.rebuild_downstream();
        if self.pending.as_ref().is_some_and(|p| p.source == id) {
            self.pending = None;
        }
        self.blocks.shift_remove(&id);
        info!(
            "Deleted block {} and {} connector(s)",
            id,
            before - self.connectors.len()
        );
        true
    }

    /// Translate the given blocks, clamping each one individually against
    /// `limits`. Returns whether any block actually moved.
    pub fn move_blocks(&mut self, ids: &[BlockId], dx: f64, dy: f64, limits: &CanvasLimits) -> bool {
        let mut moved = false;
        for id in ids {
            if let Some(block) = self.blocks.get_mut(id) {
                let (cx, cy) = check_limit(dx, dy, block.position, limits);
                if cx != 0.0 || cy != 0.0 {
                    Rc::make_mut(block).move_by(cx, cy);
                    moved = true;
                }
            }
        }
        moved
    }

    /// Line the given blocks up on one edge. Blocks already on the extreme
    /// coordinate are left untouched.
    pub fn align(&mut self, ids: &[BlockId], alignment: Alignment) -> bool {
        let positions: Vec<(BlockId, Point)> = ids
            .iter()
            .filter_map(|id| self.blocks.get(id).map(|b| (*id, b.position)))
            .collect();
        let Some(&(_, first)) = positions.first() else {
            return false;
        };

        let target = positions.iter().fold(
            match alignment {
                Alignment::Top | Alignment::Bottom => first.y,
                Alignment::Left | Alignment::Right => first.x,
            },
            |acc, (_, p)| match alignment {
                Alignment::Top => acc.min(p.y),
                Alignment::Bottom => acc.max(p.y),
                Alignment::Left => acc.min(p.x),
                Alignment::Right => acc.max(p.x),
            },
        );

        let mut changed = false;
        for (id, pos) in positions {
            let (dx, dy) = match alignment {
                Alignment::Top | Alignment::Bottom => (0.0, target - pos.y),
                Alignment::Left | Alignment::Right => (target - pos.x, 0.0),
            };
            if dx == 0.0 && dy == 0.0 {
                continue;
            }
            if let Some(block) = self.blocks.get_mut(&id) {
                Rc::make_mut(block).move_by(dx, dy);
                changed = true;
            }
        }
        changed
    }

    /// Shift every block so none lies at a negative coordinate.
    pub fn normalize_origin(&mut self) -> bool {
        let Some(bb) = self.bounding_box() else {
            return false;
        };
        let dx = if bb.x < 0.0 { -bb.x } else { 0.0 };
        let dy = if bb.y < 0.0 { -bb.y } else { 0.0 };
        if dx == 0.0 && dy == 0.0 {
            return false;
        }
        for block in self.blocks.values_mut() {
            Rc::make_mut(block).move_by(dx, dy);
        }
        true
    }

    // ── Connections ──────────────────────────────────────────────────────

    /// Begin drawing a connection from output `output` of `source`.
    ///
    /// Any connection already being drawn is aborted first. Returns `None`
    /// without starting anything if the block or port does not exist.
    pub fn start_connection(&mut self, source: BlockId, output: usize) -> Option<&PendingConnector> {
        self.abort_connection();
        let block = self.blocks.get(&source)?;
        let port = block.out_ports.get(output)?;
        self.pending = Some(PendingConnector {
            source,
            source_port: output,
            type_id: port.type_id.clone(),
            tracking: None,
        });
        self.pending.as_ref()
    }

    /// Move the loose end of the connection being drawn.
    pub fn update_tracking(&mut self, point: Point) {
        if let Some(pending) = &mut self.pending {
            pending.update_tracking(point);
        }
    }

    /// Discard the connection being drawn. Returns whether there was one.
    pub fn abort_connection(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Finish the connection being drawn at input `input` of `sink`.
    ///
    /// The pending connector is consumed either way: it becomes a committed
    /// connector on success and is discarded on failure, leaving the graph
    /// untouched.
    pub fn end_connection(&mut self, sink: BlockId, input: usize) -> Result<ConnectorId> {
        let pending = self.pending.take().ok_or(DiagramError::NoPendingConnection)?;
        self.validate_connection(pending.source, pending.source_port, sink, input)
            .inspect_err(|e| warn!("{e}"))?;

        let id = ConnectorId(self.next_connector_id);
        self.next_connector_id += 1;
        debug!(
            "Connected {}:{} -> {}:{} as {}",
            pending.source, pending.source_port, sink, input, id
        );
        self.downstream.entry(pending.source).or_default().push(sink);
        self.connectors.push(Rc::new(Connector {
            id,
            source: pending.source,
            source_port: pending.source_port,
            sink,
            sink_port: input,
            type_id: pending.type_id,
        }));
        Ok(id)
    }

    /// Start and finish a connection in one call.
    pub fn connect(
        &mut self,
        source: BlockId,
        output: usize,
        sink: BlockId,
        input: usize,
    ) -> Result<ConnectorId> {
        if self.start_connection(source, output).is_none() {
            return Err(if self.blocks.contains_key(&source) {
                DiagramError::PortOutOfRange {
                    block: source,
                    direction: PortDirection::Output,
                    index: output,
                }
            } else {
                DiagramError::UnknownBlock(source)
            });
        }
        self.end_connection(sink, input)
    }

    fn validate_connection(
        &self,
        source: BlockId,
        source_port: usize,
        sink: BlockId,
        sink_port: usize,
    ) -> Result<()> {
        let source_block = self.block(source).ok_or(DiagramError::UnknownBlock(source))?;
        let sink_block = self.block(sink).ok_or(DiagramError::UnknownBlock(sink))?;
        let source_type = &source_block
            .out_ports
            .get(source_port)
            .ok_or(DiagramError::PortOutOfRange {
                block: source,
                direction: PortDirection::Output,
                index: source_port,
            })?
            .type_id;
        let sink_type = &sink_block
            .in_ports
            .get(sink_port)
            .ok_or(DiagramError::PortOutOfRange {
                block: sink,
                direction: PortDirection::Input,
                index: sink_port,
            })?
            .type_id;

        if !self.port_types.accepts_multiple(sink_type)
            && self
                .connectors
                .iter()
                .any(|c| c.sink == sink && c.sink_port == sink_port)
        {
            return Err(DiagramError::DuplicateConnection);
        }
        if source == sink {
            return Err(DiagramError::SelfConnection);
        }
        if self.would_create_cycle(source, sink) {
            return Err(DiagramError::RecursiveConnection);
        }
        if !self.port_types.is_compatible(source_type, sink_type) {
            return Err(DiagramError::TypeMismatch {
                source_type: source_type.clone(),
                sink_type: sink_type.clone(),
            });
        }
        Ok(())
    }

    /// Remove a committed connector. Returns `false` if it was not present.
    pub fn delete_connection(&mut self, id: ConnectorId) -> bool {
        match self.connectors.iter().position(|c| c.id == id) {
            Some(pos) => {
                let removed = self.connectors.remove(pos);
                if let Some(sinks) = self.downstream.get_mut(&removed.source) {
                    if let Some(i) = sinks.iter().position(|&s| s == removed.sink) {
                        sinks.swap_remove(i);
                    }
                }
                debug!("Deleted connector {}", id);
                true
            }
            None => {
                debug!("Connector {} is not present in this diagram.", id);
                false
            }
        }
    }

    fn rebuild_downstream(&mut self) {
        self.downstream.clear();
        for c in &self.connectors {
            self.downstream.entry(c.source).or_default().push(c.sink);
        }
    }

    // ── Snapshots ────────────────────────────────────────────────────────

    /// Structural copy of the current blocks and connectors.
    pub fn snapshot(&self, description: &str) -> Snapshot {
        Snapshot {
            blocks: self.blocks.clone(),
            connectors: self.connectors.clone(),
            description: description.to_string(),
        }
    }

    /// Replace the live blocks and connectors with `snapshot`, returning the
    /// previous contents under the same description. Id counters are left
    /// alone so ids stay unique across undo and redo.
    pub fn restore(&mut self, snapshot: Snapshot) -> Snapshot {
        self.pending = None;
        let previous = Snapshot {
            blocks: std::mem::replace(&mut self.blocks, snapshot.blocks),
            connectors: std::mem::replace(&mut self.connectors, snapshot.connectors),
            description: snapshot.description,
        };
        if let Some(max) = self.blocks.keys().map(|id| id.0).max() {
            self.next_block_id = self.next_block_id.max(u64::from(max) + 1);
        }
        self.rebuild_downstream();
        previous
    }
}
