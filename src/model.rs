use serde::{Deserialize, Serialize};
use std::fmt;

// ────────────────────────────────────────────────────────────────────────────
// Identifiers
// ────────────────────────────────────────────────────────────────────────────

/// Identifier of a port type (e.g. `"double"`, `"image"`).
pub type PortTypeId = String;

/// Identifier of the target language a block generates code for.
pub type LanguageId = String;

/// Identity of a block within one diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub u32);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a committed connector within one diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectorId(pub u32);

impl fmt::Display for ConnectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Geometry
// ────────────────────────────────────────────────────────────────────────────

/// A point in model (canvas) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Width and height of a rendered block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Default for Size {
    fn default() -> Self {
        Self { width: 100.0, height: 50.0 }
    }
}

/// An axis-aligned rectangle, always stored normalized (non-negative extent).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Build a rectangle from two corners given in any drag direction.
    pub fn from_corners(a: Point, b: Point) -> Self {
        let min_x = a.x.min(b.x);
        let min_y = a.y.min(b.y);
        Self {
            x: min_x,
            y: min_y,
            width: a.x.max(b.x) - min_x,
            height: a.y.max(b.y) - min_y,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// Closed-interval overlap test, so touching edges and zero-extent
    /// rectangles (e.g. a horizontal connector) still intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x <= other.right()
            && other.x <= self.right()
            && self.y <= other.bottom()
            && other.y <= self.bottom()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Port
// ────────────────────────────────────────────────────────────────────────────

/// A typed input or output of a block. Connections address ports by their
/// index in the block's port list, never by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    #[serde(rename = "type")]
    pub type_id: PortTypeId,
    pub name: String,
    #[serde(default)]
    pub label: String,
}

impl Port {
    pub fn new(type_id: &str, name: &str, label: &str) -> Self {
        Self {
            type_id: type_id.to_string(),
            name: name.to_string(),
            label: label.to_string(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Block
// ────────────────────────────────────────────────────────────────────────────

/// A node on the canvas: a template instance with ordered typed ports.
///
/// Blocks never know which connectors reference them; the diagram's connector
/// list is the only place that relation lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Assigned by the diagram on insertion.
    pub id: BlockId,
    /// Kind of the template this block was instantiated from.
    pub kind: String,
    pub label: String,
    pub language: LanguageId,
    pub in_ports: Vec<Port>,
    pub out_ports: Vec<Port>,
    pub position: Point,
    pub size: Size,
}

impl Block {
    /// Translate the block. No validation happens here.
    pub fn move_by(&mut self, dx: f64, dy: f64) {
        self.position.x += dx;
        self.position.y += dy;
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn bounds(&self) -> Rect {
        Rect {
            x: self.position.x,
            y: self.position.y,
            width: self.size.width,
            height: self.size.height,
        }
    }

    /// Anchor of input port `index` on the left edge.
    pub fn input_anchor(&self, index: usize) -> Option<Point> {
        port_anchor(self, index, self.in_ports.len(), self.position.x)
    }

    /// Anchor of output port `index` on the right edge.
    pub fn output_anchor(&self, index: usize) -> Option<Point> {
        port_anchor(self, index, self.out_ports.len(), self.position.x + self.size.width)
    }
}

fn port_anchor(block: &Block, index: usize, count: usize, x: f64) -> Option<Point> {
    if index >= count {
        return None;
    }
    let step = block.size.height / (count as f64 + 1.0);
    Some(Point::new(x, block.position.y + step * (index as f64 + 1.0)))
}

// ────────────────────────────────────────────────────────────────────────────
// Connector
// ────────────────────────────────────────────────────────────────────────────

/// A committed, validated edge from an output port to an input port.
///
/// Endpoints are block identifiers resolved through the owning diagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connector {
    pub id: ConnectorId,
    pub source: BlockId,
    pub source_port: usize,
    pub sink: BlockId,
    pub sink_port: usize,
    #[serde(rename = "type")]
    pub type_id: PortTypeId,
}

impl Connector {
    pub fn touches(&self, block: BlockId) -> bool {
        self.source == block || self.sink == block
    }
}

/// An in-flight connection whose sink has not been chosen yet.
///
/// It lives outside the committed connector list and is either promoted to a
/// [`Connector`] or discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingConnector {
    pub source: BlockId,
    pub source_port: usize,
    pub type_id: PortTypeId,
    /// Current pointer position while the user drags.
    pub tracking: Option<Point>,
}

impl PendingConnector {
    pub fn update_tracking(&mut self, point: Point) {
        self.tracking = Some(point);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_at(x: f64, y: f64, ins: usize, outs: usize) -> Block {
        Block {
            id: BlockId(0),
            kind: "test".to_string(),
            label: "Test".to_string(),
            language: "c".to_string(),
            in_ports: (0..ins).map(|i| Port::new("double", &format!("in{i}"), "")).collect(),
            out_ports: (0..outs).map(|i| Port::new("double", &format!("out{i}"), "")).collect(),
            position: Point::new(x, y),
            size: Size::new(100.0, 60.0),
        }
    }

    #[test]
    fn test_rect_from_corners_any_direction() {
        let r = Rect::from_corners(Point::new(100.0, 200.0), Point::new(50.0, 150.0));
        assert_eq!(r, Rect { x: 50.0, y: 150.0, width: 50.0, height: 50.0 });
    }

    #[test]
    fn test_rect_intersects() {
        let a = Rect { x: 0.0, y: 0.0, width: 10.0, height: 10.0 };
        let b = Rect { x: 5.0, y: 5.0, width: 10.0, height: 10.0 };
        let c = Rect { x: 20.0, y: 20.0, width: 1.0, height: 1.0 };
        let flat = Rect { x: -5.0, y: 5.0, width: 30.0, height: 0.0 };
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(a.intersects(&flat));
    }

    #[test]
    fn test_block_move_by() {
        let mut b = block_at(10.0, 20.0, 0, 0);
        b.move_by(5.0, -5.0);
        assert_eq!(b.position(), Point::new(15.0, 15.0));
    }

    #[test]
    fn test_port_anchors() {
        let b = block_at(0.0, 0.0, 2, 1);
        assert_eq!(b.input_anchor(0), Some(Point::new(0.0, 20.0)));
        assert_eq!(b.input_anchor(1), Some(Point::new(0.0, 40.0)));
        assert_eq!(b.input_anchor(2), None);
        assert_eq!(b.output_anchor(0), Some(Point::new(100.0, 30.0)));
    }

    #[test]
    fn test_port_serde_uses_type_key() {
        let p: Port = serde_json::from_str(r#"{"type":"image","name":"in0"}"#).unwrap();
        assert_eq!(p.type_id, "image");
        assert!(p.label.is_empty());
    }
}
