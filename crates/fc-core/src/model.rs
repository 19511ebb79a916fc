//! Core data model for the diagram canvas.
//!
//! Nodes live on an unbounded world plane and are connected by edges.
//! Overlay elements are fixed widgets that stay anchored while the canvas
//! pans. Positions are always top-left corners in world units.

use crate::error::CanvasError;
use crate::id::{EdgeId, NodeId, OverlayId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ─── Geometry ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn is_finite(&self) -> bool {
        self.width.is_finite() && self.height.is_finite()
    }
}

/// An axis-aligned box in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(origin: Point, size: Size) -> Self {
        Self {
            x: origin.x,
            y: origin.y,
            width: size.width,
            height: size.height,
        }
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// Smallest box covering both.
    pub fn union(&self, other: &Bounds) -> Bounds {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Bounds {
            x,
            y,
            width: self.right().max(other.right()) - x,
            height: self.bottom().max(other.bottom()) - y,
        }
    }

    /// Grow the box by `pad` on every side.
    pub fn inflate(&self, pad: f32) -> Bounds {
        Bounds {
            x: self.x - pad,
            y: self.y - pad,
            width: self.width + 2.0 * pad,
            height: self.height + 2.0 * pad,
        }
    }
}

/// Free-form style properties (`"background" → "#fff"`), ordered for
/// stable serialization.
pub type StyleBag = BTreeMap<String, String>;

// ─── Viewport ────────────────────────────────────────────────────────────

/// Pan offset and scale of the rendering surface.
///
/// `screen = world * zoom + (x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub zoom: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    /// Reject viewports the coordinate transform cannot invert.
    pub fn validate(&self) -> Result<(), CanvasError> {
        if self.zoom.is_finite() && self.zoom > 0.0 && self.x.is_finite() && self.y.is_finite() {
            Ok(())
        } else {
            Err(CanvasError::InvalidViewport {
                x: self.x,
                y: self.y,
                zoom: self.zoom,
            })
        }
    }
}

// ─── Nodes ───────────────────────────────────────────────────────────────

/// Selects how a node is rendered and which handles it exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Only an outbound handle.
    Input,
    /// Only an inbound handle.
    Output,
    #[default]
    Default,
    /// Handle-based node; handles come from [`crate::handles::place_handles`].
    Custom,
}

impl NodeKind {
    /// Size used when a node carries no explicit dimensions.
    pub fn default_size(self) -> Size {
        match self {
            NodeKind::Input | NodeKind::Output | NodeKind::Default => Size::new(150.0, 40.0),
            NodeKind::Custom => Size::new(180.0, 80.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(default)]
    pub kind: NodeKind,
    pub position: Point,
    /// Explicit dimensions; `None` falls back to the kind's default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
    /// Opaque label / content payload.
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "StyleBag::is_empty")]
    pub style: StyleBag,
    #[serde(default)]
    pub selected: bool,
}

impl Node {
    /// Reject positions and sizes that cannot be drawn or persisted.
    pub fn validate_geometry(&self) -> Result<(), CanvasError> {
        let size = self.size.unwrap_or(Size::new(0.0, 0.0));
        if self.position.is_finite() && size.is_finite() {
            Ok(())
        } else {
            Err(CanvasError::NonFiniteGeometry(self.id))
        }
    }

    pub fn new(id: NodeId, kind: NodeKind, position: Point) -> Self {
        Self {
            id,
            kind,
            position,
            size: None,
            label: String::new(),
            style: StyleBag::new(),
            selected: false,
        }
    }

    /// A node with a freshly generated `node-<timestamp>` id.
    pub fn generated(kind: NodeKind, position: Point, now_ms: u64) -> Self {
        Self::new(NodeId::generate(now_ms), kind, position)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_size(mut self, size: Size) -> Self {
        self.size = Some(size);
        self
    }

    /// Rendered size: explicit dimensions or the kind's default.
    pub fn effective_size(&self) -> Size {
        self.size.unwrap_or_else(|| self.kind.default_size())
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.position, self.effective_size())
    }
}

// ─── Edges ───────────────────────────────────────────────────────────────

/// How the edge path is drawn between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Straight,
    #[default]
    Bezier,
    Step,
    SmoothStep,
}

impl EdgeKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "straight" => Some(EdgeKind::Straight),
            "bezier" | "default" => Some(EdgeKind::Bezier),
            "step" => Some(EdgeKind::Step),
            "smoothstep" => Some(EdgeKind::SmoothStep),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default)]
    pub kind: EdgeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub animated: bool,
    #[serde(default, skip_serializing_if = "StyleBag::is_empty")]
    pub style: StyleBag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    #[serde(default)]
    pub selected: bool,
}

impl Edge {
    /// Build an edge, rejecting self-loops.
    pub fn new(id: EdgeId, source: NodeId, target: NodeId) -> Result<Self, CanvasError> {
        if source == target {
            return Err(CanvasError::SelfConnectionRejected(source));
        }
        Ok(Self {
            id,
            source,
            target,
            kind: EdgeKind::default(),
            label: None,
            animated: false,
            style: StyleBag::new(),
            source_handle: None,
            target_handle: None,
            selected: false,
        })
    }

    pub fn touches(&self, node: NodeId) -> bool {
        self.source == node || self.target == node
    }
}

/// Edge properties that can change without moving any node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EdgeDefaults {
    pub kind: EdgeKind,
    pub animated: bool,
    pub show_labels: bool,
}

// ─── Overlays ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayKind {
    #[default]
    Text,
    Shape,
}

/// A fixed-position widget anchored in canvas space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayElement {
    pub id: OverlayId,
    #[serde(default)]
    pub kind: OverlayKind,
    pub position: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "StyleBag::is_empty")]
    pub style: StyleBag,
}

impl OverlayElement {
    pub const DEFAULT_SIZE: Size = Size::new(200.0, 100.0);

    pub fn effective_size(&self) -> Size {
        self.size.unwrap_or(Self::DEFAULT_SIZE)
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.position, self.effective_size())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_rejects_self_loop() {
        let n = NodeId::intern("loop");
        let err = Edge::new(EdgeId::intern("e"), n, n).unwrap_err();
        assert_eq!(err, CanvasError::SelfConnectionRejected(n));
    }

    #[test]
    fn node_size_falls_back_to_kind_default() {
        let node = Node::new(NodeId::intern("a"), NodeKind::Custom, Point::ORIGIN);
        assert_eq!(node.effective_size(), Size::new(180.0, 80.0));

        let sized = node.with_size(Size::new(10.0, 20.0));
        assert_eq!(sized.bounds().right(), 10.0);
    }

    #[test]
    fn viewport_validation() {
        assert!(Viewport::default().validate().is_ok());
        for zoom in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let vp = Viewport { zoom, ..Viewport::default() };
            assert!(vp.validate().is_err(), "zoom {zoom} should be rejected");
        }
    }

    #[test]
    fn bounds_union_covers_both() {
        let a = Bounds { x: 0.0, y: 0.0, width: 10.0, height: 10.0 };
        let b = Bounds { x: 20.0, y: -5.0, width: 5.0, height: 5.0 };
        let u = a.union(&b);
        assert_eq!(u, Bounds { x: 0.0, y: -5.0, width: 25.0, height: 15.0 });
    }

    #[test]
    fn node_json_uses_lowercase_kinds() {
        let node = Node::new(NodeId::intern("in"), NodeKind::Input, Point::new(1.0, 2.0));
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["kind"], "input");
        assert!(json.get("size").is_none());
    }
}
