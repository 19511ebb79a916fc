//! Hit testing: point → element and resize affordance lookup.
//!
//! Walks elements in reverse paint order (last painted = topmost). A point
//! within `radius` of an element's border hits one of its eight resize
//! affordances; corners win over edges.

use fc_core::{Bounds, Node, NodeId, OverlayElement, OverlayId, Point};

/// Default grab distance around a border, in the element's coordinate space.
pub const GRAB_RADIUS: f32 = 6.0;

/// One of the eight resize affordances of a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResizeHandle {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

impl ResizeHandle {
    pub const ALL: [ResizeHandle; 8] = [
        ResizeHandle::TopLeft,
        ResizeHandle::Top,
        ResizeHandle::TopRight,
        ResizeHandle::Right,
        ResizeHandle::BottomRight,
        ResizeHandle::Bottom,
        ResizeHandle::BottomLeft,
        ResizeHandle::Left,
    ];

    pub fn moves_left(self) -> bool {
        matches!(
            self,
            ResizeHandle::Left | ResizeHandle::TopLeft | ResizeHandle::BottomLeft
        )
    }

    pub fn moves_right(self) -> bool {
        matches!(
            self,
            ResizeHandle::Right | ResizeHandle::TopRight | ResizeHandle::BottomRight
        )
    }

    pub fn moves_top(self) -> bool {
        matches!(
            self,
            ResizeHandle::Top | ResizeHandle::TopLeft | ResizeHandle::TopRight
        )
    }

    pub fn moves_bottom(self) -> bool {
        matches!(
            self,
            ResizeHandle::Bottom | ResizeHandle::BottomLeft | ResizeHandle::BottomRight
        )
    }

    /// Where the affordance is drawn on a box.
    pub fn anchor(self, b: Bounds) -> Point {
        let x = if self.moves_left() {
            b.x
        } else if self.moves_right() {
            b.right()
        } else {
            b.x + b.width / 2.0
        };
        let y = if self.moves_top() {
            b.y
        } else if self.moves_bottom() {
            b.bottom()
        } else {
            b.y + b.height / 2.0
        };
        Point::new(x, y)
    }
}

/// Classify a point against the border band of a box.
pub fn hit_resize_handle(b: Bounds, p: Point, radius: f32) -> Option<ResizeHandle> {
    if !b.inflate(radius).contains(p) {
        return None;
    }
    let left = (p.x - b.x).abs() <= radius;
    let right = (p.x - b.right()).abs() <= radius;
    let top = (p.y - b.y).abs() <= radius;
    let bottom = (p.y - b.bottom()).abs() <= radius;

    match (left, right, top, bottom) {
        (true, _, true, _) => Some(ResizeHandle::TopLeft),
        (_, true, true, _) => Some(ResizeHandle::TopRight),
        (true, _, _, true) => Some(ResizeHandle::BottomLeft),
        (_, true, _, true) => Some(ResizeHandle::BottomRight),
        (true, ..) => Some(ResizeHandle::Left),
        (_, true, ..) => Some(ResizeHandle::Right),
        (_, _, true, _) => Some(ResizeHandle::Top),
        (.., true) => Some(ResizeHandle::Bottom),
        _ => None,
    }
}

/// What a gesture acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementRef {
    Node(NodeId),
    Overlay(OverlayId),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub element: ElementRef,
    pub bounds: Bounds,
    /// `None` when the body was hit.
    pub handle: Option<ResizeHandle>,
}

fn hit_box(element: ElementRef, bounds: Bounds, p: Point, radius: f32) -> Option<Hit> {
    if let Some(handle) = hit_resize_handle(bounds, p, radius) {
        return Some(Hit {
            element,
            bounds,
            handle: Some(handle),
        });
    }
    bounds.contains(p).then_some(Hit {
        element,
        bounds,
        handle: None,
    })
}

/// Topmost node at world point `p`.
pub fn hit_test_nodes(nodes: &[Node], p: Point, radius: f32) -> Option<Hit> {
    nodes
        .iter()
        .rev()
        .find_map(|n| hit_box(ElementRef::Node(n.id), n.bounds(), p, radius))
}

/// Topmost overlay at overlay-space point `p`.
pub fn hit_test_overlays(overlays: &[OverlayElement], p: Point, radius: f32) -> Option<Hit> {
    overlays
        .iter()
        .rev()
        .find_map(|o| hit_box(ElementRef::Overlay(o.id), o.bounds(), p, radius))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fc_core::{NodeKind, Size};

    const BOX: Bounds = Bounds {
        x: 100.0,
        y: 100.0,
        width: 200.0,
        height: 100.0,
    };

    #[test]
    fn corners_win_over_edges() {
        let hit = hit_resize_handle(BOX, Point::new(101.0, 99.0), GRAB_RADIUS);
        assert_eq!(hit, Some(ResizeHandle::TopLeft));
        let hit = hit_resize_handle(BOX, Point::new(303.0, 204.0), GRAB_RADIUS);
        assert_eq!(hit, Some(ResizeHandle::BottomRight));
    }

    #[test]
    fn edges_cover_the_whole_side() {
        assert_eq!(
            hit_resize_handle(BOX, Point::new(180.0, 100.0), GRAB_RADIUS),
            Some(ResizeHandle::Top)
        );
        assert_eq!(
            hit_resize_handle(BOX, Point::new(298.0, 150.0), GRAB_RADIUS),
            Some(ResizeHandle::Right)
        );
        assert_eq!(
            hit_resize_handle(BOX, Point::new(200.0, 205.0), GRAB_RADIUS),
            Some(ResizeHandle::Bottom)
        );
    }

    #[test]
    fn interior_and_far_points_miss() {
        assert_eq!(hit_resize_handle(BOX, Point::new(200.0, 150.0), GRAB_RADIUS), None);
        assert_eq!(hit_resize_handle(BOX, Point::new(0.0, 0.0), GRAB_RADIUS), None);
    }

    #[test]
    fn anchors_match_classification() {
        for handle in ResizeHandle::ALL {
            let anchor = handle.anchor(BOX);
            assert_eq!(hit_resize_handle(BOX, anchor, GRAB_RADIUS), Some(handle));
        }
    }

    #[test]
    fn topmost_node_wins() {
        let a = Node::new(NodeId::intern("under"), NodeKind::Default, Point::new(0.0, 0.0))
            .with_size(Size::new(100.0, 100.0));
        let b = Node::new(NodeId::intern("over"), NodeKind::Default, Point::new(50.0, 50.0))
            .with_size(Size::new(100.0, 100.0));
        let hit = hit_test_nodes(&[a, b], Point::new(75.0, 75.0), GRAB_RADIUS).unwrap();
        assert_eq!(hit.element, ElementRef::Node(NodeId::intern("over")));
        assert_eq!(hit.handle, None);
    }
}
