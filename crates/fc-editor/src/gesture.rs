//! Drag/resize gestures for graph nodes and overlay elements.
//!
//! A `DragController` is the state machine of one gesture on one element:
//!
//! ```text
//! Idle ──down on body──▶ Dragging ──up──▶ Idle (commit position)
//!  │
//!  └──down on handle──▶ Resizing(h) ──up──▶ Idle (commit size [+ position])
//! ```
//!
//! Moves only update the controller's candidate geometry; the authoritative
//! model changes once, on release, through the returned `GestureCommit`.
//! The `GestureArbiter` owns at most one controller, so only one element is
//! ever being dragged or resized.

use crate::hit::{ElementRef, Hit, ResizeHandle};
use fc_core::{Bounds, NodeChange, Point, Size};

pub const MIN_WIDTH: f32 = 50.0;
pub const MIN_HEIGHT: f32 = 30.0;

/// Distance kept between a clamped element and the far surface edges.
pub const EDGE_MARGIN: f32 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureState {
    Idle,
    Dragging {
        /// Pointer minus element origin at gesture start.
        offset: Point,
    },
    Resizing {
        handle: ResizeHandle,
        last_pointer: Point,
    },
}

/// Movement constraints of an element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragLimits {
    /// Visible surface the element must stay on; `None` for the unbounded
    /// world plane.
    pub surface: Option<Size>,
    pub margin: f32,
    pub min_size: Size,
}

impl DragLimits {
    pub fn unbounded() -> Self {
        Self {
            surface: None,
            margin: EDGE_MARGIN,
            min_size: Size::new(MIN_WIDTH, MIN_HEIGHT),
        }
    }

    pub fn within(surface: Size) -> Self {
        Self {
            surface: Some(surface),
            ..Self::unbounded()
        }
    }

    fn clamp_position(&self, p: Point) -> Point {
        match self.surface {
            Some(s) => Point::new(
                p.x.clamp(0.0, (s.width - self.margin).max(0.0)),
                p.y.clamp(0.0, (s.height - self.margin).max(0.0)),
            ),
            None => p,
        }
    }
}

/// The single model update produced by a finished gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureCommit {
    pub element: ElementRef,
    pub position: Option<Point>,
    pub size: Option<Size>,
}

impl GestureCommit {
    /// Store changes for a node commit; empty for overlays.
    pub fn node_changes(&self) -> Vec<NodeChange> {
        let ElementRef::Node(id) = self.element else {
            return Vec::new();
        };
        let mut changes = Vec::with_capacity(2);
        if let Some(size) = self.size {
            changes.push(NodeChange::Dimensions { id, size });
        }
        if let Some(position) = self.position {
            changes.push(NodeChange::Position { id, position });
        }
        changes
    }
}

pub struct DragController {
    element: ElementRef,
    state: GestureState,
    start: Bounds,
    position: Point,
    size: Size,
    editable: bool,
    limits: DragLimits,
}

impl DragController {
    pub fn new(element: ElementRef, bounds: Bounds, editable: bool, limits: DragLimits) -> Self {
        Self {
            element,
            state: GestureState::Idle,
            start: bounds,
            position: bounds.origin(),
            size: bounds.size(),
            editable,
            limits,
        }
    }

    pub fn element(&self) -> ElementRef {
        self.element
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != GestureState::Idle
    }

    /// Candidate geometry, for rendering while the gesture runs.
    pub fn geometry(&self) -> Bounds {
        Bounds::new(self.position, self.size)
    }

    /// Start a gesture. `handle` is the resize affordance under the pointer,
    /// if any. Returns whether a gesture started.
    pub fn pointer_down(&mut self, pointer: Point, handle: Option<ResizeHandle>) -> bool {
        if !self.editable || self.is_active() {
            return false;
        }
        self.start = self.geometry();
        self.state = match handle {
            Some(handle) => GestureState::Resizing {
                handle,
                last_pointer: pointer,
            },
            None => GestureState::Dragging {
                offset: Point::new(pointer.x - self.position.x, pointer.y - self.position.y),
            },
        };
        log::debug!("{:?}: idle → {:?}", self.element, self.state);
        true
    }

    /// Advance the gesture; returns the new candidate geometry.
    pub fn pointer_move(&mut self, pointer: Point) -> Option<Bounds> {
        match self.state {
            GestureState::Idle => return None,
            GestureState::Dragging { offset } => {
                let raw = Point::new(pointer.x - offset.x, pointer.y - offset.y);
                self.position = self.limits.clamp_position(raw);
            }
            GestureState::Resizing {
                handle,
                last_pointer,
            } => {
                let dx = pointer.x - last_pointer.x;
                let dy = pointer.y - last_pointer.y;
                self.resize_by(handle, dx, dy);
                self.state = GestureState::Resizing {
                    handle,
                    last_pointer: pointer,
                };
            }
        }
        Some(self.geometry())
    }

    fn resize_by(&mut self, handle: ResizeHandle, dx: f32, dy: f32) {
        let min = self.limits.min_size;
        if handle.moves_right() {
            self.size.width = (self.size.width + dx).max(min.width);
        }
        if handle.moves_left() {
            let right = self.position.x + self.size.width;
            self.size.width = (self.size.width - dx).max(min.width);
            self.position.x = right - self.size.width;
        }
        if handle.moves_bottom() {
            self.size.height = (self.size.height + dy).max(min.height);
        }
        if handle.moves_top() {
            let bottom = self.position.y + self.size.height;
            self.size.height = (self.size.height - dy).max(min.height);
            self.position.y = bottom - self.size.height;
        }
    }

    /// Finish the gesture and produce its single commit.
    pub fn pointer_up(&mut self) -> Option<GestureCommit> {
        let commit = match self.state {
            GestureState::Idle => return None,
            GestureState::Dragging { .. } => GestureCommit {
                element: self.element,
                position: Some(self.position),
                size: None,
            },
            GestureState::Resizing { .. } => GestureCommit {
                element: self.element,
                position: (self.position != self.start.origin()).then_some(self.position),
                size: Some(self.size),
            },
        };
        log::debug!("{:?}: {:?} → idle", self.element, self.state);
        self.state = GestureState::Idle;
        Some(commit)
    }
}

/// Serializes gestures: at most one element is dragged or resized at a time.
#[derive(Default)]
pub struct GestureArbiter {
    active: Option<DragController>,
}

impl GestureArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&DragController> {
        self.active.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.active.is_some()
    }

    /// Begin a gesture on the hit element. Ignored while another gesture runs.
    pub fn begin(&mut self, hit: Hit, pointer: Point, editable: bool, limits: DragLimits) -> bool {
        if self.is_busy() {
            log::debug!("ignoring pointer-down on {:?}: gesture in progress", hit.element);
            return false;
        }
        let mut controller = DragController::new(hit.element, hit.bounds, editable, limits);
        if !controller.pointer_down(pointer, hit.handle) {
            return false;
        }
        self.active = Some(controller);
        true
    }

    pub fn update(&mut self, pointer: Point) -> Option<(ElementRef, Bounds)> {
        let controller = self.active.as_mut()?;
        controller
            .pointer_move(pointer)
            .map(|b| (controller.element(), b))
    }

    /// Finish the gesture; the controller is discarded.
    pub fn end(&mut self) -> Option<GestureCommit> {
        self.active.take()?.pointer_up()
    }

    /// Drop the gesture without committing (its element disappeared).
    pub fn cancel(&mut self) {
        if let Some(controller) = self.active.take() {
            log::debug!("cancelled gesture on {:?}", controller.element());
        }
    }
}
