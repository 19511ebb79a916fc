//! Canvas session: the caller that wires store, gestures, overlays, layout
//! and persistence together.
//!
//! The host drives a session with pointer events and a clock. Store change
//! notifications are drained on every [`CanvasSession::tick`] and fed to
//! snapshot persistence; layout runs as a detached job whose outcome is
//! reconciled back into the live store.

use crate::gesture::{DragLimits, GestureArbiter};
use crate::hit::{ElementRef, GRAB_RADIUS, hit_test_nodes};
use crate::input::InputEvent;
use crate::overlay::OverlayLayer;
use crate::persist::{Snapshot, SnapshotError, SnapshotPersistence, SnapshotStorage};
use fc_core::{
    Bounds, CanvasConfig, CanvasError, CanvasStore, Connection, Edge, EdgeId, Handle, HandleRole,
    HandleSet, HandleSide, LayoutDirection, Node, NodeChange, NodeId, NodeKind, OverlayElement,
    Point, Size, StyleBag, Subscription, Viewport, ZoomLimits, fit_view, place_handles,
    screen_to_world, zoom_at,
};
use fc_layout::{
    BuiltinSolver, LayoutJob, LayoutOrchestrator, LayoutOutcome, LayoutResponse, apply_outcome,
    needs_relayout, reconcile,
};
use std::collections::HashSet;

/// Fraction of the surface left empty around the graph by fit-view.
pub const FIT_PADDING: f32 = 0.1;

/// Starter graph shown when no snapshot can be restored.
pub fn default_graph() -> (Vec<Node>, Vec<Edge>) {
    let nodes = vec![
        Node::new(NodeId::intern("1"), NodeKind::Input, Point::new(250.0, 25.0))
            .with_label("Input Node"),
        Node::new(NodeId::intern("2"), NodeKind::Default, Point::new(100.0, 125.0))
            .with_label("Default Node"),
        Node::new(NodeId::intern("3"), NodeKind::Output, Point::new(250.0, 250.0))
            .with_label("Output Node"),
    ];
    let edges = [("e1-2", "1", "2"), ("e2-3", "2", "3")]
        .into_iter()
        .filter_map(|(id, s, t)| {
            Edge::new(EdgeId::intern(id), NodeId::intern(s), NodeId::intern(t)).ok()
        })
        .collect();
    (nodes, edges)
}

fn snapshot_of(
    store: &CanvasStore,
    viewport: Viewport,
    config: &CanvasConfig,
    overlays: &OverlayLayer,
    now_ms: u64,
) -> Snapshot {
    let mut configuration = config.clone();
    configuration.overlays = overlays.elements().to_vec();
    Snapshot::new(
        now_ms,
        store.nodes().to_vec(),
        store.edges().to_vec(),
        viewport,
        configuration,
    )
}

/// Configured overlays, with geometry taken from a saved copy when present.
fn restore_overlays(configured: &[OverlayElement], saved: &[OverlayElement]) -> Vec<OverlayElement> {
    configured
        .iter()
        .map(|o| match saved.iter().find(|s| s.id == o.id) {
            Some(s) => OverlayElement {
                position: s.position,
                size: s.size,
                ..o.clone()
            },
            None => o.clone(),
        })
        .collect()
}

pub struct CanvasSession<S> {
    store: CanvasStore,
    events: Subscription,
    config: CanvasConfig,
    viewport: Viewport,
    surface: Size,
    zoom_limits: ZoomLimits,
    overlays: OverlayLayer,
    gestures: GestureArbiter,
    persistence: SnapshotPersistence<S>,
    layout_requested: bool,
    /// Nodes handed to the most recent layout job.
    laid_out: Option<HashSet<NodeId>>,
    /// Viewport, configuration or overlays changed since the last tick.
    unsaved: bool,
}

impl<S: SnapshotStorage> CanvasSession<S> {
    /// Restore the last snapshot, or start from [`default_graph`] when none
    /// can be read. Never fails.
    pub fn mount(config: CanvasConfig, persistence: SnapshotPersistence<S>, surface: Size) -> Self {
        let mut store = CanvasStore::with_edge_defaults(config.edge_defaults());
        let events = store.subscribe();
        let mut viewport = Viewport::default();
        let mut overlays = config.overlays.clone();
        let mut layout_requested = false;

        match persistence.load() {
            Ok(snapshot) => {
                log::info!(
                    "restored snapshot with {} node(s), {} edge(s)",
                    snapshot.nodes.len(),
                    snapshot.edges.len()
                );
                let defaults = config.edge_defaults();
                let edges = snapshot
                    .edges
                    .into_iter()
                    .map(|mut e| {
                        e.kind = defaults.kind;
                        e.animated = defaults.animated;
                        e
                    })
                    .collect();
                store.replace_all(snapshot.nodes, edges);
                match snapshot.viewport.validate() {
                    Ok(()) => viewport = snapshot.viewport,
                    Err(err) => log::warn!("ignoring saved viewport: {err}"),
                }
                overlays = restore_overlays(&config.overlays, &snapshot.configuration.overlays);
            }
            Err(err) => {
                match &err {
                    SnapshotError::Missing(_) => log::info!("{err}; starting from the default graph"),
                    _ => log::warn!("{err}; starting from the default graph"),
                }
                let (nodes, edges) = default_graph();
                store.replace_all(nodes, edges);
                layout_requested = true;
            }
        }
        // Mounting is not an edit.
        events.drain();

        Self {
            store,
            events,
            config,
            viewport,
            surface,
            zoom_limits: ZoomLimits::default(),
            overlays: OverlayLayer::new(overlays),
            gestures: GestureArbiter::new(),
            persistence,
            layout_requested,
            laid_out: None,
            unsaved: false,
        }
    }

    // ─── Reads ───────────────────────────────────────────────────────────

    pub fn store(&self) -> &CanvasStore {
        &self.store
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn surface(&self) -> Size {
        self.surface
    }

    pub fn overlays(&self) -> &OverlayLayer {
        &self.overlays
    }

    pub fn persistence(&self) -> &SnapshotPersistence<S> {
        &self.persistence
    }

    /// Candidate geometry of the element under an active gesture.
    pub fn preview(&self) -> Option<(ElementRef, Bounds)> {
        self.gestures
            .active()
            .map(|c| (c.element(), c.geometry()))
    }

    /// Connection handles of a node, in placement order.
    ///
    /// Custom nodes follow the configured handle axis and count. Built-in
    /// kinds get one port per role on the sides facing the layout flow.
    pub fn handles_for(&self, id: NodeId) -> Option<HandleSet> {
        let node = self.store.node(id)?;
        if node.kind == NodeKind::Custom {
            return Some(place_handles(
                self.config.handle_count,
                self.config.handle_position,
                &node.style,
            ));
        }
        let (inbound, outbound) = match self.config.layout.direction {
            LayoutDirection::Down => (HandleSide::Top, HandleSide::Bottom),
            LayoutDirection::Right => (HandleSide::Left, HandleSide::Right),
        };
        let mut set = HandleSet::new();
        if node.kind != NodeKind::Input {
            set.push(flow_handle(inbound, HandleRole::Target, &node.style));
        }
        if node.kind != NodeKind::Output {
            set.push(flow_handle(outbound, HandleRole::Source, &node.style));
        }
        Some(set)
    }

    // ─── Pointer input ───────────────────────────────────────────────────

    /// Feed one input event. Returns whether anything visible changed.
    ///
    /// Events at a NaN or infinite position are rejected before they touch
    /// any state; a pointer-up still ends the running gesture.
    pub fn handle_input(&mut self, event: InputEvent) -> Result<bool, CanvasError> {
        let screen = event.position();
        if !screen.is_finite() && !matches!(event, InputEvent::PointerUp { .. }) {
            return Err(CanvasError::NonFiniteCoordinate {
                x: screen.x,
                y: screen.y,
            });
        }
        match event {
            InputEvent::PointerDown { .. } => self.pointer_down(screen),
            InputEvent::PointerMove { .. } => self.pointer_move(screen),
            InputEvent::PointerUp { .. } => Ok(self.pointer_up()),
            InputEvent::Scroll { zoom, .. } => {
                self.zoom_by(screen, zoom)?;
                Ok(true)
            }
        }
    }

    fn pointer_down(&mut self, screen: Point) -> Result<bool, CanvasError> {
        if self.gestures.is_busy() {
            log::debug!("ignoring pointer-down at {screen:?}: gesture in progress");
            return Ok(false);
        }
        let editable = self.config.editable;
        // Overlays sit above the graph and are hit in surface space.
        if let Some(hit) = self.overlays.hit(screen) {
            return Ok(self
                .gestures
                .begin(hit, screen, editable, DragLimits::within(self.surface)));
        }
        let world = screen_to_world(screen, self.viewport)?;
        match hit_test_nodes(self.store.nodes(), world, GRAB_RADIUS / self.viewport.zoom) {
            Some(hit) => {
                if let ElementRef::Node(id) = hit.element {
                    self.select_only(Some(id));
                }
                self.gestures
                    .begin(hit, world, editable, DragLimits::unbounded());
                Ok(true)
            }
            None => Ok(self.select_only(None)),
        }
    }

    fn pointer_move(&mut self, screen: Point) -> Result<bool, CanvasError> {
        let Some(active) = self.gestures.active() else {
            return Ok(false);
        };
        let pointer = match active.element() {
            ElementRef::Overlay(_) => screen,
            ElementRef::Node(_) => screen_to_world(screen, self.viewport)?,
        };
        Ok(self.gestures.update(pointer).is_some())
    }

    fn pointer_up(&mut self) -> bool {
        let Some(commit) = self.gestures.end() else {
            return false;
        };
        match commit.element {
            ElementRef::Node(_) => self.store.apply_node_changes(commit.node_changes()),
            ElementRef::Overlay(_) => {
                self.unsaved |= self.overlays.commit(&commit);
            }
        }
        true
    }

    /// Select `id` alone, or clear the selection. Returns whether anything
    /// changed.
    fn select_only(&mut self, id: Option<NodeId>) -> bool {
        let changes: Vec<NodeChange> = self
            .store
            .nodes()
            .iter()
            .filter(|n| n.selected != (Some(n.id) == id))
            .map(|n| NodeChange::Select {
                id: n.id,
                selected: !n.selected,
            })
            .collect();
        let changed = !changes.is_empty();
        self.store.apply_node_changes(changes);
        changed
    }

    // ─── Viewport ────────────────────────────────────────────────────────

    pub fn set_viewport(&mut self, viewport: Viewport) -> Result<(), CanvasError> {
        viewport.validate()?;
        self.viewport = viewport;
        self.unsaved = true;
        Ok(())
    }

    pub fn zoom_by(&mut self, anchor: Point, factor: f32) -> Result<(), CanvasError> {
        let next = zoom_at(self.viewport, anchor, factor, self.zoom_limits)?;
        self.set_viewport(next)
    }

    pub fn resize_surface(&mut self, surface: Size) {
        self.surface = surface;
    }

    /// Frame every node. An empty canvas keeps its viewport.
    pub fn fit_view(&mut self) -> Result<(), CanvasError> {
        let Some(bounds) = self.store.bounds() else {
            return Ok(());
        };
        let next = fit_view(bounds, self.surface, FIT_PADDING, self.zoom_limits)?;
        self.set_viewport(next)
    }

    // ─── Graph edits ─────────────────────────────────────────────────────

    pub fn add_node(&mut self, kind: NodeKind, position: Point, now_ms: u64) -> Result<NodeId, CanvasError> {
        let node = Node::generated(kind, position, now_ms);
        let id = node.id;
        self.store.add_node(node)?;
        Ok(id)
    }

    pub fn remove_node(&mut self, id: NodeId) -> bool {
        if self
            .gestures
            .active()
            .is_some_and(|c| c.element() == ElementRef::Node(id))
        {
            self.gestures.cancel();
        }
        self.store.remove_node(id).is_some()
    }

    pub fn connect(&mut self, source: NodeId, target: NodeId) -> Result<Edge, CanvasError> {
        self.connect_handles(Connection::new(source, target))
    }

    /// Rejected connections create no edge and leave the graph unchanged.
    pub fn connect_handles(&mut self, conn: Connection) -> Result<Edge, CanvasError> {
        self.store.connect_handles(conn).inspect_err(|err| {
            log::debug!("connection rejected: {err}");
        })
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> bool {
        self.store.remove_edge(id).is_some()
    }

    /// Replace the configuration. Cosmetic edge settings restyle existing
    /// edges in place; an algorithm or direction change requests a
    /// relayout. Overlays keep their session geometry.
    pub fn set_config(&mut self, config: CanvasConfig) {
        if needs_relayout(&self.config.layout, &config.layout) {
            log::info!(
                "layout changed to `{}` {:?}; relayout requested",
                config.layout.algorithm,
                config.layout.direction
            );
            self.layout_requested = true;
        }
        self.store.set_edge_defaults(config.edge_defaults());
        self.config = config;
        self.unsaved = true;
    }

    // ─── Layout ──────────────────────────────────────────────────────────

    pub fn layout_requested(&self) -> bool {
        self.layout_requested
    }

    pub fn request_layout(&mut self) {
        self.layout_requested = true;
    }

    /// Detach a layout job from the current graph and clear the request.
    pub fn take_layout_job(&mut self) -> LayoutJob {
        self.layout_requested = false;
        let with_ports = self.config.uses_handles()
            && self.store.nodes().iter().any(|n| n.kind == NodeKind::Custom);
        let job = LayoutJob::from_store(&self.store, &self.config.layout, with_ports);
        self.laid_out = Some(job.nodes.iter().map(|n| n.id).collect());
        job
    }

    /// Reconcile a finished layout into the live graph and frame it.
    /// Returns how many nodes moved.
    pub fn apply_layout(&mut self, outcome: &LayoutOutcome) -> usize {
        let moved = apply_outcome(&mut self.store, outcome);
        if moved > 0
            && let Err(err) = self.fit_view()
        {
            log::warn!("fit-view after layout failed: {err}");
        }
        moved
    }

    /// Reconcile raw solver output against the graph as it is now. Nodes the
    /// solver never saw keep their positions and are not reported missing.
    pub fn apply_layout_response(&mut self, response: &LayoutResponse) -> LayoutOutcome {
        let nodes: Vec<Node> = match &self.laid_out {
            Some(ids) => self
                .store
                .nodes()
                .iter()
                .filter(|n| ids.contains(&n.id))
                .cloned()
                .collect(),
            None => self.store.nodes().to_vec(),
        };
        let outcome = reconcile(&nodes, self.store.edges(), response);
        self.apply_layout(&outcome);
        outcome
    }

    /// Lay out with the built-in solver, synchronously.
    pub fn relayout_now(&mut self) -> LayoutOutcome {
        let job = self.take_layout_job();
        let outcome = LayoutOrchestrator::new(BuiltinSolver).run_now(&job);
        self.apply_layout(&outcome);
        outcome
    }

    // ─── Persistence ─────────────────────────────────────────────────────

    /// Drain store notifications into persistence and write a snapshot if
    /// the debounce window has closed. Returns whether a snapshot was
    /// written.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        let events = self.events.drain();
        self.persistence.observe(&events, now_ms);
        if std::mem::take(&mut self.unsaved) {
            self.persistence.mark_dirty(now_ms);
        }
        let Self {
            store,
            viewport,
            config,
            overlays,
            persistence,
            ..
        } = self;
        persistence.poll(now_ms, || snapshot_of(store, *viewport, config, overlays, now_ms))
    }

    /// Write the current state immediately.
    pub fn flush(&mut self, now_ms: u64) -> Result<(), SnapshotError> {
        self.events.drain();
        self.unsaved = false;
        let snapshot = snapshot_of(&self.store, self.viewport, &self.config, &self.overlays, now_ms);
        self.persistence.flush(&snapshot)
    }
}

fn flow_handle(side: HandleSide, role: HandleRole, style: &StyleBag) -> Handle {
    Handle {
        id: format!("{}-0-{}", side.as_str(), role.as_str()),
        side,
        index: 0,
        offset_percent: 50.0,
        role,
        style: style.clone(),
    }
}
