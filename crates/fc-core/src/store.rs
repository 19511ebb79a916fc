//! Canvas model store: the single writer of the node and edge collections.
//!
//! Every mutation goes through the store, which keeps node ids unique,
//! cascades node removal to dangling edges, and notifies subscribers with a
//! [`StoreEvent`] once the change is committed. Changes overwrite rather
//! than accumulate, so replaying a change-set yields the same state; when
//! two changes target the same node, the last one applied wins.

use crate::error::CanvasError;
use crate::id::{EdgeId, NodeId};
use crate::model::{Bounds, Edge, EdgeDefaults, Node, Point, Size};
use std::collections::HashMap;
use std::sync::mpsc::{Receiver, Sender, channel};

// ─── Change sets ─────────────────────────────────────────────────────────

/// An incremental change to a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeChange {
    Add(Node),
    Position { id: NodeId, position: Point },
    Dimensions { id: NodeId, size: Size },
    Select { id: NodeId, selected: bool },
    Replace(Node),
    Remove { id: NodeId },
}

/// An incremental change to an edge.
#[derive(Debug, Clone, PartialEq)]
pub enum EdgeChange {
    Add(Edge),
    Select { id: EdgeId, selected: bool },
    Replace(Edge),
    Remove { id: EdgeId },
}

/// A requested connection between two (optionally handle-qualified) nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub source: NodeId,
    pub target: NodeId,
    pub source_handle: Option<String>,
    pub target_handle: Option<String>,
}

impl Connection {
    pub fn new(source: NodeId, target: NodeId) -> Self {
        Self {
            source,
            target,
            source_handle: None,
            target_handle: None,
        }
    }

    /// Whether `edge` already joins the same two handles.
    pub fn joins(&self, edge: &Edge) -> bool {
        edge.source == self.source
            && edge.target == self.target
            && edge.source_handle == self.source_handle
            && edge.target_handle == self.target_handle
    }
}

// ─── Notifications ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeCause {
    Added,
    Moved,
    Resized,
    Selected,
    Replaced,
    Removed,
    /// Cosmetic update (edge kind, animation, label visibility).
    Restyled,
}

/// Emitted after each committed mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    Nodes { ids: Vec<NodeId>, cause: ChangeCause },
    Edges { ids: Vec<EdgeId>, cause: ChangeCause },
    /// The whole model was replaced (snapshot restore, default graph).
    Reset,
}

impl StoreEvent {
    /// Adds and removals change the graph's shape.
    pub fn is_structural(&self) -> bool {
        match self {
            StoreEvent::Nodes { cause, .. } | StoreEvent::Edges { cause, .. } => {
                matches!(cause, ChangeCause::Added | ChangeCause::Removed)
            }
            StoreEvent::Reset => true,
        }
    }

    pub fn is_cosmetic(&self) -> bool {
        matches!(
            self,
            StoreEvent::Edges {
                cause: ChangeCause::Restyled | ChangeCause::Selected,
                ..
            } | StoreEvent::Nodes {
                cause: ChangeCause::Selected,
                ..
            }
        )
    }
}

/// Receiving end of a store subscription. Dropping it unsubscribes.
pub struct Subscription {
    rx: Receiver<StoreEvent>,
}

impl Subscription {
    /// All events emitted since the last drain, oldest first.
    pub fn drain(&self) -> Vec<StoreEvent> {
        self.rx.try_iter().collect()
    }
}

// ─── Store ───────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct CanvasStore {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    /// NodeId → position in `nodes`.
    node_index: HashMap<NodeId, usize>,
    edge_defaults: EdgeDefaults,
    subscribers: Vec<Sender<StoreEvent>>,
}

impl CanvasStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_edge_defaults(edge_defaults: EdgeDefaults) -> Self {
        Self {
            edge_defaults,
            ..Self::default()
        }
    }

    pub fn subscribe(&mut self) -> Subscription {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        Subscription { rx }
    }

    fn emit(&mut self, event: StoreEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn reindex(&mut self) {
        self.node_index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id, i))
            .collect();
    }

    // ─── Reads ───────────────────────────────────────────────────────────

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.node_index.get(&id).map(|&i| &self.nodes[i])
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.node_index.get(&id).map(|&i| &mut self.nodes[i])
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.node_index.contains_key(&id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn edge_defaults(&self) -> EdgeDefaults {
        self.edge_defaults
    }

    /// Bounding box of every node, `None` for an empty canvas.
    pub fn bounds(&self) -> Option<Bounds> {
        self.nodes
            .iter()
            .map(Node::bounds)
            .reduce(|acc, b| acc.union(&b))
    }

    // ─── Node writes ─────────────────────────────────────────────────────

    pub fn add_node(&mut self, node: Node) -> Result<(), CanvasError> {
        let id = node.id;
        self.insert_node(node)?;
        self.emit(StoreEvent::Nodes {
            ids: vec![id],
            cause: ChangeCause::Added,
        });
        Ok(())
    }

    fn insert_node(&mut self, node: Node) -> Result<(), CanvasError> {
        node.validate_geometry()?;
        if self.node_index.contains_key(&node.id) {
            return Err(CanvasError::DuplicateNode(node.id));
        }
        self.node_index.insert(node.id, self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    /// Remove a node and every edge that references it.
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        let idx = self.node_index.get(&id).copied()?;
        let node = self.nodes.remove(idx);
        self.reindex();

        let mut dropped = Vec::new();
        self.edges.retain(|e| {
            if e.touches(id) {
                dropped.push(e.id);
                false
            } else {
                true
            }
        });

        self.emit(StoreEvent::Nodes {
            ids: vec![id],
            cause: ChangeCause::Removed,
        });
        if !dropped.is_empty() {
            log::debug!("removing {id} cascaded to {} edge(s)", dropped.len());
            self.emit(StoreEvent::Edges {
                ids: dropped,
                cause: ChangeCause::Removed,
            });
        }
        Some(node)
    }

    /// Apply a change-set in order. Changes for unknown nodes are skipped.
    pub fn apply_node_changes(&mut self, changes: impl IntoIterator<Item = NodeChange>) {
        for change in changes {
            match change {
                NodeChange::Add(node) => {
                    if let Err(err) = self.add_node(node) {
                        log::debug!("skipping node add: {err}");
                    }
                }
                NodeChange::Remove { id } => {
                    if self.remove_node(id).is_none() {
                        log::debug!("skipping removal of unknown node {id}");
                    }
                }
                NodeChange::Position { id, position } => {
                    if !position.is_finite() {
                        log::debug!("ignoring non-finite position {position:?} for {id}");
                        continue;
                    }
                    self.update_node(id, ChangeCause::Moved, |n| n.position = position);
                }
                NodeChange::Dimensions { id, size } => {
                    if !size.is_finite() {
                        log::debug!("ignoring non-finite size {size:?} for {id}");
                        continue;
                    }
                    self.update_node(id, ChangeCause::Resized, |n| n.size = Some(size));
                }
                NodeChange::Select { id, selected } => {
                    self.update_node(id, ChangeCause::Selected, |n| n.selected = selected);
                }
                NodeChange::Replace(node) => {
                    if let Err(err) = node.validate_geometry() {
                        log::debug!("skipping replacement of {}: {err}", node.id);
                        continue;
                    }
                    let id = node.id;
                    self.update_node(id, ChangeCause::Replaced, |n| *n = node);
                }
            }
        }
    }

    fn update_node(&mut self, id: NodeId, cause: ChangeCause, f: impl FnOnce(&mut Node)) {
        match self.node_mut(id) {
            Some(node) => {
                f(node);
                self.emit(StoreEvent::Nodes {
                    ids: vec![id],
                    cause,
                });
            }
            None => log::debug!("ignoring {cause:?} change for unknown node {id}"),
        }
    }

    // ─── Edge writes ─────────────────────────────────────────────────────

    /// Connect two nodes with an edge styled by the current edge defaults.
    pub fn connect(&mut self, source: NodeId, target: NodeId) -> Result<Edge, CanvasError> {
        self.connect_handles(Connection::new(source, target))
    }

    pub fn connect_handles(&mut self, conn: Connection) -> Result<Edge, CanvasError> {
        let id = EdgeId::for_connection(
            conn.source,
            conn.source_handle.as_deref(),
            conn.target,
            conn.target_handle.as_deref(),
        );
        let mut edge = Edge::new(id, conn.source, conn.target)?;
        if let Some(existing) = self.edges.iter().find(|e| conn.joins(e)) {
            return Err(CanvasError::DuplicateEdge(existing.id));
        }
        edge.id = self.unused_edge_id(id);
        edge.kind = self.edge_defaults.kind;
        edge.animated = self.edge_defaults.animated;
        edge.source_handle = conn.source_handle;
        edge.target_handle = conn.target_handle;
        self.add_edge(edge.clone())?;
        Ok(edge)
    }

    /// `id`, or `id` with a numeric suffix when a different connection
    /// already derived the same id.
    fn unused_edge_id(&self, id: EdgeId) -> EdgeId {
        if self.edge(id).is_none() {
            return id;
        }
        (2..)
            .map(|n| EdgeId::intern(&format!("{id}~{n}")))
            .find(|candidate| self.edge(*candidate).is_none())
            .unwrap_or(id)
    }

    /// Insert a fully-specified edge after validating its endpoints.
    pub fn add_edge(&mut self, edge: Edge) -> Result<(), CanvasError> {
        self.validate_edge(&edge)?;
        let id = edge.id;
        self.edges.push(edge);
        self.emit(StoreEvent::Edges {
            ids: vec![id],
            cause: ChangeCause::Added,
        });
        Ok(())
    }

    fn validate_edge(&self, edge: &Edge) -> Result<(), CanvasError> {
        if edge.source == edge.target {
            return Err(CanvasError::SelfConnectionRejected(edge.source));
        }
        for end in [edge.source, edge.target] {
            if !self.contains_node(end) {
                return Err(CanvasError::UnknownNode(end));
            }
        }
        if self.edge(edge.id).is_some() {
            return Err(CanvasError::DuplicateEdge(edge.id));
        }
        Ok(())
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> Option<Edge> {
        let idx = self.edges.iter().position(|e| e.id == id)?;
        let edge = self.edges.remove(idx);
        self.emit(StoreEvent::Edges {
            ids: vec![id],
            cause: ChangeCause::Removed,
        });
        Some(edge)
    }

    pub fn apply_edge_changes(&mut self, changes: impl IntoIterator<Item = EdgeChange>) {
        for change in changes {
            match change {
                EdgeChange::Add(edge) => {
                    if let Err(err) = self.add_edge(edge) {
                        log::debug!("skipping edge add: {err}");
                    }
                }
                EdgeChange::Remove { id } => {
                    if self.remove_edge(id).is_none() {
                        log::debug!("skipping removal of unknown edge {id}");
                    }
                }
                EdgeChange::Select { id, selected } => {
                    self.update_edge(id, ChangeCause::Selected, |e| e.selected = selected);
                }
                EdgeChange::Replace(edge) => {
                    if edge.source == edge.target
                        || !self.contains_node(edge.source)
                        || !self.contains_node(edge.target)
                    {
                        log::debug!("skipping invalid replacement for edge {}", edge.id);
                        continue;
                    }
                    let id = edge.id;
                    self.update_edge(id, ChangeCause::Replaced, |e| *e = edge);
                }
            }
        }
    }

    fn update_edge(&mut self, id: EdgeId, cause: ChangeCause, f: impl FnOnce(&mut Edge)) {
        match self.edges.iter_mut().find(|e| e.id == id) {
            Some(edge) => {
                f(edge);
                self.emit(StoreEvent::Edges {
                    ids: vec![id],
                    cause,
                });
            }
            None => log::debug!("ignoring {cause:?} change for unknown edge {id}"),
        }
    }

    /// Update the cosmetic edge settings and restyle every existing edge in
    /// place. Node positions are untouched.
    pub fn set_edge_defaults(&mut self, defaults: EdgeDefaults) {
        if self.edge_defaults == defaults {
            return;
        }
        self.edge_defaults = defaults;
        for edge in &mut self.edges {
            edge.kind = defaults.kind;
            edge.animated = defaults.animated;
        }
        let ids = self.edges.iter().map(|e| e.id).collect();
        self.emit(StoreEvent::Edges {
            ids,
            cause: ChangeCause::Restyled,
        });
    }

    /// Swap in a whole new model. Duplicate nodes and edges that would be
    /// invalid are dropped.
    pub fn replace_all(&mut self, nodes: Vec<Node>, edges: Vec<Edge>) {
        self.nodes.clear();
        self.edges.clear();
        self.node_index.clear();
        for node in nodes {
            if let Err(err) = self.insert_node(node) {
                log::warn!("dropping node while replacing model: {err}");
            }
        }
        for edge in edges {
            match self.validate_edge(&edge) {
                Ok(()) => self.edges.push(edge),
                Err(err) => log::warn!("dropping edge {} while replacing model: {err}", edge.id),
            }
        }
        self.emit(StoreEvent::Reset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EdgeKind, NodeKind};
    use pretty_assertions::assert_eq;

    fn node(id: &str, x: f32, y: f32) -> Node {
        Node::new(NodeId::intern(id), NodeKind::Default, Point::new(x, y))
    }

    fn store_with(ids: &[&str]) -> CanvasStore {
        let mut store = CanvasStore::new();
        for (i, id) in ids.iter().enumerate() {
            store.add_node(node(id, i as f32 * 100.0, 0.0)).unwrap();
        }
        store
    }

    #[test]
    fn connect_creates_edge() {
        let mut store = store_with(&["n1", "n2"]);
        let edge = store
            .connect(NodeId::intern("n1"), NodeId::intern("n2"))
            .unwrap();
        assert_eq!(edge.source, NodeId::intern("n1"));
        assert_eq!(edge.target, NodeId::intern("n2"));
        assert_eq!(store.edges().len(), 1);
    }

    #[test]
    fn connect_rejects_self() {
        let mut store = store_with(&["n1"]);
        let n1 = NodeId::intern("n1");
        assert_eq!(
            store.connect(n1, n1),
            Err(CanvasError::SelfConnectionRejected(n1))
        );
        assert!(store.edges().is_empty());
    }

    #[test]
    fn connect_rejects_unknown_and_duplicate() {
        let mut store = store_with(&["n1", "n2"]);
        let (n1, n2) = (NodeId::intern("n1"), NodeId::intern("n2"));
        let ghost = NodeId::intern("ghost");
        assert_eq!(store.connect(n1, ghost), Err(CanvasError::UnknownNode(ghost)));

        let edge = store.connect(n1, n2).unwrap();
        assert_eq!(store.connect(n1, n2), Err(CanvasError::DuplicateEdge(edge.id)));
        assert_eq!(store.edges().len(), 1);
    }

    #[test]
    fn connect_uses_edge_defaults() {
        let mut store = CanvasStore::with_edge_defaults(EdgeDefaults {
            kind: EdgeKind::Step,
            animated: true,
            show_labels: false,
        });
        store.add_node(node("a", 0.0, 0.0)).unwrap();
        store.add_node(node("b", 0.0, 0.0)).unwrap();
        let edge = store
            .connect(NodeId::intern("a"), NodeId::intern("b"))
            .unwrap();
        assert_eq!(edge.kind, EdgeKind::Step);
        assert!(edge.animated);
    }

    #[test]
    fn remove_node_cascades_edges() {
        let mut store = store_with(&["a", "b", "c"]);
        let (a, b, c) = (NodeId::intern("a"), NodeId::intern("b"), NodeId::intern("c"));
        store.connect(a, b).unwrap();
        store.connect(b, c).unwrap();
        store.connect(a, c).unwrap();

        store.remove_node(b).unwrap();
        assert_eq!(store.edges().len(), 1);
        assert!(store.edges().iter().all(|e| !e.touches(b)));
        // index stays coherent after removal
        assert_eq!(store.node(c).map(|n| n.id), Some(c));
    }

    #[test]
    fn remove_change_also_cascades() {
        let mut store = store_with(&["a", "b"]);
        let (a, b) = (NodeId::intern("a"), NodeId::intern("b"));
        store.connect(a, b).unwrap();
        store.apply_node_changes([NodeChange::Remove { id: a }]);
        assert!(store.edges().is_empty());
    }

    #[test]
    fn dimension_changes_are_idempotent() {
        let mut store = store_with(&["a"]);
        let a = NodeId::intern("a");
        let change = NodeChange::Dimensions {
            id: a,
            size: Size::new(120.0, 60.0),
        };
        store.apply_node_changes([change.clone()]);
        let once = store.nodes().to_vec();
        store.apply_node_changes([change]);
        assert_eq!(store.nodes(), once.as_slice());
    }

    #[test]
    fn last_applied_change_wins() {
        let mut store = store_with(&["a"]);
        let a = NodeId::intern("a");
        store.apply_node_changes([
            NodeChange::Position {
                id: a,
                position: Point::new(10.0, 10.0),
            },
            NodeChange::Position {
                id: a,
                position: Point::new(30.0, 40.0),
            },
        ]);
        assert_eq!(store.node(a).unwrap().position, Point::new(30.0, 40.0));
    }

    #[test]
    fn unknown_node_changes_are_ignored() {
        let mut store = store_with(&["a"]);
        let before = store.nodes().to_vec();
        store.apply_node_changes([NodeChange::Position {
            id: NodeId::intern("missing"),
            position: Point::new(1.0, 1.0),
        }]);
        assert_eq!(store.nodes(), before.as_slice());
    }

    #[test]
    fn duplicate_node_rejected() {
        let mut store = store_with(&["a"]);
        assert_eq!(
            store.add_node(node("a", 5.0, 5.0)),
            Err(CanvasError::DuplicateNode(NodeId::intern("a")))
        );
    }

    #[test]
    fn subscribers_see_committed_changes() {
        let mut store = store_with(&["a", "b"]);
        let sub = store.subscribe();
        let a = NodeId::intern("a");
        store.apply_node_changes([NodeChange::Position {
            id: a,
            position: Point::new(1.0, 2.0),
        }]);
        store.remove_node(a);

        let events = sub.drain();
        assert_eq!(
            events,
            vec![
                StoreEvent::Nodes {
                    ids: vec![a],
                    cause: ChangeCause::Moved
                },
                StoreEvent::Nodes {
                    ids: vec![a],
                    cause: ChangeCause::Removed
                },
            ]
        );
        assert!(sub.drain().is_empty());
    }

    #[test]
    fn dropped_subscriptions_are_pruned() {
        let mut store = store_with(&["a"]);
        let sub = store.subscribe();
        drop(sub);
        store.remove_node(NodeId::intern("a"));
        assert!(store.subscribers.is_empty());
    }

    #[test]
    fn edge_defaults_restyle_in_place() {
        let mut store = store_with(&["a", "b"]);
        store
            .connect(NodeId::intern("a"), NodeId::intern("b"))
            .unwrap();
        let positions: Vec<Point> = store.nodes().iter().map(|n| n.position).collect();
        let sub = store.subscribe();

        store.set_edge_defaults(EdgeDefaults {
            kind: EdgeKind::Straight,
            animated: true,
            show_labels: true,
        });

        assert_eq!(store.edges()[0].kind, EdgeKind::Straight);
        assert!(store.edges()[0].animated);
        let after: Vec<Point> = store.nodes().iter().map(|n| n.position).collect();
        assert_eq!(positions, after);
        assert!(sub.drain().iter().all(StoreEvent::is_cosmetic));
    }

    #[test]
    fn replace_all_drops_dangling_edges() {
        let mut store = CanvasStore::new();
        let (a, b) = (NodeId::intern("ra"), NodeId::intern("rb"));
        let good = Edge::new(EdgeId::intern("good"), a, b).unwrap();
        let dangling = Edge::new(EdgeId::intern("dangling"), a, NodeId::intern("gone")).unwrap();
        store.replace_all(vec![node("ra", 0.0, 0.0), node("rb", 0.0, 0.0)], vec![good, dangling]);
        assert_eq!(store.edges().len(), 1);
        assert_eq!(store.edges()[0].id, EdgeId::intern("good"));
    }

    #[test]
    fn bounds_cover_all_nodes() {
        let store = store_with(&["a", "b"]);
        let b = store.bounds().unwrap();
        assert_eq!(b, Bounds { x: 0.0, y: 0.0, width: 250.0, height: 40.0 });
        assert!(CanvasStore::new().bounds().is_none());
    }

    #[test]
    fn non_finite_geometry_never_reaches_the_store() {
        let mut store = store_with(&["fin"]);
        let id = NodeId::intern("fin");
        let sub = store.subscribe();
        store.apply_node_changes([
            NodeChange::Position { id, position: Point::new(f32::NAN, 5.0) },
            NodeChange::Dimensions { id, size: Size::new(f32::INFINITY, 30.0) },
        ]);
        let n = store.node(id).unwrap();
        assert_eq!((n.position, n.size), (Point::new(0.0, 0.0), None));
        assert!(sub.drain().is_empty());

        let bad = node("nan-node", f32::NEG_INFINITY, 0.0);
        assert_eq!(store.add_node(bad), Err(CanvasError::NonFiniteGeometry(NodeId::intern("nan-node"))));
        assert_eq!(store.nodes().len(), 1);
    }

    #[test]
    fn colliding_connection_ids_stay_distinct_edges() {
        let mut store = store_with(&["k", "k:out", "m"]);
        let (k, k_out, m) = (NodeId::intern("k"), NodeId::intern("k:out"), NodeId::intern("m"));
        let via_handle = store
            .connect_handles(Connection {
                source: k,
                target: m,
                source_handle: Some("out".to_string()),
                target_handle: None,
            })
            .unwrap();
        let plain = store.connect(k_out, m).unwrap();

        assert_ne!(via_handle.id, plain.id);
        assert_eq!(store.edges().len(), 2);
        assert_eq!(store.connect(k_out, m), Err(CanvasError::DuplicateEdge(plain.id)));
    }
}
