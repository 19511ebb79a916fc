//! Layout orchestration: request → solver → reconciliation.
//!
//! Layout is advisory. A failed solve returns the input untouched, and a
//! partial result only moves the nodes it mentions. Results are matched by
//! node id, never by position in the array, because the store stays
//! editable while the solver runs.
//!
//! There is no cancellation: two layouts may be in flight at once and the
//! one applied last wins.

use crate::error::LayoutError;
use crate::request::{LayoutRequest, LayoutResponse};
use crate::solver::{BuiltinSolver, LayoutSolver};
use fc_core::{CanvasStore, Edge, LayoutConfig, Node, NodeChange, NodeId, Point};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub enum LayoutStatus {
    /// Every node received a new position.
    Applied,
    /// Some nodes were missing from the solver result and kept their place.
    Partial(LayoutError),
    /// The solver failed; nothing moved.
    Failed(LayoutError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutOutcome {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub status: LayoutStatus,
}

impl LayoutOutcome {
    pub fn error(&self) -> Option<&LayoutError> {
        match &self.status {
            LayoutStatus::Applied => None,
            LayoutStatus::Partial(err) | LayoutStatus::Failed(err) => Some(err),
        }
    }

    pub fn moved_anything(&self) -> bool {
        !matches!(self.status, LayoutStatus::Failed(_))
    }
}

/// Everything a layout pass needs, detached from the live store so the
/// store can keep changing while the solver runs.
#[derive(Debug, Clone)]
pub struct LayoutJob {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub config: LayoutConfig,
    /// Declare inbound/outbound ports (handle-based custom nodes).
    pub with_ports: bool,
}

impl LayoutJob {
    pub fn from_store(store: &CanvasStore, config: &LayoutConfig, with_ports: bool) -> Self {
        Self {
            nodes: store.nodes().to_vec(),
            edges: store.edges().to_vec(),
            config: config.clone(),
            with_ports,
        }
    }

    pub fn request(&self) -> LayoutRequest {
        LayoutRequest::build(&self.nodes, &self.edges, &self.config, self.with_ports)
    }
}

pub async fn compute_layout<S: LayoutSolver>(
    solver: &S,
    nodes: &[Node],
    edges: &[Edge],
    config: &LayoutConfig,
    with_ports: bool,
) -> LayoutOutcome {
    let request = LayoutRequest::build(nodes, edges, config, with_ports);
    log::info!(
        "running `{}` layout over {} node(s), {} edge(s)",
        request.algorithm,
        request.nodes.len(),
        request.edges.len()
    );
    settle(nodes, edges, solver.solve(&request).await)
}

/// Turn a solver result into an outcome; failures keep the input as is.
pub fn settle(
    nodes: &[Node],
    edges: &[Edge],
    result: Result<LayoutResponse, LayoutError>,
) -> LayoutOutcome {
    match result {
        Ok(response) => reconcile(nodes, edges, &response),
        Err(err) => {
            log::warn!("layout failed, keeping previous positions: {err}");
            LayoutOutcome {
                nodes: nodes.to_vec(),
                edges: edges.to_vec(),
                status: LayoutStatus::Failed(err),
            }
        }
    }
}

/// Match solver boxes back to nodes by id. Identity and dimensions are
/// preserved; only positions change. Missing or non-finite entries leave
/// the node where it was.
pub fn reconcile(nodes: &[Node], edges: &[Edge], response: &LayoutResponse) -> LayoutOutcome {
    let placed: HashMap<NodeId, Point> = response
        .nodes
        .iter()
        .filter(|b| b.x.is_finite() && b.y.is_finite())
        .map(|b| (b.id, Point::new(b.x, b.y)))
        .collect();

    let mut missing = Vec::new();
    let laid_out = nodes
        .iter()
        .map(|node| {
            let mut node = node.clone();
            match placed.get(&node.id) {
                Some(&position) => node.position = position,
                None => missing.push(node.id),
            }
            node
        })
        .collect();

    let status = if missing.is_empty() {
        LayoutStatus::Applied
    } else {
        let err = LayoutError::Reconciliation { missing };
        log::warn!("{err}; those nodes keep their previous positions");
        LayoutStatus::Partial(err)
    };

    LayoutOutcome {
        nodes: laid_out,
        edges: edges.to_vec(),
        status,
    }
}

/// Commit an outcome to the live store.
///
/// Only nodes that still exist are moved; nodes removed while the solver ran
/// are dropped from the result, and nodes added meanwhile are left where they
/// are. Returns how many nodes moved.
pub fn apply_outcome(store: &mut CanvasStore, outcome: &LayoutOutcome) -> usize {
    if !outcome.moved_anything() {
        return 0;
    }
    let mut stale = 0usize;
    let changes: Vec<NodeChange> = outcome
        .nodes
        .iter()
        .filter_map(|laid| match store.node(laid.id) {
            Some(current) if current.position != laid.position => Some(NodeChange::Position {
                id: laid.id,
                position: laid.position,
            }),
            Some(_) => None,
            None => {
                stale += 1;
                None
            }
        })
        .collect();
    if stale > 0 {
        log::debug!("discarding layout result for {stale} removed node(s)");
    }
    let moved = changes.len();
    store.apply_node_changes(changes);
    moved
}

/// Whether a configuration change warrants an automatic relayout.
///
/// Only the algorithm and direction do; spacing and hint flags apply on the
/// next manual run, and cosmetic edge settings never move nodes.
pub fn needs_relayout(old: &LayoutConfig, new: &LayoutConfig) -> bool {
    old.algorithm != new.algorithm || old.direction != new.direction
}

/// Owns a solver and runs detached [`LayoutJob`]s against it.
pub struct LayoutOrchestrator<S> {
    solver: S,
}

impl<S: LayoutSolver> LayoutOrchestrator<S> {
    pub fn new(solver: S) -> Self {
        Self { solver }
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    pub async fn run(&self, job: &LayoutJob) -> LayoutOutcome {
        compute_layout(
            &self.solver,
            &job.nodes,
            &job.edges,
            &job.config,
            job.with_ports,
        )
        .await
    }
}

impl LayoutOrchestrator<BuiltinSolver> {
    /// Run a job on the built-in solver without suspending.
    pub fn run_now(&self, job: &LayoutJob) -> LayoutOutcome {
        let request = job.request();
        log::info!(
            "running `{}` layout over {} node(s) in-process",
            request.algorithm,
            request.nodes.len()
        );
        settle(&job.nodes, &job.edges, self.solver.solve_now(&request))
    }
}
