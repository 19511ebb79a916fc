//! Built-in layered (Sugiyama-style) solver.
//!
//! Phases:
//!   1. Cycle removal (reverse DFS back-edges)
//!   2. Layer assignment (longest path)
//!   3. In-layer ordering (model order or id), optional barycenter sweeps
//!   4. Coordinate assignment along the layout direction
//!
//! Long edges are not split with dummy nodes; they simply skip layers.

use crate::error::LayoutError;
use crate::request::{LayoutRequest, LayoutResponse, PositionedBox};
use fc_core::LayoutDirection;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{DfsEvent, depth_first_search};
use std::collections::{HashMap, HashSet};

/// Number of down+up barycenter sweep pairs.
const SWEEPS: usize = 4;

/// Build a DAG over request indices: self-loops dropped, back-edges reversed.
fn acyclic_graph(request: &LayoutRequest) -> DiGraph<usize, ()> {
    let mut graph = DiGraph::<usize, ()>::with_capacity(request.nodes.len(), request.edges.len());
    let mut index: HashMap<_, NodeIndex> = HashMap::new();
    for (i, b) in request.nodes.iter().enumerate() {
        index.insert(b.id, graph.add_node(i));
    }
    for arc in &request.edges {
        if let (Some(&s), Some(&t)) = (index.get(&arc.source), index.get(&arc.target))
            && s != t
        {
            graph.add_edge(s, t, ());
        }
    }

    let mut back_edges = HashSet::new();
    depth_first_search(&graph, graph.node_indices(), |event| {
        if let DfsEvent::BackEdge(u, v) = event {
            back_edges.insert((u, v));
        }
    });
    if back_edges.is_empty() {
        return graph;
    }

    let mut dag = DiGraph::with_capacity(graph.node_count(), graph.edge_count());
    for idx in graph.node_indices() {
        dag.add_node(graph[idx]);
    }
    for edge in graph.raw_edges() {
        let (s, t) = (edge.source(), edge.target());
        if back_edges.contains(&(s, t)) {
            dag.add_edge(t, s, ());
        } else {
            dag.add_edge(s, t, ());
        }
    }
    dag
}

/// Longest-path layering: every node sits one layer below its deepest
/// predecessor.
fn assign_layers(dag: &DiGraph<usize, ()>) -> Result<Vec<usize>, LayoutError> {
    let order = toposort(dag, None)
        .map_err(|_| LayoutError::SolverFailure("cycle left after back-edge removal".into()))?;
    let mut layer = vec![0usize; dag.node_count()];
    for idx in order {
        let depth = dag
            .neighbors_directed(idx, petgraph::Direction::Incoming)
            .map(|p| layer[p.index()] + 1)
            .max()
            .unwrap_or(0);
        layer[idx.index()] = depth;
    }
    Ok(layer)
}

/// Reorder each layer by the mean position of its neighbours in `layers`
/// already fixed by the sweep.
fn barycenter_pass(
    layers: &mut [Vec<NodeIndex>],
    dag: &DiGraph<usize, ()>,
    direction: petgraph::Direction,
) {
    let mut position: HashMap<NodeIndex, f32> = HashMap::new();
    for layer in layers.iter() {
        for (i, &n) in layer.iter().enumerate() {
            position.insert(n, i as f32);
        }
    }

    for layer in layers.iter_mut() {
        let mut keyed: Vec<(f32, NodeIndex)> = layer
            .iter()
            .map(|&n| {
                let (sum, count) = dag
                    .neighbors_directed(n, direction)
                    .filter_map(|m| position.get(&m))
                    .fold((0.0f32, 0usize), |(s, c), p| (s + p, c + 1));
                let own = position[&n];
                let key = if count == 0 { own } else { sum / count as f32 };
                (key, n)
            })
            .collect();
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
        *layer = keyed.into_iter().map(|(_, n)| n).collect();
        for (i, &n) in layer.iter().enumerate() {
            position.insert(n, i as f32);
        }
    }
}

pub fn layout(request: &LayoutRequest) -> Result<LayoutResponse, LayoutError> {
    if request.nodes.is_empty() {
        return Ok(LayoutResponse::default());
    }

    let dag = acyclic_graph(request);
    let layer_of = assign_layers(&dag)?;
    let depth = layer_of.iter().copied().max().unwrap_or(0) + 1;

    let mut layers: Vec<Vec<NodeIndex>> = vec![Vec::new(); depth];
    for idx in dag.node_indices() {
        layers[layer_of[idx.index()]].push(idx);
    }
    if !request.consider_model_order {
        for layer in &mut layers {
            layer.sort_by(|a, b| {
                let (ia, ib) = (&request.nodes[dag[*a]].id, &request.nodes[dag[*b]].id);
                ia.as_str().cmp(ib.as_str())
            });
        }
    }

    if request.crossing_minimization {
        for _ in 0..SWEEPS {
            barycenter_pass(&mut layers, &dag, petgraph::Direction::Incoming);
            layers.reverse();
            barycenter_pass(&mut layers, &dag, petgraph::Direction::Outgoing);
            layers.reverse();
        }
    }

    // (main, cross) extents of a box for the chosen direction
    let extents = |n: NodeIndex| {
        let b = &request.nodes[dag[n]];
        match request.direction {
            LayoutDirection::Down => (b.height, b.width),
            LayoutDirection::Right => (b.width, b.height),
        }
    };

    let spans: Vec<f32> = layers
        .iter()
        .map(|layer| {
            let total: f32 = layer.iter().map(|&n| extents(n).1).sum();
            total + request.node_spacing * layer.len().saturating_sub(1) as f32
        })
        .collect();
    let widest = spans.iter().copied().fold(0.0f32, f32::max);

    let mut placed = Vec::with_capacity(request.nodes.len());
    let mut main = 0.0f32;
    for (layer, span) in layers.iter().zip(&spans) {
        let thickness = layer.iter().map(|&n| extents(n).0).fold(0.0f32, f32::max);
        let mut cross = (widest - span) / 2.0;
        for &n in layer {
            let b = &request.nodes[dag[n]];
            let (_, cross_len) = extents(n);
            let (x, y) = match request.direction {
                LayoutDirection::Down => (cross, main),
                LayoutDirection::Right => (main, cross),
            };
            placed.push(PositionedBox {
                id: b.id,
                x,
                y,
                width: Some(b.width),
                height: Some(b.height),
            });
            cross += cross_len + request.node_spacing;
        }
        main += thickness + request.layer_spacing;
    }

    log::debug!(
        "layered layout placed {} node(s) in {} layer(s)",
        placed.len(),
        depth
    );
    Ok(LayoutResponse { nodes: placed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::LayoutArc;
    use crate::request::LayoutBox;
    use fc_core::{EdgeId, NodeId};
    use smallvec::SmallVec;

    fn request(nodes: &[&str], edges: &[(&str, &str)], direction: LayoutDirection) -> LayoutRequest {
        LayoutRequest {
            algorithm: "layered".into(),
            direction,
            node_spacing: 50.0,
            layer_spacing: 80.0,
            consider_model_order: true,
            crossing_minimization: true,
            nodes: nodes
                .iter()
                .map(|id| LayoutBox {
                    id: NodeId::intern(id),
                    width: 150.0,
                    height: 50.0,
                    ports: SmallVec::new(),
                })
                .collect(),
            edges: edges
                .iter()
                .map(|(s, t)| LayoutArc {
                    id: EdgeId::intern(&format!("{s}->{t}")),
                    source: NodeId::intern(s),
                    target: NodeId::intern(t),
                    source_port: None,
                    target_port: None,
                })
                .collect(),
        }
    }

    fn pos(resp: &LayoutResponse, id: &str) -> (f32, f32) {
        let b = resp
            .nodes
            .iter()
            .find(|b| b.id == NodeId::intern(id))
            .expect("node placed");
        (b.x, b.y)
    }

    #[test]
    fn chain_stacks_downward() {
        let resp = layout(&request(&["a", "b", "c"], &[("a", "b"), ("b", "c")], LayoutDirection::Down))
            .unwrap();
        let (a, b, c) = (pos(&resp, "a"), pos(&resp, "b"), pos(&resp, "c"));
        assert_eq!(a.1, 0.0);
        assert_eq!(b.1, 130.0);
        assert_eq!(c.1, 260.0);
        assert_eq!(a.0, b.0);
    }

    #[test]
    fn chain_flows_right() {
        let resp = layout(&request(&["a", "b"], &[("a", "b")], LayoutDirection::Right)).unwrap();
        let (a, b) = (pos(&resp, "a"), pos(&resp, "b"));
        assert_eq!(b.0, 230.0);
        assert!(b.0 > a.0);
        assert_eq!(a.1, b.1);
    }

    #[test]
    fn siblings_share_a_layer_without_overlap() {
        let resp = layout(&request(
            &["root", "l", "r"],
            &[("root", "l"), ("root", "r")],
            LayoutDirection::Down,
        ))
        .unwrap();
        let (l, r) = (pos(&resp, "l"), pos(&resp, "r"));
        assert_eq!(l.1, r.1);
        assert!((l.0 - r.0).abs() >= 200.0, "siblings overlap: {l:?} {r:?}");
        // parent is centred over the wider layer
        let root = pos(&resp, "root");
        assert_eq!(root.0, 100.0);
    }

    #[test]
    fn cycles_are_broken() {
        let resp = layout(&request(
            &["a", "b", "c"],
            &[("a", "b"), ("b", "c"), ("c", "a")],
            LayoutDirection::Down,
        ))
        .unwrap();
        assert_eq!(resp.nodes.len(), 3);
        let ys: HashSet<i32> = resp.nodes.iter().map(|b| b.y as i32).collect();
        assert_eq!(ys.len(), 3, "cycle should still produce three layers");
    }

    #[test]
    fn disconnected_nodes_are_placed() {
        let resp = layout(&request(&["x", "y"], &[], LayoutDirection::Down)).unwrap();
        assert_eq!(resp.nodes.len(), 2);
        assert_eq!(pos(&resp, "x").1, pos(&resp, "y").1);
    }

    #[test]
    fn empty_graph_is_fine() {
        assert!(layout(&request(&[], &[], LayoutDirection::Down)).unwrap().nodes.is_empty());
    }
}
