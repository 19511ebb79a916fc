//! Solver wire format.
//!
//! A request describes the graph as sized boxes plus arcs, optionally with
//! one inbound and one outbound port per box so the solver keeps edges on
//! consistent sides. Field names are camelCase so the same structures can be
//! handed to an external JavaScript solver as JSON.

use fc_core::{Edge, EdgeId, LayoutConfig, LayoutDirection, Node, NodeId, Size};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashSet;

/// Box size used for nodes without explicit dimensions.
pub const DEFAULT_BOX: Size = Size::new(150.0, 50.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PortSide {
    North,
    South,
    East,
    West,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutPort {
    pub id: String,
    pub side: PortSide,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutBox {
    pub id: NodeId,
    pub width: f32,
    pub height: f32,
    #[serde(default, skip_serializing_if = "SmallVec::is_empty")]
    pub ports: SmallVec<[LayoutPort; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutArc {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_port: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutRequest {
    pub algorithm: String,
    pub direction: LayoutDirection,
    pub node_spacing: f32,
    pub layer_spacing: f32,
    pub consider_model_order: bool,
    pub crossing_minimization: bool,
    pub nodes: Vec<LayoutBox>,
    pub edges: Vec<LayoutArc>,
}

fn inbound_port(id: NodeId) -> String {
    format!("{id}-in")
}

fn outbound_port(id: NodeId) -> String {
    format!("{id}-out")
}

impl LayoutRequest {
    /// Describe the current graph for the solver.
    ///
    /// With `with_ports`, every box declares an inbound port on the side
    /// facing the previous layer and an outbound port on the opposite side,
    /// and every arc is pinned to those ports.
    pub fn build(nodes: &[Node], edges: &[Edge], config: &LayoutConfig, with_ports: bool) -> Self {
        let (in_side, out_side) = match config.direction {
            LayoutDirection::Down => (PortSide::North, PortSide::South),
            LayoutDirection::Right => (PortSide::West, PortSide::East),
        };

        let boxes: Vec<LayoutBox> = nodes
            .iter()
            .map(|node| {
                let size = node.size.unwrap_or(DEFAULT_BOX);
                let mut ports = SmallVec::new();
                if with_ports {
                    ports.push(LayoutPort {
                        id: inbound_port(node.id),
                        side: in_side,
                    });
                    ports.push(LayoutPort {
                        id: outbound_port(node.id),
                        side: out_side,
                    });
                }
                LayoutBox {
                    id: node.id,
                    width: size.width,
                    height: size.height,
                    ports,
                }
            })
            .collect();

        let known: HashSet<NodeId> = nodes.iter().map(|n| n.id).collect();
        let arcs = edges
            .iter()
            .filter(|e| known.contains(&e.source) && known.contains(&e.target))
            .map(|e| LayoutArc {
                id: e.id,
                source: e.source,
                target: e.target,
                source_port: with_ports.then(|| outbound_port(e.source)),
                target_port: with_ports.then(|| inbound_port(e.target)),
            })
            .collect();

        Self {
            algorithm: config.algorithm.clone(),
            direction: config.direction,
            node_spacing: config.node_spacing,
            layer_spacing: config.layer_spacing,
            consider_model_order: config.consider_model_order,
            crossing_minimization: config.crossing_minimization,
            nodes: boxes,
            edges: arcs,
        }
    }
}

/// A box placed by the solver (top-left corner, world units).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedBox {
    pub id: NodeId,
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LayoutResponse {
    pub nodes: Vec<PositionedBox>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use fc_core::{NodeKind, Point};
    use pretty_assertions::assert_eq;

    fn graph() -> (Vec<Node>, Vec<Edge>) {
        let a = Node::new(NodeId::intern("a"), NodeKind::Input, Point::ORIGIN);
        let b = Node::new(NodeId::intern("b"), NodeKind::Custom, Point::ORIGIN)
            .with_size(Size::new(200.0, 90.0));
        let e = Edge::new(EdgeId::intern("a-b"), a.id, b.id).unwrap();
        (vec![a, b], vec![e])
    }

    #[test]
    fn boxes_fall_back_to_default_size() {
        let (nodes, edges) = graph();
        let req = LayoutRequest::build(&nodes, &edges, &LayoutConfig::default(), false);
        assert_eq!((req.nodes[0].width, req.nodes[0].height), (150.0, 50.0));
        assert_eq!((req.nodes[1].width, req.nodes[1].height), (200.0, 90.0));
        assert!(req.nodes[0].ports.is_empty());
        assert_eq!(req.edges[0].source_port, None);
    }

    #[test]
    fn ports_follow_direction() {
        let (nodes, edges) = graph();
        let config = LayoutConfig {
            direction: LayoutDirection::Right,
            ..LayoutConfig::default()
        };
        let req = LayoutRequest::build(&nodes, &edges, &config, true);
        assert_eq!(
            req.nodes[0].ports.as_slice(),
            &[
                LayoutPort { id: "a-in".into(), side: PortSide::West },
                LayoutPort { id: "a-out".into(), side: PortSide::East },
            ]
        );
        assert_eq!(req.edges[0].source_port.as_deref(), Some("a-out"));
        assert_eq!(req.edges[0].target_port.as_deref(), Some("b-in"));
    }

    #[test]
    fn request_serializes_camel_case() {
        let (nodes, edges) = graph();
        let req = LayoutRequest::build(&nodes, &edges, &LayoutConfig::default(), true);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["nodeSpacing"], 50.0);
        assert_eq!(json["direction"], "down");
        assert_eq!(json["edges"][0]["sourcePort"], "a-out");
        assert_eq!(json["nodes"][0]["ports"][0]["side"], "NORTH");
    }
}
