//! Canvas configuration supplied by the host application.
//!
//! Deserializes from camelCase JSON; every field has a default so partial
//! configuration objects are accepted.

use crate::error::CanvasError;
use crate::handles::HandleAxis;
use crate::model::{EdgeDefaults, EdgeKind, OverlayElement};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutDirection {
    /// Layers stack top to bottom.
    #[default]
    Down,
    /// Layers stack left to right.
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    /// Solver algorithm name (`layered`, `grid`, or anything an external
    /// solver understands).
    pub algorithm: String,
    pub direction: LayoutDirection,
    /// Gap between nodes within a layer.
    pub node_spacing: f32,
    /// Gap between consecutive layers.
    pub layer_spacing: f32,
    /// Keep the input order of siblings as the initial in-layer order.
    pub consider_model_order: bool,
    /// Ask the solver to reorder layers to reduce edge crossings.
    pub crossing_minimization: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            algorithm: "layered".to_string(),
            direction: LayoutDirection::Down,
            node_spacing: 50.0,
            layer_spacing: 80.0,
            consider_model_order: true,
            crossing_minimization: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CanvasConfig {
    pub handle_position: HandleAxis,
    pub handle_count: usize,
    pub edge_type: EdgeKind,
    pub animated_edges: bool,
    pub show_edge_labels: bool,
    /// Whether elements may be dragged and resized.
    pub editable: bool,
    pub layout: LayoutConfig,
    /// Overlay widgets created at mount.
    pub overlays: Vec<OverlayElement>,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            handle_position: HandleAxis::Horizontal,
            handle_count: 2,
            edge_type: EdgeKind::Bezier,
            animated_edges: false,
            show_edge_labels: true,
            editable: true,
            layout: LayoutConfig::default(),
            overlays: Vec::new(),
        }
    }
}

impl CanvasConfig {
    pub fn from_json(json: &str) -> Result<Self, CanvasError> {
        serde_json::from_str(json).map_err(|e| CanvasError::InvalidConfig(e.to_string()))
    }

    /// The cosmetic edge settings, applied in place to existing edges.
    pub fn edge_defaults(&self) -> EdgeDefaults {
        EdgeDefaults {
            kind: self.edge_type,
            animated: self.animated_edges,
            show_labels: self.show_edge_labels,
        }
    }

    /// Handle-based custom nodes are active when any handle is requested.
    pub fn uses_handles(&self) -> bool {
        self.handle_count > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::OverlayId;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_json_fills_defaults() {
        let config = CanvasConfig::from_json(
            r#"{ "handlePosition": "all", "edgeType": "smoothstep", "layout": { "direction": "right" } }"#,
        )
        .unwrap();
        assert_eq!(config.handle_position, HandleAxis::All);
        assert_eq!(config.edge_type, EdgeKind::SmoothStep);
        assert_eq!(config.layout.direction, LayoutDirection::Right);
        assert_eq!(config.layout.algorithm, "layered");
        assert_eq!(config.handle_count, 2);
    }

    #[test]
    fn overlays_parse_from_config() {
        let config = CanvasConfig::from_json(
            r#"{ "overlays": [ { "id": "note", "kind": "shape", "position": { "x": 5, "y": 6 } } ] }"#,
        )
        .unwrap();
        assert_eq!(config.overlays.len(), 1);
        assert_eq!(config.overlays[0].id, OverlayId::intern("note"));
    }

    #[test]
    fn malformed_json_is_invalid_config() {
        let err = CanvasConfig::from_json("{ handleCount: ").unwrap_err();
        assert!(matches!(err, CanvasError::InvalidConfig(_)));
    }
}
