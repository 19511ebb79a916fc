//! Error taxonomy for the canvas model.
//!
//! None of these are fatal to a session: callers recover locally (reject the
//! edit, keep the previous state) and report a non-blocking notification.

use crate::id::{EdgeId, NodeId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CanvasError {
    /// The viewport cannot be inverted: zoom must be finite and positive.
    #[error("invalid viewport (x: {x}, y: {y}, zoom: {zoom})")]
    InvalidViewport { x: f32, y: f32, zoom: f32 },

    /// A node cannot be connected to itself.
    #[error("cannot connect node {0} to itself")]
    SelfConnectionRejected(NodeId),

    /// A position or size was NaN or infinite.
    #[error("node {0} has non-finite geometry")]
    NonFiniteGeometry(NodeId),

    /// A pointer or anchor coordinate was NaN or infinite.
    #[error("non-finite coordinate ({x}, {y})")]
    NonFiniteCoordinate { x: f32, y: f32 },

    /// Zoom limits must be finite, positive and ordered.
    #[error("invalid zoom limits ({min}..{max})")]
    InvalidZoomLimits { min: f32, max: f32 },

    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("node {0} already exists")]
    DuplicateNode(NodeId),

    #[error("edge {0} already exists")]
    DuplicateEdge(EdgeId),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
