//! The layout-solver seam.
//!
//! A solver is an untrusted, potentially slow collaborator: it receives the
//! request by reference, may suspend for several frames, and may fail.
//! [`BuiltinSolver`] is the in-process implementation; hosts can plug in any
//! other engine (for example a JavaScript solver through the WASM bridge).

use crate::error::LayoutError;
use crate::layered;
use crate::request::{LayoutRequest, LayoutResponse, PositionedBox};
use std::future::Future;

pub trait LayoutSolver {
    fn solve(
        &self,
        request: &LayoutRequest,
    ) -> impl Future<Output = Result<LayoutResponse, LayoutError>>;
}

/// In-process solver supporting the `layered` and `grid` algorithms.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinSolver;

impl BuiltinSolver {
    pub const ALGORITHMS: &'static [&'static str] = &["layered", "grid"];

    /// Solve without suspending. The async [`LayoutSolver`] impl delegates here.
    pub fn solve_now(&self, request: &LayoutRequest) -> Result<LayoutResponse, LayoutError> {
        match request.algorithm.as_str() {
            "layered" => layered::layout(request),
            "grid" => Ok(grid_layout(request)),
            other => Err(LayoutError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

impl LayoutSolver for BuiltinSolver {
    async fn solve(&self, request: &LayoutRequest) -> Result<LayoutResponse, LayoutError> {
        self.solve_now(request)
    }
}

/// Row-major packing into `ceil(sqrt(n))` columns of uniform cells.
fn grid_layout(request: &LayoutRequest) -> LayoutResponse {
    let n = request.nodes.len();
    if n == 0 {
        return LayoutResponse::default();
    }
    let cols = (n as f32).sqrt().ceil() as usize;
    let cell_w = request.nodes.iter().map(|b| b.width).fold(0.0f32, f32::max);
    let cell_h = request.nodes.iter().map(|b| b.height).fold(0.0f32, f32::max);

    let nodes = request
        .nodes
        .iter()
        .enumerate()
        .map(|(i, b)| PositionedBox {
            id: b.id,
            x: (i % cols) as f32 * (cell_w + request.node_spacing),
            y: (i / cols) as f32 * (cell_h + request.layer_spacing),
            width: Some(b.width),
            height: Some(b.height),
        })
        .collect();
    LayoutResponse { nodes }
}
