pub mod error;
pub mod layered;
pub mod orchestrator;
pub mod request;
pub mod solver;

pub use error::LayoutError;
pub use orchestrator::{
    LayoutJob, LayoutOrchestrator, LayoutOutcome, LayoutStatus, apply_outcome, compute_layout,
    needs_relayout, reconcile, settle,
};
pub use request::{LayoutRequest, LayoutResponse, PositionedBox};
pub use solver::{BuiltinSolver, LayoutSolver};
