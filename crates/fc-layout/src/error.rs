use fc_core::NodeId;
use thiserror::Error;

/// Failures of an auto-layout pass. All of them are recoverable: the
/// orchestrator keeps the prior positions of whatever it could not place.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    /// The solver threw, rejected, or produced garbage.
    #[error("layout solver failed: {0}")]
    SolverFailure(String),

    #[error("unsupported layout algorithm `{0}`")]
    UnsupportedAlgorithm(String),

    /// The solver result did not mention some of the requested nodes.
    #[error("layout result is missing {} node(s)", missing.len())]
    Reconciliation { missing: Vec<NodeId> },
}
