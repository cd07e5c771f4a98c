use thiserror::Error;

/// Failures raised by [`ClusterEngine`](super::cluster_engine::ClusterEngine).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClusterError {
    #[error("embedding {index} has dimension {found}, expected {expected}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },
    #[error("embedding {index} contains a non-finite component")]
    NonFiniteEmbedding { index: usize },
    #[error("group count must be at least 1, got {0}")]
    InvalidGroupCount(usize),
    #[error("partitioner returned an invalid assignment: {0}")]
    InvalidAssignment(String),
}
