use thiserror::Error;

use crate::clustering::domain::cluster_error::ClusterError;
use crate::embedding::domain::embedding_source::EmbeddingError;

/// Failure of one clustering call. Nothing is returned on failure; the
/// caller decides whether to retry.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("failed to embed crop {index}: {source}")]
    Embedding {
        index: usize,
        #[source]
        source: EmbeddingError,
    },
    #[error("grouping failed: {0}")]
    Clustering(#[from] ClusterError),
    #[error("cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineErrorKind {
    Embedding,
    Clustering,
    Cancelled,
}

impl PipelineError {
    pub fn kind(&self) -> PipelineErrorKind {
        match self {
            PipelineError::Embedding { .. } => PipelineErrorKind::Embedding,
            PipelineError::Clustering(_) => PipelineErrorKind::Clustering,
            PipelineError::Cancelled => PipelineErrorKind::Cancelled,
        }
    }
}
