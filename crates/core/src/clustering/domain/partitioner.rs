use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Strategy that splits embedding vectors into exactly `k` groups.
///
/// Callers guarantee `1 <= k <= vectors.len()` and that all vectors share
/// one dimension. Implementations return one label in `0..k` per vector and
/// must use every label. The same `(vectors, k, seed)` must always produce
/// the same assignment.
pub trait Partitioner: Send + Sync {
    fn partition(&self, vectors: &[Vec<f32>], k: usize, seed: u64) -> Vec<usize>;
}

/// Selectable partitioning algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Agglomerative merging with Ward linkage.
    #[default]
    Ward,
    /// Lloyd's k-means with k-means++ seeding.
    Kmeans,
}

impl Algorithm {
    pub const ALL: &[Algorithm] = &[Algorithm::Ward, Algorithm::Kmeans];
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::Ward => write!(f, "ward"),
            Algorithm::Kmeans => write!(f, "kmeans"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown clustering algorithm '{0}' (expected ward or kmeans)")]
pub struct ParseAlgorithmError(pub String);

impl FromStr for Algorithm {
    type Err = ParseAlgorithmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ward" | "agglomerative" => Ok(Algorithm::Ward),
            "kmeans" | "k-means" => Ok(Algorithm::Kmeans),
            other => Err(ParseAlgorithmError(other.to_string())),
        }
    }
}
