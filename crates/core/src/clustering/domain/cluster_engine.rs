use std::collections::BTreeMap;

use crate::clustering::domain::cluster_error::ClusterError;
use crate::clustering::domain::partitioner::Partitioner;
use crate::shared::constants::DEFAULT_SEED;

/// Group id → ascending member indices into the input sequence.
pub type Grouping = BTreeMap<usize, Vec<usize>>;

/// Partitions embedding vectors into a requested number of groups.
///
/// Validates input, resolves the group count, delegates the actual split to
/// a [`Partitioner`] and normalizes its labels into dense ids `0..k`,
/// numbered in order of each group's first member.
pub struct ClusterEngine {
    partitioner: Box<dyn Partitioner>,
    seed: u64,
    default_k: Option<usize>,
}

impl ClusterEngine {
    pub fn new(partitioner: Box<dyn Partitioner>) -> Self {
        Self {
            partitioner,
            seed: DEFAULT_SEED,
            default_k: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Group count used when a call passes `k = None`. Without one the
    /// engine falls back to `max(1, floor(sqrt(n)))`.
    pub fn with_default_k(mut self, default_k: Option<usize>) -> Self {
        self.default_k = default_k;
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn group(&self, vectors: &[Vec<f32>], k: Option<usize>) -> Result<Grouping, ClusterError> {
        let requested = k.or(self.default_k);
        if requested == Some(0) {
            return Err(ClusterError::InvalidGroupCount(0));
        }

        check_dimensions(vectors)?;

        let n = vectors.len();
        if n == 0 {
            return Ok(Grouping::new());
        }

        let k = requested.unwrap_or_else(|| default_group_count(n)).min(n);
        log::debug!("Partitioning {n} vectors into {k} groups (seed {})", self.seed);

        let assignment = self.partitioner.partition(vectors, k, self.seed);
        densify(&assignment, n, k)
    }
}

/// `max(1, floor(sqrt(n)))`.
pub fn default_group_count(n: usize) -> usize {
    ((n as f64).sqrt().floor() as usize).max(1)
}

/// Ensures every vector has the first vector's length and only finite
/// components. Reports the first offending index.
pub fn check_dimensions(vectors: &[Vec<f32>]) -> Result<(), ClusterError> {
    let Some(expected) = vectors.first().map(Vec::len) else {
        return Ok(());
    };
    for (index, v) in vectors.iter().enumerate() {
        if v.len() != expected {
            return Err(ClusterError::DimensionMismatch {
                index,
                expected,
                found: v.len(),
            });
        }
        if !v.iter().all(|x| x.is_finite()) {
            return Err(ClusterError::NonFiniteEmbedding { index });
        }
    }
    Ok(())
}

fn densify(assignment: &[usize], n: usize, k: usize) -> Result<Grouping, ClusterError> {
    if assignment.len() != n {
        return Err(ClusterError::InvalidAssignment(format!(
            "{} labels for {n} vectors",
            assignment.len()
        )));
    }
    if let Some(label) = assignment.iter().find(|label| **label >= k) {
        return Err(ClusterError::InvalidAssignment(format!(
            "label {label} outside 0..{k}"
        )));
    }

    let mut ids: BTreeMap<usize, usize> = BTreeMap::new();
    let mut groups = Grouping::new();
    for (idx, label) in assignment.iter().enumerate() {
        let next = ids.len();
        let id = *ids.entry(*label).or_insert(next);
        groups.entry(id).or_default().push(idx);
    }

    if groups.len() != k {
        return Err(ClusterError::InvalidAssignment(format!(
            "{} non-empty groups, expected {k}",
            groups.len()
        )));
    }
    Ok(groups)
}
