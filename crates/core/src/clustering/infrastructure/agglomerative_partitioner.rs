/// Hierarchical (agglomerative) partitioner with Ward linkage.
///
/// Builds the full merge tree over pairwise Euclidean distances, then
/// replays the cheapest `n - k` merges to leave exactly `k` groups. Ward
/// linkage merges the pair whose union increases within-group variance the
/// least, which favors compact groups of similar-looking products.
///
/// Fully deterministic: the seed is accepted for interface parity only.
use kodama::{linkage, Method};

use crate::clustering::domain::partitioner::Partitioner;
use crate::shared::math;

pub struct AgglomerativePartitioner {
    method: Method,
}

impl AgglomerativePartitioner {
    pub fn new() -> Self {
        Self {
            method: Method::Ward,
        }
    }
}

impl Default for AgglomerativePartitioner {
    fn default() -> Self {
        Self::new()
    }
}

impl Partitioner for AgglomerativePartitioner {
    fn partition(&self, vectors: &[Vec<f32>], k: usize, _seed: u64) -> Vec<usize> {
        let n = vectors.len();
        if k >= n {
            return (0..n).collect();
        }

        // Condensed upper-triangle distance matrix, row-major, n-choose-2 long.
        let mut condensed = Vec::with_capacity(n * (n - 1) / 2);
        for row in 0..n - 1 {
            for col in (row + 1)..n {
                condensed.push(math::euclidean_distance(&vectors[row], &vectors[col]));
            }
        }

        // Leaves are 0..n; merge step i creates cluster n + i.
        let dendrogram = linkage(&mut condensed, n, self.method);
        let mut parent: Vec<usize> = (0..2 * n - 1).collect();
        for (step_idx, step) in dendrogram.steps().iter().take(n - k).enumerate() {
            let merged = n + step_idx;
            math::union(&mut parent, step.cluster1, merged);
            math::union(&mut parent, step.cluster2, merged);
        }

        let roots: Vec<usize> = (0..n).map(|i| math::find(&mut parent, i)).collect();
        math::dense_labels(&roots)
    }
}
