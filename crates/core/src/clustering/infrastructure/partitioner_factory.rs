use crate::clustering::domain::partitioner::{Algorithm, Partitioner};
use crate::clustering::infrastructure::agglomerative_partitioner::AgglomerativePartitioner;
use crate::clustering::infrastructure::kmeans_partitioner::KMeansPartitioner;

/// Create the partitioner for `algorithm`.
///
/// `max_iter` and `tol` only affect iterative algorithms.
pub fn create_partitioner(algorithm: Algorithm, max_iter: usize, tol: f64) -> Box<dyn Partitioner> {
    match algorithm {
        Algorithm::Ward => Box::new(AgglomerativePartitioner::new()),
        Algorithm::Kmeans => Box::new(
            KMeansPartitioner::new()
                .with_max_iter(max_iter)
                .with_tol(tol),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::domain::cluster_engine::{ClusterEngine, Grouping};
    use crate::clustering::domain::cluster_error::ClusterError;
    use crate::clustering::domain::representative_selector::RepresentativeSelector;
    use crate::clustering::infrastructure::kmeans_partitioner::DEFAULT_TOL;
    use crate::shared::constants::DEFAULT_MAX_ITER;
    use rstest::rstest;

    fn engine(algorithm: Algorithm) -> ClusterEngine {
        ClusterEngine::new(create_partitioner(algorithm, DEFAULT_MAX_ITER, DEFAULT_TOL)).with_seed(17)
    }

    /// Deterministic pseudo-random vectors (LCG) so cases are reproducible.
    fn scattered(n: usize, dim: usize) -> Vec<Vec<f32>> {
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        (0..n)
            .map(|_| {
                (0..dim)
                    .map(|_| {
                        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
                        ((state >> 33) % 1000) as f32 / 100.0
                    })
                    .collect()
            })
            .collect()
    }

    /// Partition as a sorted set of sorted member lists, independent of ids.
    fn canonical(groups: &Grouping) -> Vec<Vec<usize>> {
        let mut sets: Vec<Vec<usize>> = groups.values().cloned().collect();
        sets.sort();
        sets
    }

    #[rstest]
    fn test_partition_property(
        #[values(Algorithm::Ward, Algorithm::Kmeans)] algorithm: Algorithm,
        #[values(1, 2, 5, 13, 40)] n: usize,
    ) {
        let vectors = scattered(n, 4);
        let groups = engine(algorithm).group(&vectors, None).unwrap();

        let mut all: Vec<usize> = groups.values().flatten().copied().collect();
        all.sort();
        assert_eq!(all, (0..n).collect::<Vec<_>>());
        assert!(groups.values().all(|members| !members.is_empty()));
        assert!(!groups.is_empty() && groups.len() <= n.max(1));
    }

    #[rstest]
    fn test_explicit_k_honored(
        #[values(Algorithm::Ward, Algorithm::Kmeans)] algorithm: Algorithm,
        #[values(1, 2, 3, 7, 12)] k: usize,
    ) {
        let vectors = scattered(12, 3);
        let groups = engine(algorithm).group(&vectors, Some(k)).unwrap();
        assert_eq!(groups.len(), k);
        assert_eq!(groups.keys().copied().collect::<Vec<_>>(), (0..k).collect::<Vec<_>>());
    }

    #[rstest]
    fn test_deterministic_for_same_seed(
        #[values(Algorithm::Ward, Algorithm::Kmeans)] algorithm: Algorithm,
    ) {
        let vectors = scattered(30, 5);
        let first = engine(algorithm).group(&vectors, Some(4)).unwrap();
        let second = engine(algorithm).group(&vectors, Some(4)).unwrap();
        assert_eq!(canonical(&first), canonical(&second));
        assert_eq!(first, second);
    }

    #[rstest]
    fn test_empty_input(#[values(Algorithm::Ward, Algorithm::Kmeans)] algorithm: Algorithm) {
        assert!(engine(algorithm).group(&[], None).unwrap().is_empty());
    }

    #[rstest]
    fn test_single_item_is_its_own_representative(
        #[values(Algorithm::Ward, Algorithm::Kmeans)] algorithm: Algorithm,
    ) {
        let vectors = vec![vec![0.3, 0.7]];
        let groups = engine(algorithm).group(&vectors, None).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[&0], vec![0]);
        assert_eq!(RepresentativeSelector::new().select(&vectors), 0);
    }

    #[rstest]
    fn test_k_greater_than_n_gives_singletons(
        #[values(Algorithm::Ward, Algorithm::Kmeans)] algorithm: Algorithm,
    ) {
        let vectors = scattered(4, 2);
        let groups = engine(algorithm).group(&vectors, Some(9)).unwrap();
        assert_eq!(groups.len(), 4);
        assert!(groups.values().all(|members| members.len() == 1));
    }

    #[rstest]
    fn test_two_pair_scenario(#[values(Algorithm::Ward, Algorithm::Kmeans)] algorithm: Algorithm) {
        let vectors = vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![10.0, 10.0],
            vec![10.0, 11.0],
        ];
        let groups = engine(algorithm).group(&vectors, Some(2)).unwrap();
        assert_eq!(canonical(&groups), vec![vec![0, 1], vec![2, 3]]);

        let selector = RepresentativeSelector::new();
        for members in groups.values() {
            let member_vectors: Vec<&Vec<f32>> = members.iter().map(|i| &vectors[*i]).collect();
            // Both members are equidistant from the pair's mean; lowest index wins.
            assert_eq!(selector.select(&member_vectors), 0);
        }
    }

    #[rstest]
    fn test_dimension_mismatch(#[values(Algorithm::Ward, Algorithm::Kmeans)] algorithm: Algorithm) {
        let vectors = vec![vec![0.0, 0.0], vec![0.0, 0.0, 0.0]];
        assert!(matches!(
            engine(algorithm).group(&vectors, None),
            Err(ClusterError::DimensionMismatch { .. })
        ));
    }

    #[rstest]
    fn test_non_finite_vector_rejected(
        #[values(Algorithm::Ward, Algorithm::Kmeans)] algorithm: Algorithm,
        #[values(f32::NAN, f32::INFINITY)] bad: f32,
    ) {
        let vectors = vec![
            vec![0.0, 0.0],
            vec![bad, 1.0],
            vec![10.0, 10.0],
            vec![10.0, 11.0],
        ];
        assert_eq!(
            engine(algorithm).group(&vectors, Some(2)),
            Err(ClusterError::NonFiniteEmbedding { index: 1 })
        );
    }
}
