//! Centroid-based partitioning (Lloyd's k-means).
//!
//! Minimizes the within-group sum of squared distances. Initial centroids
//! come from k-means++ seeding driven by a seeded [`StdRng`], so identical
//! `(vectors, k, seed)` always converge to the same assignment.
//!
//! Lloyd iterations can leave a centroid without members (duplicate seeds,
//! degenerate data). Such groups are refilled with the point farthest from
//! its own centroid, taken from a group that can spare one, so the result
//! always uses exactly `k` labels.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::clustering::domain::partitioner::Partitioner;
use crate::shared::constants::DEFAULT_MAX_ITER;
use crate::shared::math;

pub const DEFAULT_TOL: f64 = 1e-6;

pub struct KMeansPartitioner {
    max_iter: usize,
    tol: f64,
}

impl KMeansPartitioner {
    pub fn new() -> Self {
        Self {
            max_iter: DEFAULT_MAX_ITER,
            tol: DEFAULT_TOL,
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter.max(1);
        self
    }

    /// Stop once no centroid moves farther than `tol` (Euclidean).
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }
}

impl Default for KMeansPartitioner {
    fn default() -> Self {
        Self::new()
    }
}

impl Partitioner for KMeansPartitioner {
    fn partition(&self, vectors: &[Vec<f32>], k: usize, seed: u64) -> Vec<usize> {
        let n = vectors.len();
        if k >= n {
            return (0..n).collect();
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut centroids = init_centroids(vectors, k, &mut rng);
        let mut labels = vec![0usize; n];

        for iter in 0..self.max_iter {
            for (i, v) in vectors.iter().enumerate() {
                labels[i] = nearest(v, &centroids).0;
            }
            fill_empty_groups(vectors, &mut labels, &centroids, k);

            let updated = recompute_centroids(vectors, &labels, k);
            let shift = centroids
                .iter()
                .zip(&updated)
                .map(|(old, new)| {
                    old.iter()
                        .zip(new)
                        .map(|(a, b)| (a - b) * (a - b))
                        .sum::<f64>()
                })
                .fold(0.0f64, f64::max);
            centroids = updated;

            if shift <= self.tol * self.tol {
                log::debug!("k-means converged after {} iterations", iter + 1);
                break;
            }
        }

        labels
    }
}

/// k-means++: first centroid uniform, the rest sampled proportional to the
/// squared distance from the nearest centroid chosen so far.
fn init_centroids(vectors: &[Vec<f32>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let n = vectors.len();
    let to_f64 = |v: &[f32]| v.iter().map(|x| *x as f64).collect::<Vec<f64>>();

    let mut centroids = Vec::with_capacity(k);
    centroids.push(to_f64(vectors[rng.random_range(0..n)].as_slice()));

    let mut min_dist: Vec<f64> = vectors
        .iter()
        .map(|v| math::squared_distance_to(v, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f64 = min_dist.iter().sum();
        let selected = if total <= 0.0 {
            rng.random_range(0..n)
        } else {
            let threshold = rng.random::<f64>() * total;
            let mut cumsum = 0.0;
            min_dist
                .iter()
                .position(|d| {
                    cumsum += d;
                    cumsum >= threshold
                })
                .unwrap_or(n - 1)
        };

        let chosen = to_f64(vectors[selected].as_slice());
        for (d, v) in min_dist.iter_mut().zip(vectors) {
            *d = d.min(math::squared_distance_to(v, &chosen));
        }
        centroids.push(chosen);
    }

    centroids
}

/// Closest centroid and its squared distance; ties go to the lower index.
fn nearest(point: &[f32], centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (c, center) in centroids.iter().enumerate() {
        let dist = math::squared_distance_to(point, center);
        if dist < best.1 {
            best = (c, dist);
        }
    }
    best
}

fn fill_empty_groups(vectors: &[Vec<f32>], labels: &mut [usize], centroids: &[Vec<f64>], k: usize) {
    let mut counts = vec![0usize; k];
    for label in labels.iter() {
        counts[*label] += 1;
    }

    for empty in 0..k {
        if counts[empty] > 0 {
            continue;
        }
        // k <= n guarantees some group has a member to spare.
        let donor = labels
            .iter()
            .enumerate()
            .filter(|(_, label)| counts[**label] > 1)
            .map(|(i, label)| (i, math::squared_distance_to(&vectors[i], &centroids[*label])))
            .fold(None, |best: Option<(usize, f64)>, (i, d)| match best {
                Some((_, bd)) if bd >= d => best,
                _ => Some((i, d)),
            });
        if let Some((i, _)) = donor {
            counts[labels[i]] -= 1;
            labels[i] = empty;
            counts[empty] = 1;
        }
    }
}

fn recompute_centroids(vectors: &[Vec<f32>], labels: &[usize], k: usize) -> Vec<Vec<f64>> {
    let dim = vectors[0].len();
    let mut sums = vec![vec![0.0f64; dim]; k];
    let mut counts = vec![0usize; k];
    for (v, label) in vectors.iter().zip(labels) {
        counts[*label] += 1;
        for (s, x) in sums[*label].iter_mut().zip(v) {
            *s += *x as f64;
        }
    }
    for (sum, count) in sums.iter_mut().zip(&counts) {
        if *count > 0 {
            for s in sum.iter_mut() {
                *s /= *count as f64;
            }
        }
    }
    sums
}
