//! Shared vector math for embedding and clustering code.
//!
//! Distances accumulate in `f64` regardless of the `f32` storage type so
//! centroid comparisons stay stable for high-dimensional embeddings.

/// Squared Euclidean distance between two equal-length vectors.
pub fn squared_distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = *x as f64 - *y as f64;
            d * d
        })
        .sum()
}

pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f64 {
    squared_distance(a, b).sqrt()
}

/// Squared distance from an `f32` point to an `f64` centroid.
pub fn squared_distance_to(point: &[f32], center: &[f64]) -> f64 {
    point
        .iter()
        .zip(center.iter())
        .map(|(x, c)| {
            let d = *x as f64 - c;
            d * d
        })
        .sum()
}

/// Coordinate-wise mean. Returns an empty vector for empty input.
pub fn centroid<V: AsRef<[f32]>>(vectors: &[V]) -> Vec<f64> {
    let Some(first) = vectors.first() else {
        return Vec::new();
    };
    let mut sum = vec![0.0f64; first.as_ref().len()];
    for v in vectors {
        for (s, x) in sum.iter_mut().zip(v.as_ref()) {
            *s += *x as f64;
        }
    }
    let n = vectors.len() as f64;
    for s in &mut sum {
        *s /= n;
    }
    sum
}

pub fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Find root of element `i` with path halving for amortized near-O(1).
pub fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

/// Merge the sets containing `a` and `b`.
pub fn union(parent: &mut [usize], a: usize, b: usize) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        parent[ra] = rb;
    }
}

/// Rewrites arbitrary labels to `0..m` in order of first appearance.
pub fn dense_labels(raw: &[usize]) -> Vec<usize> {
    let mut mapping = std::collections::HashMap::new();
    raw.iter()
        .map(|label| {
            let next = mapping.len();
            *mapping.entry(*label).or_insert(next)
        })
        .collect()
}
