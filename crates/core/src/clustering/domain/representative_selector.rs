use crate::shared::math;

/// Picks the member that best stands in for its group.
///
/// The representative is the vector closest (Euclidean) to the group
/// centroid; ties go to the lowest index so the choice is deterministic.
pub struct RepresentativeSelector;

impl RepresentativeSelector {
    pub fn new() -> Self {
        Self
    }

    /// Index into `vectors` of the representative.
    ///
    /// Groups are never empty; an empty slice yields 0.
    pub fn select<V: AsRef<[f32]>>(&self, vectors: &[V]) -> usize {
        debug_assert!(!vectors.is_empty(), "groups are never empty");
        let center = math::centroid(vectors);

        let mut best = 0;
        let mut best_dist = f64::INFINITY;
        for (idx, v) in vectors.iter().enumerate() {
            let dist = math::squared_distance_to(v.as_ref(), &center);
            if dist < best_dist {
                best = idx;
                best_dist = dist;
            }
        }
        best
    }
}

impl Default for RepresentativeSelector {
    fn default() -> Self {
        Self::new()
    }
}
