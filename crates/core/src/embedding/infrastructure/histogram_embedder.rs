/// Model-free color embedding.
///
/// Describes a crop by its 2D Hue-Saturation histogram plus a coarse
/// brightness histogram, L2-normalized so Euclidean distance tracks color
/// similarity. Packaging of one product line tends to share a palette, which
/// makes this a serviceable offline embedder and a deterministic one for tests.
use crate::embedding::domain::embedding_source::{ensure_rgb, EmbeddingError, EmbeddingSource};
use crate::shared::crop::Crop;
use crate::shared::math;

pub const DEFAULT_HUE_BINS: usize = 18;
pub const DEFAULT_SAT_BINS: usize = 8;
pub const DEFAULT_VALUE_BINS: usize = 8;

pub struct HistogramEmbedder {
    hue_bins: usize,
    sat_bins: usize,
    value_bins: usize,
}

impl HistogramEmbedder {
    pub fn new(hue_bins: usize, sat_bins: usize, value_bins: usize) -> Self {
        Self {
            hue_bins: hue_bins.max(1),
            sat_bins: sat_bins.max(1),
            value_bins: value_bins.max(1),
        }
    }

    pub fn dimension(&self) -> usize {
        self.hue_bins * self.sat_bins + self.value_bins
    }
}

impl Default for HistogramEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_HUE_BINS, DEFAULT_SAT_BINS, DEFAULT_VALUE_BINS)
    }
}

impl EmbeddingSource for HistogramEmbedder {
    fn embed(&self, crop: &Crop) -> Result<Vec<f32>, EmbeddingError> {
        ensure_rgb(crop)?;

        let color_len = self.hue_bins * self.sat_bins;
        let mut hist = vec![0.0f32; self.dimension()];

        for px in crop.image().data().chunks_exact(3) {
            let r = px[0] as f64 / 255.0;
            let g = px[1] as f64 / 255.0;
            let b = px[2] as f64 / 255.0;
            let (h, s, v) = rgb_to_hsv(r, g, b);

            let h_bin = bin(h / 360.0, self.hue_bins);
            let s_bin = bin(s, self.sat_bins);
            let v_bin = bin(v, self.value_bins);

            hist[h_bin * self.sat_bins + s_bin] += 1.0;
            hist[color_len + v_bin] += 1.0;
        }

        math::l2_normalize(&mut hist);
        Ok(hist)
    }
}

/// Maps a value in `[0, 1]` to one of `bins` buckets.
fn bin(x: f64, bins: usize) -> usize {
    ((x * bins as f64) as usize).min(bins - 1)
}

fn rgb_to_hsv(r: f64, g: f64, b: f64) -> (f64, f64, f64) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let v = max;
    let s = if max > 0.0 { delta / max } else { 0.0 };

    let h = if delta == 0.0 {
        0.0
    } else if (max - r).abs() < f64::EPSILON {
        60.0 * (((g - b) / delta) % 6.0)
    } else if (max - g).abs() < f64::EPSILON {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    let h = if h < 0.0 { h + 360.0 } else { h };

    (h, s, v)
}
