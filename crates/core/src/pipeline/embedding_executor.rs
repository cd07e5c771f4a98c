use crate::embedding::domain::embedding_source::EmbeddingSource;
use crate::pipeline::pipeline_error::PipelineError;
use crate::shared::crop::Crop;

/// Called after each embedded crop with `(done, total)`; returning `false`
/// stops the batch with [`PipelineError::Cancelled`].
pub type BatchProgress<'a> = &'a mut dyn FnMut(usize, usize) -> bool;

/// Abstracts how a batch of crops is pushed through an [`EmbeddingSource`].
///
/// Implementations return one vector per crop, in input order, or the
/// first failure. The progress callback always runs on the calling thread.
pub trait EmbeddingExecutor: Send {
    fn embed_all(
        &self,
        embedder: &dyn EmbeddingSource,
        crops: &[Crop],
        progress: BatchProgress<'_>,
    ) -> Result<Vec<Vec<f32>>, PipelineError>;
}

/// Embeds crops one after another on the calling thread.
pub struct SequentialEmbeddingExecutor;

impl EmbeddingExecutor for SequentialEmbeddingExecutor {
    fn embed_all(
        &self,
        embedder: &dyn EmbeddingSource,
        crops: &[Crop],
        progress: BatchProgress<'_>,
    ) -> Result<Vec<Vec<f32>>, PipelineError> {
        let total = crops.len();
        let mut vectors = Vec::with_capacity(total);
        for (index, crop) in crops.iter().enumerate() {
            let vector = embedder
                .embed(crop)
                .map_err(|source| PipelineError::Embedding { index, source })?;
            vectors.push(vector);
            if !progress(index + 1, total) {
                return Err(PipelineError::Cancelled);
            }
        }
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::domain::embedding_source::EmbeddingError;
    use crate::shared::bounding_box::BoundingBox;
    use crate::shared::frame::Frame;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Embeds a crop as its width; fails on widths listed in `fail_on`.
    struct WidthEmbedder {
        fail_on: Vec<u32>,
        calls: AtomicUsize,
    }

    impl EmbeddingSource for WidthEmbedder {
        fn embed(&self, crop: &Crop) -> Result<Vec<f32>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let w = crop.image().width();
            if self.fail_on.contains(&w) {
                return Err(EmbeddingError::Model("boom".into()));
            }
            Ok(vec![w as f32])
        }
    }

    fn crops(widths: &[u32]) -> Vec<Crop> {
        widths
            .iter()
            .map(|w| {
                Crop::new(
                    BoundingBox::new(0, 0, *w as i32, 1).unwrap(),
                    Frame::new(vec![0; (*w * 3) as usize], *w, 1, 3),
                )
            })
            .collect()
    }

    fn embedder(fail_on: Vec<u32>) -> WidthEmbedder {
        WidthEmbedder {
            fail_on,
            calls: AtomicUsize::new(0),
        }
    }

    #[test]
    fn test_sequential_preserves_order() {
        let mut seen = Vec::new();
        let vectors = SequentialEmbeddingExecutor
            .embed_all(&embedder(vec![]), &crops(&[3, 1, 2]), &mut |d, t| {
                seen.push((d, t));
                true
            })
            .unwrap();
        assert_eq!(vectors, vec![vec![3.0], vec![1.0], vec![2.0]]);
        assert_eq!(seen, vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[test]
    fn test_sequential_stops_at_first_failure() {
        let source = embedder(vec![2]);
        let result = SequentialEmbeddingExecutor.embed_all(&source, &crops(&[1, 2, 3]), &mut |_, _| true);
        assert!(matches!(result, Err(PipelineError::Embedding { index: 1, .. })));
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_sequential_cancellation() {
        let source = embedder(vec![]);
        let result =
            SequentialEmbeddingExecutor.embed_all(&source, &crops(&[1, 2, 3, 4]), &mut |done, _| done < 2);
        assert!(matches!(result, Err(PipelineError::Cancelled)));
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_sequential_empty_batch() {
        let vectors = SequentialEmbeddingExecutor
            .embed_all(&embedder(vec![]), &[], &mut |_, _| false)
            .unwrap();
        assert!(vectors.is_empty());
    }
}
