use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::Receiver;

use crate::embedding::domain::embedding_source::{EmbeddingError, EmbeddingSource};
use crate::pipeline::embedding_executor::{
    BatchProgress, EmbeddingExecutor, SequentialEmbeddingExecutor,
};
use crate::pipeline::pipeline_error::PipelineError;
use crate::shared::crop::Crop;

const DEFAULT_CHANNEL_CAPACITY: usize = 16;

type Embedded = (usize, Result<Vec<f32>, EmbeddingError>);

/// Embeds crops on a pool of scoped worker threads.
///
/// Layout: `job queue → N workers → result channel → caller`
///
/// Workers pull crop indices from a shared queue; the calling thread
/// reassembles results by index and owns the progress callback. On the
/// first failure or a cancel request the remaining workers stop before
/// their next crop.
pub struct ThreadedEmbeddingExecutor {
    workers: usize,
    channel_capacity: usize,
}

impl ThreadedEmbeddingExecutor {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl Default for ThreadedEmbeddingExecutor {
    fn default() -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::new(workers)
    }
}

impl EmbeddingExecutor for ThreadedEmbeddingExecutor {
    fn embed_all(
        &self,
        embedder: &dyn EmbeddingSource,
        crops: &[Crop],
        progress: BatchProgress<'_>,
    ) -> Result<Vec<Vec<f32>>, PipelineError> {
        let workers = self.workers.min(crops.len());
        if workers <= 1 {
            return SequentialEmbeddingExecutor.embed_all(embedder, crops, progress);
        }

        let (job_tx, job_rx) = crossbeam_channel::unbounded::<usize>();
        for index in 0..crops.len() {
            // receiver is alive in this scope
            let _ = job_tx.send(index);
        }
        drop(job_tx);

        let (result_tx, result_rx) = crossbeam_channel::bounded::<Embedded>(self.channel_capacity);
        let stop = AtomicBool::new(false);

        log::debug!("Embedding {} crops on {workers} threads", crops.len());

        std::thread::scope(|scope| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                let stop = &stop;
                scope.spawn(move || {
                    for index in job_rx {
                        if stop.load(Ordering::Relaxed) {
                            break;
                        }
                        let result = embedder.embed(&crops[index]);
                        if result_tx.send((index, result)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(result_tx);

            let collected = collect_results(result_rx, crops.len(), progress);
            if collected.is_err() {
                stop.store(true, Ordering::Relaxed);
            }
            collected
        })
    }
}

/// Drains the result channel on the calling thread. Dropping the receiver
/// on early return unblocks any worker waiting to send.
fn collect_results(
    result_rx: Receiver<Embedded>,
    total: usize,
    progress: BatchProgress<'_>,
) -> Result<Vec<Vec<f32>>, PipelineError> {
    let mut slots: Vec<Option<Vec<f32>>> = vec![None; total];
    let mut done = 0;

    for (index, result) in result_rx {
        let vector = result.map_err(|source| PipelineError::Embedding { index, source })?;
        slots[index] = Some(vector);
        done += 1;
        if !progress(done, total) {
            return Err(PipelineError::Cancelled);
        }
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.ok_or_else(|| PipelineError::Embedding {
                index,
                source: EmbeddingError::Model("worker exited before embedding crop".into()),
            })
        })
        .collect()
}
