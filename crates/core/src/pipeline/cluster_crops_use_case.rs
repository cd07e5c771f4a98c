use std::time::Instant;

use serde::Serialize;

use crate::clustering::domain::cluster_engine::ClusterEngine;
use crate::clustering::domain::representative_selector::RepresentativeSelector;
use crate::embedding::domain::embedding_source::EmbeddingSource;
use crate::pipeline::embedding_executor::{EmbeddingExecutor, SequentialEmbeddingExecutor};
use crate::pipeline::pipeline_error::PipelineError;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::crop::Crop;

pub type ProgressCallback = Box<dyn Fn(usize, usize) -> bool + Send>;

/// One input crop as it lands in a group.
#[derive(Debug, Clone, Serialize)]
pub struct GroupMember {
    /// Position of the crop in the `execute` input.
    pub source_index: usize,
    #[serde(skip)]
    pub crop: Crop,
    pub bounding_box: BoundingBox,
    #[serde(skip)]
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupResult {
    pub group_id: usize,
    /// Index into `members`, not into the original input.
    pub representative_index: usize,
    pub members: Vec<GroupMember>,
}

impl GroupResult {
    pub fn representative(&self) -> &GroupMember {
        &self.members[self.representative_index]
    }
}

/// Groups the product crops of one shelf photo by visual similarity.
///
/// Embeds every crop, partitions the vectors with the [`ClusterEngine`] and
/// picks the member nearest each group's centroid as its representative.
/// Any failure aborts the whole call.
pub struct ClusterCropsUseCase {
    embedder: Box<dyn EmbeddingSource>,
    engine: ClusterEngine,
    executor: Box<dyn EmbeddingExecutor>,
    selector: RepresentativeSelector,
    logger: Box<dyn PipelineLogger>,
    on_progress: Option<ProgressCallback>,
}

impl ClusterCropsUseCase {
    pub fn new(
        embedder: Box<dyn EmbeddingSource>,
        engine: ClusterEngine,
        logger: Box<dyn PipelineLogger>,
        on_progress: Option<ProgressCallback>,
    ) -> Self {
        Self {
            embedder,
            engine,
            executor: Box::new(SequentialEmbeddingExecutor),
            selector: RepresentativeSelector::new(),
            logger,
            on_progress,
        }
    }

    pub fn with_executor(mut self, executor: Box<dyn EmbeddingExecutor>) -> Self {
        self.executor = executor;
        self
    }

    /// Returns groups sorted by `group_id`, members in ascending input order.
    ///
    /// `k = None` lets the engine choose the group count. Empty input yields
    /// no groups.
    pub fn execute(
        &mut self,
        crops: Vec<Crop>,
        k: Option<usize>,
    ) -> Result<Vec<GroupResult>, PipelineError> {
        let total = crops.len();
        self.logger.metric("crops", total as f64);

        let started = Instant::now();
        let logger = &mut self.logger;
        let on_progress = &self.on_progress;
        let embeddings = self.executor.embed_all(
            self.embedder.as_ref(),
            &crops,
            &mut |done, total| {
                logger.progress(done, total);
                on_progress.as_ref().map_or(true, |cb| cb(done, total))
            },
        )?;
        self.logger.timing("embed", elapsed_ms(started));

        let started = Instant::now();
        let groups = self.engine.group(&embeddings, k)?;
        self.logger.timing("cluster", elapsed_ms(started));

        let started = Instant::now();
        let mut slot_of = vec![0usize; total];
        let mut results: Vec<GroupResult> = Vec::with_capacity(groups.len());
        for (slot, (group_id, members)) in groups.iter().enumerate() {
            for index in members {
                slot_of[*index] = slot;
            }
            let vectors: Vec<&Vec<f32>> = members.iter().map(|i| &embeddings[*i]).collect();
            results.push(GroupResult {
                group_id: *group_id,
                representative_index: self.selector.select(&vectors),
                members: Vec::with_capacity(members.len()),
            });
        }

        // Ascending index order keeps each member list in input order.
        for (index, (crop, embedding)) in crops.into_iter().zip(embeddings).enumerate() {
            results[slot_of[index]].members.push(GroupMember {
                source_index: index,
                bounding_box: *crop.bounding_box(),
                crop,
                embedding,
            });
        }
        self.logger.timing("select", elapsed_ms(started));

        self.logger.metric("groups", results.len() as f64);
        self.logger.info(&format!(
            "Grouped {total} crops into {} groups",
            results.len()
        ));
        self.logger.summary();

        Ok(results)
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
