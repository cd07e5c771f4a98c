use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Reviewer-supplied text attached to a cluster id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterLabel {
    pub cluster_id: String,
    pub label: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Error, Debug)]
pub enum LabelStoreError {
    #[error("cluster id must not be empty")]
    EmptyClusterId,
    #[error("invalid timestamp '{value}' stored for cluster {cluster_id}")]
    Timestamp { cluster_id: String, value: String },
    #[error("label store backend failed: {0}")]
    Backend(#[source] BoxError),
}

/// Persistence port for cluster labels, keyed by cluster id.
///
/// `upsert` creates a label or overwrites the text of an existing one;
/// `created_at` is set on creation and kept on overwrite. `list` returns
/// labels in creation order.
pub trait ClusterLabelStore: Send {
    fn upsert(&mut self, cluster_id: &str, label: &str) -> Result<ClusterLabel, LabelStoreError>;

    fn get(&self, cluster_id: &str) -> Result<Option<ClusterLabel>, LabelStoreError>;

    fn list(&self) -> Result<Vec<ClusterLabel>, LabelStoreError>;

    /// Upserts every entry of `labels` as one batch: either all are saved
    /// or none are.
    fn upsert_all(
        &mut self,
        labels: &BTreeMap<String, String>,
    ) -> Result<Vec<ClusterLabel>, LabelStoreError>;
}

pub fn validate_cluster_id(cluster_id: &str) -> Result<(), LabelStoreError> {
    if cluster_id.trim().is_empty() {
        return Err(LabelStoreError::EmptyClusterId);
    }
    Ok(())
}
