use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clustering::domain::cluster_engine::ClusterEngine;
use crate::clustering::domain::partitioner::Algorithm;
use crate::clustering::infrastructure::kmeans_partitioner::DEFAULT_TOL;
use crate::clustering::infrastructure::partitioner_factory::create_partitioner;
use crate::pipeline::embedding_executor::{EmbeddingExecutor, SequentialEmbeddingExecutor};
use crate::pipeline::infrastructure::threaded_embedding_executor::ThreadedEmbeddingExecutor;
use crate::shared::constants::{APP_DIR_NAME, DEFAULT_MAX_ITER, DEFAULT_SEED};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Invalid(String),
}

/// Knobs for one clustering run. Missing JSON fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub algorithm: Algorithm,
    pub seed: u64,
    /// Group count used when the caller passes none. `None` falls back to
    /// `floor(sqrt(n))`.
    pub default_k: Option<usize>,
    pub max_iter: usize,
    /// k-means stops once no centroid moves farther than this.
    pub tol: f64,
    /// Worker threads for embedding; 1 embeds on the calling thread.
    pub embedding_threads: usize,
    /// Where to fetch the feature-extractor model when it is not cached.
    pub model_url: Option<String>,
    /// Model output holding the pooled features; the first output if unset.
    pub model_output: Option<String>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            seed: DEFAULT_SEED,
            default_k: None,
            max_iter: DEFAULT_MAX_ITER,
            tol: DEFAULT_TOL,
            embedding_threads: 1,
            model_url: None,
            model_output: None,
        }
    }
}

impl ClusterConfig {
    /// `<config dir>/Shelf Cluster/config.json`, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.json"))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the file at [`default_path`](Self::default_path) when present,
    /// defaults otherwise.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        fs::write(path, json).map_err(write_err)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_k == Some(0) {
            return Err(ConfigError::Invalid("default_k must be at least 1".into()));
        }
        if self.max_iter == 0 {
            return Err(ConfigError::Invalid("max_iter must be at least 1".into()));
        }
        if !self.tol.is_finite() || self.tol < 0.0 {
            return Err(ConfigError::Invalid(
                "tol must be a non-negative number".into(),
            ));
        }
        if self.embedding_threads == 0 {
            return Err(ConfigError::Invalid(
                "embedding_threads must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn build_engine(&self) -> ClusterEngine {
        ClusterEngine::new(create_partitioner(self.algorithm, self.max_iter, self.tol))
            .with_seed(self.seed)
            .with_default_k(self.default_k)
    }

    pub fn build_executor(&self) -> Box<dyn EmbeddingExecutor> {
        if self.embedding_threads > 1 {
            Box::new(ThreadedEmbeddingExecutor::new(self.embedding_threads))
        } else {
            Box::new(SequentialEmbeddingExecutor)
        }
    }
}
