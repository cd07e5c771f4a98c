pub mod cluster_engine;
pub mod cluster_error;
pub mod partitioner;
pub mod representative_selector;
