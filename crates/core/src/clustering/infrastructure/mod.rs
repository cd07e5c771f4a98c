pub mod agglomerative_partitioner;
pub mod kmeans_partitioner;
pub mod partitioner_factory;
