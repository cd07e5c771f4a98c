pub mod cluster_config;
pub mod cluster_crops_use_case;
pub mod embedding_executor;
pub mod export_groups_use_case;
pub mod infrastructure;
pub mod pipeline_error;
pub mod pipeline_logger;
