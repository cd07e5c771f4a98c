pub mod cluster_label_store;
