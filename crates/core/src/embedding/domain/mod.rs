pub mod embedding_source;
