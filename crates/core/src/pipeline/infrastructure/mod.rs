pub mod threaded_embedding_executor;
