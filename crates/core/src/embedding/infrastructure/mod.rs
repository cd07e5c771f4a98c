pub mod histogram_embedder;
pub mod onnx_embedder;
