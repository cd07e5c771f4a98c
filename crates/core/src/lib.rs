//! Groups product crops from a shelf photo by visual similarity.
//!
//! Bounded contexts follow a `domain` / `infrastructure` split: domain
//! modules hold traits and pure logic, infrastructure modules hold the
//! adapters (ONNX Runtime, SQLite, image files).

pub mod clustering;
pub mod detection;
pub mod embedding;
pub mod labels;
pub mod photo;
pub mod pipeline;
pub mod shared;
