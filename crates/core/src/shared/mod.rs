pub mod bounding_box;
pub mod constants;
pub mod crop;
pub mod frame;
pub mod math;
pub mod model_resolver;
