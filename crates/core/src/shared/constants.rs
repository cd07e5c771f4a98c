/// ResNet-18 exported without its classifier head, so the graph output is
/// the 512-d global-average-pooled feature vector. Looked up in the model
/// cache directory unless a path is given.
pub const EMBEDDING_MODEL_NAME: &str = "resnet18-features.onnx";

/// Width of the ImageNet classifier layer. An output this wide holds class
/// scores, not image features.
pub const IMAGENET_CLASS_COUNT: i64 = 1000;

/// Seed used when no explicit seed is configured.
pub const DEFAULT_SEED: u64 = 42;

/// Iteration cap for centroid-based partitioning.
pub const DEFAULT_MAX_ITER: usize = 300;

/// Edge length of the square thumbnails written for reviewers.
pub const PREVIEW_SIZE: u32 = 256;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// Name of the per-user directory used for caches and settings.
pub const APP_DIR_NAME: &str = "Shelf Cluster";
