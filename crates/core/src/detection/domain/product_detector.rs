use thiserror::Error;

use crate::shared::bounding_box::BoundingBox;
use crate::shared::crop::Crop;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("failed to read detections from {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed detections in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Domain interface for locating products in a shelf photo.
///
/// Implementations may cache or load state lazily, hence `&mut self`.
pub trait ProductDetector: Send {
    fn detect(&mut self, photo: &Frame) -> Result<Vec<BoundingBox>, DetectionError>;
}

/// Cuts one crop per box out of `photo`, in box order, each paired with
/// the index of its box in `boxes`.
///
/// Boxes falling entirely outside the photo produce nothing to embed and
/// are skipped with a warning, so indices may have gaps.
pub fn extract_crops(photo: &Frame, boxes: &[BoundingBox]) -> Vec<(usize, Crop)> {
    boxes
        .iter()
        .enumerate()
        .filter_map(|(index, bbox)| {
            let crop = Crop::from_source(photo, *bbox);
            if crop.is_empty() {
                log::warn!(
                    "Skipping detection {index} {:?} outside {}x{} photo",
                    <[i32; 4]>::from(*bbox),
                    photo.width(),
                    photo.height()
                );
                None
            } else {
                Some((index, crop))
            }
        })
        .collect()
}
