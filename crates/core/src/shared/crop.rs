use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// A detected product cut out of the source photo.
///
/// Immutable once built; owned by the pipeline call that produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct Crop {
    bounding_box: BoundingBox,
    image: Frame,
}

impl Crop {
    pub fn new(bounding_box: BoundingBox, image: Frame) -> Self {
        Self {
            bounding_box,
            image,
        }
    }

    /// Cuts `bounding_box` out of `source`.
    pub fn from_source(source: &Frame, bounding_box: BoundingBox) -> Self {
        Self::new(bounding_box, source.crop(&bounding_box))
    }

    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bounding_box
    }

    pub fn image(&self) -> &Frame {
        &self.image
    }

    pub fn is_empty(&self) -> bool {
        self.image.width() == 0 || self.image.height() == 0
    }
}
