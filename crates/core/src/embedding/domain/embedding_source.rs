use thiserror::Error;

use crate::shared::crop::Crop;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("crop has no pixels ({width}x{height})")]
    EmptyCrop { width: u32, height: u32 },
    #[error("expected 3-channel RGB crop, got {0} channels")]
    UnsupportedChannels(u8),
    #[error("embedding model failed: {0}")]
    Model(#[source] BoxError),
    #[error("embedding session lock poisoned")]
    LockPoisoned,
}

/// Domain interface for turning a crop into a feature vector.
///
/// Implementations must be deterministic for a given crop and return
/// vectors of one fixed dimension. `Sync` so callers may embed crops
/// from several threads at once.
pub trait EmbeddingSource: Send + Sync {
    fn embed(&self, crop: &Crop) -> Result<Vec<f32>, EmbeddingError>;
}

/// Rejects crops the pixel-based embedders cannot read.
pub fn ensure_rgb(crop: &Crop) -> Result<(), EmbeddingError> {
    let image = crop.image();
    if crop.is_empty() {
        return Err(EmbeddingError::EmptyCrop {
            width: image.width(),
            height: image.height(),
        });
    }
    if image.channels() != 3 {
        return Err(EmbeddingError::UnsupportedChannels(image.channels()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::bounding_box::BoundingBox;
    use crate::shared::frame::Frame;

    fn crop(w: u32, h: u32, channels: u8) -> Crop {
        let data = vec![0u8; (w * h * channels as u32) as usize];
        Crop::new(
            BoundingBox::new(0, 0, 10, 10).unwrap(),
            Frame::new(data, w, h, channels),
        )
    }

    #[test]
    fn test_ensure_rgb_accepts_rgb() {
        assert!(ensure_rgb(&crop(4, 4, 3)).is_ok());
    }

    #[test]
    fn test_ensure_rgb_rejects_empty() {
        assert!(matches!(
            ensure_rgb(&crop(0, 4, 3)),
            Err(EmbeddingError::EmptyCrop {
                width: 0,
                height: 4
            })
        ));
    }

    #[test]
    fn test_ensure_rgb_rejects_grayscale() {
        assert!(matches!(
            ensure_rgb(&crop(4, 4, 1)),
            Err(EmbeddingError::UnsupportedChannels(1))
        ));
    }
}
