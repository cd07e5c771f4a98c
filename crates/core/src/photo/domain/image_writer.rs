use std::path::Path;

use crate::shared::frame::Frame;

/// Saves a frame (typically a product crop) as an image file.
pub trait ImageWriter: Send {
    /// When `max_edge` is set, frames larger than it are scaled down so the
    /// longer side equals `max_edge`, keeping the aspect ratio.
    fn write(
        &self,
        path: &Path,
        frame: &Frame,
        max_edge: Option<u32>,
    ) -> Result<(), Box<dyn std::error::Error>>;
}
