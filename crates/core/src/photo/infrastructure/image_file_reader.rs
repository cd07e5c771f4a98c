use std::path::Path;

use crate::photo::domain::photo_reader::PhotoReader;
use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;

/// Decodes still images with the `image` crate, converting any color type
/// to 8-bit RGB.
pub struct ImageFileReader;

impl ImageFileReader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileReader {
    fn default() -> Self {
        Self::new()
    }
}

impl PhotoReader for ImageFileReader {
    fn read(&self, path: &Path) -> Result<Frame, Box<dyn std::error::Error>> {
        if !is_supported_image(path) {
            return Err(format!("Unsupported image type: {}", path.display()).into());
        }
        let rgb = image::open(path)?.to_rgb8();
        let (width, height) = rgb.dimensions();
        log::debug!("Loaded {} ({width}x{height})", path.display());
        Ok(Frame::new(rgb.into_raw(), width, height, 3))
    }
}

/// Case-insensitive extension check against [`IMAGE_EXTENSIONS`].
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}
