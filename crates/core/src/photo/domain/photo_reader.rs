use std::path::Path;

use crate::shared::frame::Frame;

/// Loads a shelf photo as an RGB frame.
pub trait PhotoReader: Send {
    fn read(&self, path: &Path) -> Result<Frame, Box<dyn std::error::Error>>;
}
