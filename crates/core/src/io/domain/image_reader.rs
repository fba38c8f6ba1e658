use std::path::Path;

use crate::shared::frame::Frame;

/// Loads a single frame from an image file.
pub trait ImageReader: Send {
    fn read(&self, path: &Path) -> Result<Frame, Box<dyn std::error::Error>>;
}
