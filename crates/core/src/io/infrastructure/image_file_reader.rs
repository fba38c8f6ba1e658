use std::path::Path;

use crate::io::domain::image_reader::ImageReader;
use crate::shared::frame::Frame;

/// Decodes image files with the `image` crate.
///
/// Gray, RGB and RGBA sources keep their channel layout; every other pixel
/// format is normalized to 8-bit RGB or RGBA.
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

impl ImageReader for ImageFileReader {
    fn read(&self, path: &Path) -> Result<Frame, Box<dyn std::error::Error>> {
        let decoded = image::open(path)?;
        let frame = Frame::from_dynamic(decoded);
        if frame.is_empty() {
            return Err(format!("{} contains no pixels", path.display()).into());
        }
        log::debug!(
            "Read {} ({}x{}, {} channels)",
            path.display(),
            frame.width(),
            frame.height(),
            frame.channels()
        );
        Ok(frame)
    }
}
