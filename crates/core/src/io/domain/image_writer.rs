use std::path::Path;

use crate::shared::frame::Frame;

/// Persists annotated frames, blob crops, masks and merged faces.
///
/// The file format follows the path's extension; the frame keeps its own
/// dimensions and channel layout.
pub trait ImageWriter: Send {
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;
}
