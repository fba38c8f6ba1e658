use std::path::Path;

use crate::io::domain::image_writer::ImageWriter;
use crate::shared::frame::Frame;

/// `image`-crate backed writer. Missing parent directories are created.
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        frame.to_dynamic()?.save(path)?;
        log::debug!(
            "Wrote {}x{}x{} frame to {}",
            frame.width(),
            frame.height(),
            frame.channels(),
            path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_frame(width: u32, height: u32, rgb: [u8; 3]) -> Frame {
        let data = rgb.repeat((width * height) as usize);
        Frame::new(data, width, height, 3)
    }

    #[test]
    fn test_write_creates_file_and_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blobs").join("crop_0.png");
        ImageFileWriter::new()
            .write(&path, &make_frame(20, 10, [1, 2, 3]))
            .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_written_crop_keeps_pixels_and_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crop.png");
        ImageFileWriter::new()
            .write(&path, &make_frame(37, 23, [50, 100, 200]))
            .unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (37, 23));
        assert_eq!(img.get_pixel(36, 22).0, [50, 100, 200]);
    }

    #[test]
    fn test_write_gray_mask() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.png");
        let frame = Frame::new(vec![255; 16], 4, 4, 1);
        ImageFileWriter::new().write(&path, &frame).unwrap();
        let img = image::open(&path).unwrap();
        assert_eq!(img.color(), image::ColorType::L8);
    }

    #[test]
    fn test_write_rgba_through_trait_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("face.png");
        let writer: Box<dyn ImageWriter> = Box::new(ImageFileWriter::new());
        let frame = Frame::new([10, 20, 30, 128].repeat(6), 3, 2, 4);
        writer.write(&path, &frame).unwrap();

        let img = image::open(&path).unwrap();
        assert_eq!(img.color(), image::ColorType::Rgba8);
        assert_eq!(img.to_rgba8().get_pixel(2, 1).0, [10, 20, 30, 128]);
    }

    #[test]
    fn test_unknown_extension_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crop.notanimage");
        assert!(ImageFileWriter::new()
            .write(&path, &make_frame(4, 4, [0; 3]))
            .is_err());
    }
}
