use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("image has zero area")]
    EmptyImage,
    #[error("resize factor {factor} is not usable for a {width}x{height} image")]
    InvalidResizeFactor { factor: f64, width: u32, height: u32 },
    #[error("unsupported channel count: {0} (expected 1, 3 or 4)")]
    UnsupportedChannels(u8),
    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    BufferSize { actual: usize, expected: usize },
    #[error("failed to read cascade from {path}: {source}")]
    CascadeIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed cascade XML: {0}")]
    CascadeXml(#[from] roxmltree::Error),
    #[error("malformed cascade: {0}")]
    CascadeFormat(String),
    #[error("unsupported cascade: {0}")]
    UnsupportedCascade(String),
    #[error("landmarks are collinear, no affine transform exists")]
    DegenerateLandmarks,
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, VisionError>;
