use image::GrayImage;

use crate::shared::geometry::Rect;

/// Multi-scale search parameters for an [`ObjectCascade`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CascadeParams {
    /// Window growth per scale step (> 1).
    pub scale_factor: f64,
    /// Raw hits a grouped detection needs to be kept.
    pub min_neighbors: u32,
    /// Smallest window edge in pixels.
    pub min_size: u32,
}

impl CascadeParams {
    pub fn new(scale_factor: f64, min_neighbors: u32, min_size: u32) -> Self {
        Self {
            scale_factor,
            min_neighbors,
            min_size,
        }
    }
}

/// Domain interface for a pretrained sliding-window object detector.
pub trait ObjectCascade: Send {
    fn detect_regions(&self, image: &GrayImage, params: &CascadeParams) -> Vec<Rect>;
}
