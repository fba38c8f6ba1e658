use image::GrayImage;
use imageproc::contrast::equalize_histogram;

use super::clahe::Clahe;

/// Contrast equalization applied to grayscale frames before detection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Equalization {
    /// Global histogram equalization.
    #[default]
    Histogram,
    /// Tile-based CLAHE with default clip limit and grid.
    Adaptive,
}

impl Equalization {
    pub fn apply(&self, image: &GrayImage) -> GrayImage {
        if image.width() == 0 || image.height() == 0 {
            return image.clone();
        }
        match self {
            Equalization::Histogram => equalize_histogram(image),
            Equalization::Adaptive => Clahe::default().apply(image),
        }
    }
}
