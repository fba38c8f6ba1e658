use ndarray::Array3;

use crate::features::domain::feature_extractor::Descriptors;

/// Appearance summary of a blob used for nearest-neighbour classification.
#[derive(Clone, Debug, PartialEq)]
pub struct BlobDescriptor {
    histogram: Array3<f32>,
    keypoints: Descriptors,
    label: u32,
}

impl BlobDescriptor {
    pub fn new(histogram: Array3<f32>, keypoints: Descriptors, label: u32) -> Self {
        Self {
            histogram,
            keypoints,
            label,
        }
    }

    /// Joint color histogram, each bin a fraction of the blob's pixel count.
    pub fn histogram(&self) -> &Array3<f32> {
        &self.histogram
    }

    pub fn keypoints(&self) -> &Descriptors {
        &self.keypoints
    }

    pub fn label(&self) -> u32 {
        self.label
    }
}
