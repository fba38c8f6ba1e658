//! Nearest-neighbour blob labelling over reference descriptors.

use crate::blobs::domain::blob::Blob;
use crate::blobs::domain::blob_descriptor::BlobDescriptor;
use crate::features::domain::feature_extractor::FeatureExtractor;
use crate::features::infrastructure::extractor_factory::{create_extractor, ExtractorKind};
use crate::imaging::clahe::Clahe;
use crate::shared::constants::UNKNOWN_LABEL;

use super::color_histogram::{chi_square_alt, joint_histogram};

const HISTOGRAM_DISTANCE_WEIGHT: f32 = 0.98;
const KEYPOINT_MATCHING_DISTANCE_WEIGHT: f32 = 1.0 - HISTOGRAM_DISTANCE_WEIGHT;

/// Assigns each blob the label of its closest reference.
///
/// Distance mixes color-histogram dissimilarity with the summed distances
/// of brute-force keypoint matches.
pub struct BlobClassifier {
    extractor: Box<dyn FeatureExtractor>,
    clahe: Clahe,
    references: Vec<BlobDescriptor>,
}

impl BlobClassifier {
    pub fn new() -> Self {
        Self::with_extractor(create_extractor(ExtractorKind::default()))
    }

    pub fn with_extractor(extractor: Box<dyn FeatureExtractor>) -> Self {
        Self {
            extractor,
            clahe: Clahe::default(),
            references: Vec::new(),
        }
    }

    /// Adds `reference` (with its current label) to the reference set.
    pub fn update(&mut self, reference: &Blob) {
        let descriptor = self.describe(reference);
        self.references.push(descriptor);
    }

    pub fn clear(&mut self) {
        self.references.clear();
    }

    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    /// Sets the blob's label to that of the nearest reference.
    ///
    /// Ties keep the earliest reference; an empty reference set yields the
    /// unknown label.
    pub fn classify(&self, blob: &mut Blob) {
        let descriptor = self.describe(blob);
        let mut best_distance = f32::MAX;
        let mut best_label = UNKNOWN_LABEL;
        for reference in &self.references {
            let distance = self.distance(&descriptor, reference);
            if distance < best_distance {
                best_distance = distance;
                best_label = reference.label();
            }
        }
        log::debug!(
            "Classified {}x{} blob as {} (distance {:.4}, {} references)",
            blob.width(),
            blob.height(),
            best_label,
            best_distance,
            self.references.len()
        );
        blob.set_label(best_label);
    }

    pub fn describe(&self, blob: &Blob) -> BlobDescriptor {
        let histogram = joint_histogram(blob.frame());
        let keypoints = match blob.frame().to_gray() {
            Ok(gray) => self.extractor.detect_and_compute(&self.clahe.apply(&gray)),
            Err(e) => {
                log::warn!("Skipping keypoints for blob: {e}");
                self.extractor.detect_and_compute(&image::GrayImage::new(0, 0))
            }
        };
        BlobDescriptor::new(histogram, keypoints, blob.label())
    }

    fn distance(&self, query: &BlobDescriptor, reference: &BlobDescriptor) -> f32 {
        let histogram_distance = chi_square_alt(query.histogram(), reference.histogram());
        let matching_distance: f32 = self
            .extractor
            .match_descriptors(query.keypoints(), reference.keypoints())
            .iter()
            .map(|m| m.distance)
            .sum();
        histogram_distance * HISTOGRAM_DISTANCE_WEIGHT
            + matching_distance * KEYPOINT_MATCHING_DISTANCE_WEIGHT
    }
}

impl Default for BlobClassifier {
    fn default() -> Self {
        Self::new()
    }
}
