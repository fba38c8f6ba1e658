//! Oriented FAST corners with steered BRIEF descriptors.
//!
//! Single-scale variant: corners come from FAST-9 on the input image, each
//! gets an intensity-centroid orientation, and the descriptor compares 256
//! rotated point pairs on a Gaussian-smoothed copy.

use image::GrayImage;
use imageproc::corners::{corners_fast9, Corner};
use imageproc::filter::gaussian_blur_f32;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::features::domain::feature_extractor::{
    brute_force_match, BinaryDescriptor, DescriptorMatch, Descriptors, FeatureExtractor,
};

pub const DEFAULT_MAX_FEATURES: usize = 500;
pub const DEFAULT_FAST_THRESHOLD: u8 = 20;

/// Keypoints closer than this to the border are dropped so rotated sample
/// pairs stay inside the image.
const EDGE_THRESHOLD: u32 = 31;
const ORIENTATION_RADIUS: i32 = 15;
const PATTERN_RADIUS: i32 = 13;
const PATTERN_PAIRS: usize = 256;
const PATTERN_SEED: u64 = 0x6f72_625f_7061_7474;
const SMOOTHING_SIGMA: f32 = 2.0;

type PointPair = ((i32, i32), (i32, i32));

pub struct OrbExtractor {
    max_features: usize,
    fast_threshold: u8,
    pattern: Vec<PointPair>,
}

impl OrbExtractor {
    pub fn new() -> Self {
        Self::with_params(DEFAULT_MAX_FEATURES, DEFAULT_FAST_THRESHOLD)
    }

    pub fn with_params(max_features: usize, fast_threshold: u8) -> Self {
        Self {
            max_features,
            fast_threshold,
            pattern: sampling_pattern(),
        }
    }

    fn keypoints(&self, image: &GrayImage) -> Vec<Corner> {
        let (w, h) = image.dimensions();
        if w <= 2 * EDGE_THRESHOLD || h <= 2 * EDGE_THRESHOLD {
            return Vec::new();
        }
        let mut corners: Vec<Corner> = corners_fast9(image, self.fast_threshold)
            .into_iter()
            .filter(|c| {
                c.x >= EDGE_THRESHOLD
                    && c.y >= EDGE_THRESHOLD
                    && c.x < w - EDGE_THRESHOLD
                    && c.y < h - EDGE_THRESHOLD
            })
            .collect();
        corners.sort_by(|a, b| b.score.total_cmp(&a.score));
        corners.truncate(self.max_features);
        corners
    }

    fn describe(&self, smoothed: &GrayImage, corner: &Corner, angle: f32) -> BinaryDescriptor {
        let (sin, cos) = angle.sin_cos();
        let at = |(dx, dy): (i32, i32)| -> u8 {
            let rx = (dx as f32 * cos - dy as f32 * sin).round() as i32;
            let ry = (dx as f32 * sin + dy as f32 * cos).round() as i32;
            let x = (corner.x as i32 + rx) as u32;
            let y = (corner.y as i32 + ry) as u32;
            smoothed.get_pixel(x, y)[0]
        };

        let mut descriptor = [0u8; 32];
        for (bit, &(p, q)) in self.pattern.iter().enumerate() {
            if at(p) < at(q) {
                descriptor[bit / 8] |= 1 << (bit % 8);
            }
        }
        descriptor
    }
}

impl Default for OrbExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureExtractor for OrbExtractor {
    fn detect_and_compute(&self, image: &GrayImage) -> Descriptors {
        let corners = self.keypoints(image);
        if corners.is_empty() {
            return Descriptors::Binary(Vec::new());
        }
        let smoothed = gaussian_blur_f32(image, SMOOTHING_SIGMA);
        let descriptors = corners
            .iter()
            .map(|c| self.describe(&smoothed, c, intensity_centroid_angle(image, c.x, c.y)))
            .collect();
        Descriptors::Binary(descriptors)
    }

    fn match_descriptors(&self, query: &Descriptors, train: &Descriptors) -> Vec<DescriptorMatch> {
        match (query, train) {
            (Descriptors::Binary(q), Descriptors::Binary(t)) => brute_force_match(q, t, hamming),
            _ => {
                log::warn!("ORB matcher received non-binary descriptors, skipping match");
                Vec::new()
            }
        }
    }

    fn name(&self) -> &'static str {
        "orb"
    }
}

pub fn hamming(a: &BinaryDescriptor, b: &BinaryDescriptor) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x ^ y).count_ones())
        .sum::<u32>() as f32
}

/// Orientation of the patch's intensity centroid relative to its center.
fn intensity_centroid_angle(image: &GrayImage, cx: u32, cy: u32) -> f32 {
    let r = ORIENTATION_RADIUS;
    let (mut m01, mut m10) = (0i64, 0i64);
    for dy in -r..=r {
        let span = ((r * r - dy * dy) as f32).sqrt() as i32;
        for dx in -span..=span {
            let v = image.get_pixel((cx as i32 + dx) as u32, (cy as i32 + dy) as u32)[0] as i64;
            m10 += dx as i64 * v;
            m01 += dy as i64 * v;
        }
    }
    (m01 as f32).atan2(m10 as f32)
}

/// Deterministic BRIEF test pairs inside the pattern radius.
fn sampling_pattern() -> Vec<PointPair> {
    let mut rng = StdRng::seed_from_u64(PATTERN_SEED);
    let mut point = move || {
        (
            rng.random_range(-PATTERN_RADIUS..=PATTERN_RADIUS),
            rng.random_range(-PATTERN_RADIUS..=PATTERN_RADIUS),
        )
    };
    (0..PATTERN_PAIRS).map(|_| (point(), point())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scattered bright squares produce plenty of FAST corners.
    fn textured(w: u32, h: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| {
            let cell = ((x / 9) * 7 + (y / 11) * 13) % 5;
            image::Luma([if cell < 2 { 230 } else { 20 }])
        })
    }

    #[test]
    fn test_textured_image_has_keypoints() {
        let orb = OrbExtractor::new();
        let d = orb.detect_and_compute(&textured(120, 100));
        assert!(matches!(d, Descriptors::Binary(_)));
        assert!(!d.is_empty());
        assert!(d.len() <= DEFAULT_MAX_FEATURES);
    }

    #[test]
    fn test_flat_image_has_no_keypoints() {
        let orb = OrbExtractor::new();
        let flat = GrayImage::from_pixel(100, 100, image::Luma([128]));
        assert!(orb.detect_and_compute(&flat).is_empty());
    }

    #[test]
    fn test_tiny_image_has_no_keypoints() {
        let orb = OrbExtractor::new();
        assert!(orb.detect_and_compute(&textured(40, 40)).is_empty());
    }

    #[test]
    fn test_max_features_caps_output() {
        let orb = OrbExtractor::with_params(5, DEFAULT_FAST_THRESHOLD);
        assert!(orb.detect_and_compute(&textured(160, 160)).len() <= 5);
    }

    #[test]
    fn test_identical_images_match_at_zero_distance() {
        let orb = OrbExtractor::new();
        let img = textured(120, 100);
        let a = orb.detect_and_compute(&img);
        let b = orb.detect_and_compute(&img);
        let matches = orb.match_descriptors(&a, &b);
        assert_eq!(matches.len(), a.len());
        assert!(matches.iter().all(|m| m.distance == 0.0));
    }

    #[test]
    fn test_pattern_is_deterministic() {
        assert_eq!(sampling_pattern(), sampling_pattern());
        assert_eq!(sampling_pattern().len(), PATTERN_PAIRS);
    }

    #[test]
    fn test_hamming() {
        let a = [0u8; 32];
        let mut b = [0u8; 32];
        b[0] = 0b1011;
        b[31] = 0xff;
        assert_eq!(hamming(&a, &b), 11.0);
        assert_eq!(hamming(&b, &b), 0.0);
    }

    #[test]
    fn test_mismatched_kinds_yield_no_matches() {
        let orb = OrbExtractor::new();
        let bin = Descriptors::Binary(vec![[0; 32]]);
        let float = Descriptors::Float(vec![vec![0.0; 64]]);
        assert!(orb.match_descriptors(&bin, &float).is_empty());
    }

    #[test]
    fn test_centroid_angle_points_toward_bright_side() {
        let img = GrayImage::from_fn(40, 40, |x, _| image::Luma([if x > 20 { 255 } else { 0 }]));
        let angle = intensity_centroid_angle(&img, 20, 20);
        assert!(angle.abs() < 0.1, "angle {angle}");
    }
}
