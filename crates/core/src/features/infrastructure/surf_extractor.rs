//! Upright SURF-style features over box-filter Hessian responses.

use image::GrayImage;

use crate::features::domain::feature_extractor::{
    brute_force_match, DescriptorMatch, Descriptors, FeatureExtractor,
};
use crate::imaging::integral::IntegralImage;

pub const DEFAULT_HESSIAN_THRESHOLD: f64 = 100.0;

/// Box-filter sizes of the first octave.
const FILTER_SIZES: [i32; 4] = [9, 15, 21, 27];
const DESCRIPTOR_LEN: usize = 64;
const RELATIVE_DXY_WEIGHT: f64 = 0.81;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Keypoint {
    x: i32,
    y: i32,
    scale: f64,
    response: f64,
}

pub struct SurfExtractor {
    hessian_threshold: f64,
}

impl SurfExtractor {
    pub fn new() -> Self {
        Self::with_threshold(DEFAULT_HESSIAN_THRESHOLD)
    }

    pub fn with_threshold(hessian_threshold: f64) -> Self {
        Self { hessian_threshold }
    }

    fn keypoints(&self, ii: &IntegralImage) -> Vec<Keypoint> {
        let (w, h) = (ii.width() as i32, ii.height() as i32);
        let layers: Vec<Vec<f64>> = FILTER_SIZES
            .iter()
            .map(|&size| hessian_layer(ii, size))
            .collect();

        let mut keypoints = Vec::new();
        for layer in 1..FILTER_SIZES.len() - 1 {
            let border = FILTER_SIZES[layer + 1] / 2 + 1;
            for y in border..h - border {
                for x in border..w - border {
                    let response = layers[layer][(y * w + x) as usize];
                    if response > self.hessian_threshold
                        && is_extremum(&layers[layer - 1..=layer + 1], w, x, y, response)
                    {
                        keypoints.push(Keypoint {
                            x,
                            y,
                            scale: 1.2 * FILTER_SIZES[layer] as f64 / 9.0,
                            response,
                        });
                    }
                }
            }
        }
        log::debug!("SURF found {} keypoints", keypoints.len());
        keypoints
    }
}

impl Default for SurfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureExtractor for SurfExtractor {
    fn detect_and_compute(&self, image: &GrayImage) -> Descriptors {
        if image.width() == 0 || image.height() == 0 {
            return Descriptors::Float(Vec::new());
        }
        let ii = IntegralImage::new(image);
        let descriptors = self
            .keypoints(&ii)
            .iter()
            .map(|kp| describe(&ii, kp))
            .collect();
        Descriptors::Float(descriptors)
    }

    fn match_descriptors(&self, query: &Descriptors, train: &Descriptors) -> Vec<DescriptorMatch> {
        match (query, train) {
            (Descriptors::Float(q), Descriptors::Float(t)) => brute_force_match(q, t, euclidean),
            _ => {
                log::warn!("SURF matcher received non-float descriptors, skipping match");
                Vec::new()
            }
        }
    }

    fn name(&self) -> &'static str {
        "surf"
    }
}

pub fn euclidean(a: &Vec<f32>, b: &Vec<f32>) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// Approximated determinant of the Hessian at every pixel for one filter size.
fn hessian_layer(ii: &IntegralImage, size: i32) -> Vec<f64> {
    let (w, h) = (ii.width() as i32, ii.height() as i32);
    let lobe = size / 3;
    let b = (size - 1) / 2;
    let inv_area = 1.0 / (size * size) as f64;
    // box(row, col, rows, cols)
    let bx = |r: i32, c: i32, rows: i32, cols: i32| ii.sum(c, r, cols, rows);

    let mut out = vec![0.0; (w * h) as usize];
    for r in 0..h {
        for c in 0..w {
            let dxx = bx(r - lobe + 1, c - b, 2 * lobe - 1, size)
                - 3.0 * bx(r - lobe + 1, c - lobe / 2, 2 * lobe - 1, lobe);
            let dyy = bx(r - b, c - lobe + 1, size, 2 * lobe - 1)
                - 3.0 * bx(r - lobe / 2, c - lobe + 1, lobe, 2 * lobe - 1);
            let dxy = bx(r - lobe, c + 1, lobe, lobe) + bx(r + 1, c - lobe, lobe, lobe)
                - bx(r - lobe, c - lobe, lobe, lobe)
                - bx(r + 1, c + 1, lobe, lobe);

            let (dxx, dyy, dxy) = (dxx * inv_area, dyy * inv_area, dxy * inv_area);
            out[(r * w + c) as usize] = dxx * dyy - RELATIVE_DXY_WEIGHT * dxy * dxy;
        }
    }
    out
}

/// Strict maximum over the 3x3x3 neighbourhood spanning adjacent layers.
fn is_extremum(layers: &[Vec<f64>], w: i32, x: i32, y: i32, value: f64) -> bool {
    for (li, layer) in layers.iter().enumerate() {
        for dy in -1..=1 {
            for dx in -1..=1 {
                if li == 1 && dx == 0 && dy == 0 {
                    continue;
                }
                if layer[((y + dy) * w + x + dx) as usize] >= value {
                    return false;
                }
            }
        }
    }
    true
}

/// 4x4 grid of subregions, each summarized by Σdx, Σdy, Σ|dx|, Σ|dy|.
fn describe(ii: &IntegralImage, kp: &Keypoint) -> Vec<f32> {
    let s = kp.scale;
    let wavelet = ((2.0 * s).round() as i32).max(2);
    let half = wavelet / 2;
    let sigma = 3.3 * s;

    let mut descriptor = Vec::with_capacity(DESCRIPTOR_LEN);
    for i in 0..4 {
        for j in 0..4 {
            let (mut sdx, mut sdy, mut adx, mut ady) = (0.0, 0.0, 0.0, 0.0);
            for k in 0..5 {
                for l in 0..5 {
                    let ox = (-10 + j * 5 + l) as f64 + 0.5;
                    let oy = (-10 + i * 5 + k) as f64 + 0.5;
                    let sx = (kp.x as f64 + ox * s).round() as i32;
                    let sy = (kp.y as f64 + oy * s).round() as i32;

                    let weight = (-(ox * ox + oy * oy) * s * s / (2.0 * sigma * sigma)).exp();
                    let dx = ii.sum(sx, sy - half, half, wavelet) - ii.sum(sx - half, sy - half, half, wavelet);
                    let dy = ii.sum(sx - half, sy, wavelet, half) - ii.sum(sx - half, sy - half, wavelet, half);
                    let (dx, dy) = (dx * weight, dy * weight);

                    sdx += dx;
                    sdy += dy;
                    adx += dx.abs();
                    ady += dy.abs();
                }
            }
            descriptor.extend([sdx, sdy, adx, ady].map(|v| v as f32));
        }
    }

    let norm = descriptor.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        descriptor.iter_mut().for_each(|v| *v /= norm);
    }
    descriptor
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Dark blobs on a light background respond strongly to the Hessian.
    fn spotted(w: u32, h: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| {
            let (cx, cy) = ((x % 24) as i32 - 12, (y % 24) as i32 - 12);
            image::Luma([if cx * cx + cy * cy < 20 { 10 } else { 240 }])
        })
    }

    #[test]
    fn test_spots_yield_unit_length_descriptors() {
        let surf = SurfExtractor::new();
        let Descriptors::Float(d) = surf.detect_and_compute(&spotted(96, 96)) else {
            panic!("expected float descriptors");
        };
        assert!(!d.is_empty());
        for v in &d {
            assert_eq!(v.len(), DESCRIPTOR_LEN);
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert_relative_eq!(norm, 1.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_flat_image_has_no_keypoints() {
        let surf = SurfExtractor::new();
        let flat = GrayImage::from_pixel(64, 64, image::Luma([90]));
        assert!(surf.detect_and_compute(&flat).is_empty());
    }

    #[test]
    fn test_empty_image() {
        let surf = SurfExtractor::new();
        assert!(surf.detect_and_compute(&GrayImage::new(0, 0)).is_empty());
    }

    #[test]
    fn test_identical_images_match_at_zero_distance() {
        let surf = SurfExtractor::new();
        let img = spotted(96, 96);
        let a = surf.detect_and_compute(&img);
        let matches = surf.match_descriptors(&a, &surf.detect_and_compute(&img));
        assert_eq!(matches.len(), a.len());
        assert!(matches.iter().all(|m| m.distance == 0.0));
    }

    #[test]
    fn test_mismatched_kinds_yield_no_matches() {
        let surf = SurfExtractor::new();
        let float = Descriptors::Float(vec![vec![0.0; 64]]);
        let bin = Descriptors::Binary(vec![[0; 32]]);
        assert!(surf.match_descriptors(&float, &bin).is_empty());
    }

    #[test]
    fn test_euclidean() {
        assert_relative_eq!(euclidean(&vec![0.0, 3.0], &vec![4.0, 0.0]), 5.0);
    }

    #[test]
    fn test_hessian_flat_is_zero() {
        let ii = IntegralImage::new(&GrayImage::from_pixel(30, 30, image::Luma([50])));
        let layer = hessian_layer(&ii, 9);
        assert_relative_eq!(layer[15 * 30 + 15], 0.0, epsilon = 1e-9);
    }
}
