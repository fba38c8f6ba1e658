//! Joint 3-D color histograms and their chi-square comparison.

use ndarray::Array3;

use crate::shared::frame::Frame;

pub const BINS_PER_CHANNEL: usize = 32;

const BIN_WIDTH: usize = 256 / BINS_PER_CHANNEL;

/// 32x32x32 histogram over channels 0-2, each bin divided by the pixel count.
///
/// Single-channel frames contribute their value to all three axes; a fourth
/// (alpha) channel is ignored.
pub fn joint_histogram(frame: &Frame) -> Array3<f32> {
    let mut hist = Array3::<f32>::zeros((BINS_PER_CHANNEL, BINS_PER_CHANNEL, BINS_PER_CHANNEL));
    if frame.is_empty() {
        return hist;
    }

    let c = frame.channels() as usize;
    for px in frame.data().chunks_exact(c) {
        let (a, b, d) = if c >= 3 {
            (px[0], px[1], px[2])
        } else {
            (px[0], px[0], px[0])
        };
        hist[[
            a as usize / BIN_WIDTH,
            b as usize / BIN_WIDTH,
            d as usize / BIN_WIDTH,
        ]] += 1.0;
    }

    let scale = 1.0 / frame.area() as f32;
    hist.mapv_inplace(|v| v * scale);
    hist
}

/// Alternative chi-square distance: `2 · Σ (a - b)² / (a + b)`.
///
/// Bins where both histograms are empty contribute nothing.
pub fn chi_square_alt(a: &Array3<f32>, b: &Array3<f32>) -> f32 {
    let sum: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let denom = (x + y) as f64;
            if denom.abs() > f64::EPSILON {
                let diff = (x - y) as f64;
                diff * diff / denom
            } else {
                0.0
            }
        })
        .sum();
    (2.0 * sum) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn solid(w: u32, h: u32, px: &[u8]) -> Frame {
        Frame::new(px.repeat((w * h) as usize), w, h, px.len() as u8)
    }

    #[test]
    fn test_histogram_sums_to_one() {
        let mut frame = solid(4, 4, &[10, 200, 90]);
        frame.data_mut()[..3].copy_from_slice(&[255, 0, 0]);
        let hist = joint_histogram(&frame);
        assert_relative_eq!(hist.sum(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(hist[[31, 0, 0]], 1.0 / 16.0);
        assert_relative_eq!(hist[[1, 25, 11]], 15.0 / 16.0);
    }

    #[test]
    fn test_gray_fills_diagonal() {
        let hist = joint_histogram(&solid(3, 3, &[64]));
        assert_relative_eq!(hist[[8, 8, 8]], 1.0);
    }

    #[test]
    fn test_alpha_is_ignored() {
        let rgb = joint_histogram(&solid(2, 2, &[1, 2, 3]));
        let rgba = joint_histogram(&solid(2, 2, &[1, 2, 3, 77]));
        assert_eq!(rgb, rgba);
    }

    #[test]
    fn test_empty_frame_gives_zero_histogram() {
        let hist = joint_histogram(&Frame::blank(0, 0, 3));
        assert_eq!(hist.sum(), 0.0);
    }

    #[test]
    fn test_chi_square_identical_is_zero() {
        let hist = joint_histogram(&solid(5, 5, &[100, 100, 100]));
        assert_relative_eq!(chi_square_alt(&hist, &hist), 0.0);
    }

    #[test]
    fn test_chi_square_disjoint_is_four() {
        // Two single-bin histograms with no overlap: 2 * (1/1 + 1/1)
        let a = joint_histogram(&solid(2, 2, &[0, 0, 0]));
        let b = joint_histogram(&solid(2, 2, &[255, 255, 255]));
        assert_relative_eq!(chi_square_alt(&a, &b), 4.0);
    }

    #[test]
    fn test_chi_square_is_symmetric() {
        let a = joint_histogram(&solid(2, 3, &[10, 50, 90]));
        let mut frame = solid(2, 3, &[10, 50, 90]);
        frame.data_mut()[0] = 250;
        let b = joint_histogram(&frame);
        assert_relative_eq!(chi_square_alt(&a, &b), chi_square_alt(&b, &a));
    }
}
