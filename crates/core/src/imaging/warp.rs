//! Three-point affine fitting, warping and multiplicative blending.

use crate::shared::error::{Result, VisionError};
use crate::shared::frame::Frame;
use crate::shared::geometry::Point;

const DEGENERATE_EPSILON: f64 = 1e-9;

/// Row-major 2x3 affine matrix `[a, b, c, d, e, f]`:
/// `x' = a·x + b·y + c`, `y' = d·x + e·y + f`.
pub type Affine = [f64; 6];

/// Solves the affine transform mapping each `src[i]` onto `dst[i]`.
pub fn affine_from_points(src: &[Point; 3], dst: &[Point; 3]) -> Result<Affine> {
    let [p0, p1, p2] = src.map(|p| (p.x as f64, p.y as f64));
    let det = p0.0 * (p1.1 - p2.1) - p0.1 * (p1.0 - p2.0) + (p1.0 * p2.1 - p2.0 * p1.1);
    if det.abs() < DEGENERATE_EPSILON {
        return Err(VisionError::DegenerateLandmarks);
    }

    // Cramer's rule on [x y 1] · [a b c]^T = x'
    let solve = |t0: f64, t1: f64, t2: f64| -> (f64, f64, f64) {
        let a = (t0 * (p1.1 - p2.1) - p0.1 * (t1 - t2) + (t1 * p2.1 - t2 * p1.1)) / det;
        let b = (p0.0 * (t1 - t2) - t0 * (p1.0 - p2.0) + (p1.0 * t2 - p2.0 * t1)) / det;
        let c = (p0.0 * (p1.1 * t2 - p2.1 * t1) - p0.1 * (p1.0 * t2 - p2.0 * t1)
            + t0 * (p1.0 * p2.1 - p2.0 * p1.1))
            / det;
        (a, b, c)
    };

    let (a, b, c) = solve(dst[0].x as f64, dst[1].x as f64, dst[2].x as f64);
    let (d, e, f) = solve(dst[0].y as f64, dst[1].y as f64, dst[2].y as f64);
    Ok([a, b, c, d, e, f])
}

pub fn apply_affine(m: &Affine, p: Point) -> Point {
    let (x, y) = (p.x as f64, p.y as f64);
    Point::new(
        (m[0] * x + m[1] * y + m[2]) as f32,
        (m[3] * x + m[4] * y + m[5]) as f32,
    )
}

/// Warps `frame` into a `width` x `height` canvas with bilinear sampling.
///
/// Each output pixel is mapped back through the inverse transform; source
/// neighbours outside the frame contribute zero.
pub fn warp_affine(frame: &Frame, m: &Affine, width: u32, height: u32) -> Result<Frame> {
    if frame.is_empty() {
        return Err(VisionError::EmptyImage);
    }
    let inverse = invert(m)?;

    let c = frame.channels() as usize;
    let (sw, sh) = (frame.width() as i64, frame.height() as i64);
    let src = frame.data();
    let sample = |x: i64, y: i64, ch: usize| -> f64 {
        if x >= 0 && x < sw && y >= 0 && y < sh {
            src[(y * sw + x) as usize * c + ch] as f64
        } else {
            0.0
        }
    };

    let mut out = vec![0u8; width as usize * height as usize * c];
    for oy in 0..height as usize {
        for ox in 0..width as usize {
            let (x, y) = (ox as f64, oy as f64);
            let sx = inverse[0] * x + inverse[1] * y + inverse[2];
            let sy = inverse[3] * x + inverse[4] * y + inverse[5];

            let x0 = sx.floor();
            let y0 = sy.floor();
            let fx = sx - x0;
            let fy = sy - y0;
            let (x0, y0) = (x0 as i64, y0 as i64);

            let base = (oy * width as usize + ox) * c;
            for ch in 0..c {
                let val = sample(x0, y0, ch) * (1.0 - fx) * (1.0 - fy)
                    + sample(x0 + 1, y0, ch) * fx * (1.0 - fy)
                    + sample(x0, y0 + 1, ch) * (1.0 - fx) * fy
                    + sample(x0 + 1, y0 + 1, ch) * fx * fy;
                out[base + ch] = val.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    Ok(Frame::new(out, width, height, frame.channels()))
}

fn invert(m: &Affine) -> Result<Affine> {
    let det = m[0] * m[4] - m[1] * m[3];
    if det.abs() < DEGENERATE_EPSILON {
        return Err(VisionError::DegenerateLandmarks);
    }
    let (a, b, d, e) = (m[4] / det, -m[1] / det, -m[3] / det, m[0] / det);
    Ok([a, b, -(a * m[2] + b * m[5]), d, e, -(d * m[2] + e * m[5])])
}

/// Per-channel `saturate(round(a·b/255))` of two equally sized frames.
///
/// The operand with fewer channels is converted up first.
pub fn multiply_blend(a: &Frame, b: &Frame) -> Result<Frame> {
    let channels = a.channels().max(b.channels());
    let a = a.with_channels(channels)?;
    let b = b.with_channels(channels)?;
    if a.width() != b.width() || a.height() != b.height() {
        return Err(VisionError::BufferSize {
            actual: b.data().len(),
            expected: a.data().len(),
        });
    }

    let blended = a
        .data()
        .iter()
        .zip(b.data())
        .map(|(&x, &y)| ((x as f32 * y as f32) / 255.0).round().clamp(0.0, 255.0) as u8)
        .collect();
    Ok(Frame::new(blended, a.width(), a.height(), channels))
}
