use crate::shared::error::{Result, VisionError};
use crate::shared::frame::Frame;

/// Scales a frame by `factor` with area averaging.
///
/// Each output pixel is the coverage-weighted mean of the source pixels
/// under its footprint, so a 0.5 downscale of a 2x nearest-neighbour
/// upscale reproduces the original exactly.
pub fn resize_area(frame: &Frame, factor: f64) -> Result<Frame> {
    let invalid = || VisionError::InvalidResizeFactor {
        factor,
        width: frame.width(),
        height: frame.height(),
    };
    if !factor.is_finite() || factor <= 0.0 {
        return Err(invalid());
    }

    let dst_w = (frame.width() as f64 * factor).round() as u32;
    let dst_h = (frame.height() as f64 * factor).round() as u32;
    if dst_w == 0 || dst_h == 0 {
        return Err(invalid());
    }

    let src_w = frame.width() as usize;
    let channels = frame.channels() as usize;
    let x_weights = axis_weights(frame.width() as usize, dst_w as usize);
    let y_weights = axis_weights(frame.height() as usize, dst_h as usize);
    let src = frame.data();

    let mut out = Vec::with_capacity(dst_w as usize * dst_h as usize * channels);
    let mut acc = vec![0f32; channels];
    for ys in &y_weights {
        for xs in &x_weights {
            acc.fill(0.0);
            for &(sy, wy) in ys {
                for &(sx, wx) in xs {
                    let w = wy * wx;
                    let offset = (sy * src_w + sx) * channels;
                    for (a, &v) in acc.iter_mut().zip(&src[offset..offset + channels]) {
                        *a += v as f32 * w;
                    }
                }
            }
            out.extend(acc.iter().map(|v| v.round().clamp(0.0, 255.0) as u8));
        }
    }

    Ok(Frame::new(out, dst_w, dst_h, frame.channels()))
}

/// Per destination index: the contributing source indices and their
/// normalized coverage weights.
fn axis_weights(src_len: usize, dst_len: usize) -> Vec<Vec<(usize, f32)>> {
    let scale = src_len as f64 / dst_len as f64;
    (0..dst_len)
        .map(|d| {
            let start = d as f64 * scale;
            let end = (d + 1) as f64 * scale;
            let first = start.floor() as usize;
            let last = (end.ceil() as usize).min(src_len);
            (first..last)
                .filter_map(|s| {
                    let overlap = end.min(s as f64 + 1.0) - start.max(s as f64);
                    (overlap > 1e-9).then_some((s, (overlap / scale) as f32))
                })
                .collect()
        })
        .collect()
}
