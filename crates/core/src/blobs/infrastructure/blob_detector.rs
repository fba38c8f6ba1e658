//! Statistical background segmentation and contour-based blob extraction.
//!
//! The dominant color of the frame is assumed to be background: pixels
//! within one standard deviation of the per-channel mean form the mask, the
//! mask is eroded so neighbouring foreground regions merge, and the outer
//! borders of the mask's edges become blob rectangles.

use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::point::Point;
use imageproc::morphology::erode;

use crate::blobs::domain::blob::Blob;
use crate::imaging::draw::{draw_rect, Color};
use crate::imaging::resize::resize_area;
use crate::shared::error::{Result, VisionError};
use crate::shared::frame::Frame;
use crate::shared::geometry::Rect;

const MASK_STD_DEVS_FROM_MEAN: f64 = 1.0;
const MASK_EROSION_KERNEL_RELATIVE_SIZE: f64 = 0.005;
const MASK_EROSION_ITERATIONS: u32 = 8;
const CANNY_LOW_THRESHOLD: f32 = 191.0;
const CANNY_HIGH_THRESHOLD: f32 = 255.0;
const BLOB_RELATIVE_MIN_SIZE: f64 = 0.05;
const DRAW_COLOR: Color = Color::GREEN;

pub struct BlobDetector {
    mask: GrayImage,
}

impl BlobDetector {
    pub fn new() -> Self {
        Self {
            mask: GrayImage::new(0, 0),
        }
    }

    /// Background mask computed by the most recent `detect` call.
    ///
    /// 255 marks background, 0 marks foreground, at the working (resized)
    /// resolution.
    pub fn mask(&self) -> &GrayImage {
        &self.mask
    }

    /// Finds foreground blobs in `image`.
    ///
    /// With `resize_factor != 1.0` the mask is computed on an area-averaged
    /// copy and rectangles are mapped back to full resolution. Blobs are
    /// cropped from the full-resolution frame; when `draw` is set their
    /// rectangles are outlined on `image` afterwards.
    pub fn detect(&mut self, image: &mut Frame, resize_factor: f64, draw: bool) -> Result<Vec<Blob>> {
        if image.is_empty() {
            return Err(VisionError::EmptyImage);
        }

        self.mask = if resize_factor == 1.0 {
            create_mask(image)
        } else {
            create_mask(&resize_area(image, resize_factor)?)
        };

        let edges = canny(&self.mask, CANNY_LOW_THRESHOLD, CANNY_HIGH_THRESHOLD);
        let contours: Vec<Contour<i32>> = find_contours(&edges);

        let min_size = (image.width().min(image.height()) as f64 * BLOB_RELATIVE_MIN_SIZE) as i32;
        let rects: Vec<Rect> = contours
            .iter()
            .filter(|c| matches!(c.border_type, BorderType::Outer))
            .filter_map(|c| bounding_rect(&c.points))
            .map(|r| r.unscaled(resize_factor))
            .filter(|r| r.width >= min_size && r.height >= min_size)
            .collect();

        let blobs: Vec<Blob> = rects
            .iter()
            .map(|r| Blob::from_region(image.crop(r), *r))
            .collect();

        log::debug!(
            "{} contours, {} blobs at least {}px (resize {})",
            contours.len(),
            blobs.len(),
            min_size,
            resize_factor
        );

        if draw {
            for rect in &rects {
                draw_rect(image, rect, DRAW_COLOR);
            }
        }

        Ok(blobs)
    }
}

impl Default for BlobDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Inclusive integer range per channel. Only whole pixel values inside the
/// real interval `mean ± k·stddev` qualify.
fn mask_bounds(image: &Frame) -> Vec<(i32, i32)> {
    image
        .mean_std_dev()
        .into_iter()
        .map(|(mean, std)| {
            let half_range = MASK_STD_DEVS_FROM_MEAN * std;
            ((mean - half_range).ceil() as i32, (mean + half_range).floor() as i32)
        })
        .collect()
}

/// 255 where every channel lies within `mean ± k·stddev`, eroded.
fn create_mask(image: &Frame) -> GrayImage {
    let bounds = mask_bounds(image);

    let c = image.channels() as usize;
    let values: Vec<u8> = image
        .data()
        .chunks_exact(c)
        .map(|px| {
            let inside = px
                .iter()
                .zip(bounds.iter())
                .all(|(&v, &(lo, hi))| (lo..=hi).contains(&(v as i32)));
            if inside {
                255
            } else {
                0
            }
        })
        .collect();
    let mask = GrayImage::from_raw(image.width(), image.height(), values)
        .unwrap_or_else(|| GrayImage::from_pixel(image.width(), image.height(), Luma([255])));

    let kernel_width =
        (image.width().min(image.height()) as f64 * MASK_EROSION_KERNEL_RELATIVE_SIZE) as i32;
    if kernel_width <= 0 {
        return mask;
    }
    // Repeated square erosions compose into one larger square erosion.
    let radius = (MASK_EROSION_ITERATIONS as i32 * (kernel_width - 1) / 2).min(u8::MAX as i32);
    if radius == 0 {
        return mask;
    }
    erode(&mask, Norm::LInf, radius as u8)
}

fn bounding_rect(points: &[Point<i32>]) -> Option<Rect> {
    let first = points.first()?;
    let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.x, first.y);
    for p in points {
        x0 = x0.min(p.x);
        y0 = y0.min(p.y);
        x1 = x1.max(p.x);
        y1 = y1.max(p.y);
    }
    Some(Rect::new(x0, y0, x1 - x0 + 1, y1 - y0 + 1))
}
