//! Contrast-limited adaptive histogram equalization.
//!
//! The image is split into a grid of tiles, each tile gets its own clipped
//! equalization table, and every pixel is remapped by bilinear blending of
//! the four nearest tile tables.

use image::GrayImage;

pub const DEFAULT_CLIP_LIMIT: f32 = 40.0;
pub const DEFAULT_GRID: u32 = 8;

const BINS: usize = 256;

#[derive(Clone, Debug, PartialEq)]
pub struct Clahe {
    clip_limit: f32,
    grid: u32,
}

impl Clahe {
    pub fn new(clip_limit: f32, grid: u32) -> Self {
        Self {
            clip_limit,
            grid: grid.max(1),
        }
    }

    pub fn apply(&self, image: &GrayImage) -> GrayImage {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return image.clone();
        }

        let (tile_w, tiles_x) = tiling(w, self.grid);
        let (tile_h, tiles_y) = tiling(h, self.grid);

        let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
        for ty in 0..tiles_y {
            for tx in 0..tiles_x {
                let x0 = tx * tile_w;
                let y0 = ty * tile_h;
                let x1 = (x0 + tile_w).min(w);
                let y1 = (y0 + tile_h).min(h);
                luts.push(self.tile_lut(image, x0, y0, x1, y1));
            }
        }

        let inv_tw = 1.0 / tile_w as f32;
        let inv_th = 1.0 / tile_h as f32;
        let lut_at = |tx: u32, ty: u32| &luts[(ty * tiles_x + tx) as usize];

        GrayImage::from_fn(w, h, |x, y| {
            let (tx1, tx2, xa) = neighbours(x as f32 * inv_tw - 0.5, tiles_x);
            let (ty1, ty2, ya) = neighbours(y as f32 * inv_th - 0.5, tiles_y);
            let v = image.get_pixel(x, y)[0] as usize;

            let top = lut_at(tx1, ty1)[v] as f32 * (1.0 - xa) + lut_at(tx2, ty1)[v] as f32 * xa;
            let bottom = lut_at(tx1, ty2)[v] as f32 * (1.0 - xa) + lut_at(tx2, ty2)[v] as f32 * xa;
            let out = top * (1.0 - ya) + bottom * ya;
            image::Luma([out.round().clamp(0.0, 255.0) as u8])
        })
    }

    fn tile_lut(&self, image: &GrayImage, x0: u32, y0: u32, x1: u32, y1: u32) -> [u8; BINS] {
        let mut hist = [0u32; BINS];
        for y in y0..y1 {
            for x in x0..x1 {
                hist[image.get_pixel(x, y)[0] as usize] += 1;
            }
        }

        let area = ((x1 - x0) * (y1 - y0)).max(1);
        if self.clip_limit > 0.0 {
            let limit = ((self.clip_limit * area as f32 / BINS as f32) as u32).max(1);
            clip_histogram(&mut hist, limit);
        }

        let scale = 255.0 / area as f32;
        let mut lut = [0u8; BINS];
        let mut cumulative = 0u32;
        for (entry, &count) in lut.iter_mut().zip(hist.iter()) {
            cumulative += count;
            *entry = (cumulative as f32 * scale).round().clamp(0.0, 255.0) as u8;
        }
        lut
    }
}

impl Default for Clahe {
    fn default() -> Self {
        Self::new(DEFAULT_CLIP_LIMIT, DEFAULT_GRID)
    }
}

/// Tile edge length and tile count covering `len` with at most `grid` tiles.
fn tiling(len: u32, grid: u32) -> (u32, u32) {
    let tiles = grid.min(len).max(1);
    let tile = len.div_ceil(tiles);
    (tile, len.div_ceil(tile))
}

fn neighbours(pos: f32, tiles: u32) -> (u32, u32, f32) {
    let lower = pos.floor();
    let frac = pos - lower;
    let t1 = (lower as i64).clamp(0, tiles as i64 - 1) as u32;
    let t2 = (lower as i64 + 1).clamp(0, tiles as i64 - 1) as u32;
    (t1, t2, frac)
}

/// Caps every bin at `limit` and spreads the excess evenly over all bins.
fn clip_histogram(hist: &mut [u32; BINS], limit: u32) {
    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }

    let batch = excess / BINS as u32;
    let residual = excess as usize - batch as usize * BINS;
    for bin in hist.iter_mut() {
        *bin += batch;
    }
    if residual > 0 {
        let step = (BINS / residual).max(1);
        for bin in hist.iter_mut().step_by(step).take(residual) {
            *bin += 1;
        }
    }
}
