use image::GrayImage;

/// Summed-area tables of pixel values and squared pixel values.
///
/// Both tables have one extra leading row and column of zeros, so the sum
/// over any rectangle is four lookups.
#[derive(Clone, Debug)]
pub struct IntegralImage {
    sums: Vec<f64>,
    squares: Vec<f64>,
    stride: usize,
    width: u32,
    height: u32,
}

impl IntegralImage {
    pub fn new(image: &GrayImage) -> Self {
        let (w, h) = image.dimensions();
        let stride = w as usize + 1;
        let mut sums = vec![0.0; stride * (h as usize + 1)];
        let mut squares = vec![0.0; stride * (h as usize + 1)];

        for y in 0..h as usize {
            let mut row_sum = 0.0;
            let mut row_sq = 0.0;
            for x in 0..w as usize {
                let v = image.get_pixel(x as u32, y as u32)[0] as f64;
                row_sum += v;
                row_sq += v * v;
                let idx = (y + 1) * stride + x + 1;
                sums[idx] = sums[idx - stride] + row_sum;
                squares[idx] = squares[idx - stride] + row_sq;
            }
        }

        Self {
            sums,
            squares,
            stride,
            width: w,
            height: h,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Sum of pixels in `[x, x + w) x [y, y + h)`, clipped to the image.
    pub fn sum(&self, x: i32, y: i32, w: i32, h: i32) -> f64 {
        Self::lookup(&self.sums, self.stride, self.width, self.height, x, y, w, h)
    }

    pub fn square_sum(&self, x: i32, y: i32, w: i32, h: i32) -> f64 {
        Self::lookup(&self.squares, self.stride, self.width, self.height, x, y, w, h)
    }

    #[allow(clippy::too_many_arguments)]
    fn lookup(table: &[f64], stride: usize, width: u32, height: u32, x: i32, y: i32, w: i32, h: i32) -> f64 {
        let x0 = x.clamp(0, width as i32) as usize;
        let y0 = y.clamp(0, height as i32) as usize;
        let x1 = (x + w).clamp(0, width as i32) as usize;
        let y1 = (y + h).clamp(0, height as i32) as usize;
        if x1 <= x0 || y1 <= y0 {
            return 0.0;
        }
        table[y1 * stride + x1] - table[y0 * stride + x1] - table[y1 * stride + x0]
            + table[y0 * stride + x0]
    }
}
