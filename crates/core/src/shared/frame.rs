use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Rgb, Rgba};
use ndarray::{ArrayView3, ArrayViewMut3, Axis};

use crate::shared::error::{Result, VisionError};
use crate::shared::geometry::Rect;

/// An owned image buffer: contiguous interleaved bytes in row-major order.
///
/// Holds 1 (gray), 3 (RGB) or 4 (RGBA) channels. Cloning deep-copies the
/// pixels, so crops and records never alias the frame they came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
        }
    }

    /// Validating constructor for buffers handed over by collaborators.
    pub fn try_new(data: Vec<u8>, width: u32, height: u32, channels: u8) -> Result<Self> {
        if !matches!(channels, 1 | 3 | 4) {
            return Err(VisionError::UnsupportedChannels(channels));
        }
        let expected = (width as usize) * (height as usize) * (channels as usize);
        if data.len() != expected {
            return Err(VisionError::BufferSize {
                actual: data.len(),
                expected,
            });
        }
        Ok(Self::new(data, width, height, channels))
    }

    /// A zero-filled frame.
    pub fn blank(width: u32, height: u32, channels: u8) -> Self {
        let len = (width as usize) * (height as usize) * (channels as usize);
        Self::new(vec![0; len], width, height, channels)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Pixel count (rows x cols).
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.area() == 0
    }

    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let c = self.channels as usize;
        let offset = (y as usize * self.width as usize + x as usize) * c;
        &self.data[offset..offset + c]
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        ArrayViewMut3::from_shape(self.shape(), &mut self.data)
            .expect("Frame data length must match dimensions")
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }

    /// Deep copy of the pixels inside `rect`, clipped to the frame.
    pub fn crop(&self, rect: &Rect) -> Frame {
        let r = rect.clamped(self.width, self.height);
        if r.is_empty() {
            return Frame::blank(0, 0, self.channels);
        }
        if r != *rect {
            log::warn!("crop {rect:?} clipped to {r:?} for {}x{} frame", self.width, self.height);
        }

        let c = self.channels as usize;
        let (rx, ry, rw, rh) = (r.x as usize, r.y as usize, r.width as usize, r.height as usize);
        let fw = self.width as usize;
        let mut out = Vec::with_capacity(rw * rh * c);
        for row in 0..rh {
            let src_offset = ((ry + row) * fw + rx) * c;
            out.extend_from_slice(&self.data[src_offset..src_offset + rw * c]);
        }
        Frame::new(out, rw as u32, rh as u32, self.channels)
    }

    /// Per-channel mean and population standard deviation.
    pub fn mean_std_dev(&self) -> Vec<(f64, f64)> {
        let pixels = self.as_ndarray();
        (0..self.channels as usize)
            .map(|c| {
                let plane = pixels.index_axis(Axis(2), c).mapv(f64::from);
                let mean = plane.mean().unwrap_or(0.0);
                let std = if plane.is_empty() { 0.0 } else { plane.std(0.0) };
                (mean, std)
            })
            .collect()
    }

    /// BT.601 luma conversion aware of 1, 3 and 4 channel layouts.
    pub fn to_gray(&self) -> Result<GrayImage> {
        let data = match self.channels {
            1 => self.data.clone(),
            3 | 4 => self
                .data
                .chunks_exact(self.channels as usize)
                .map(|px| luma([px[0], px[1], px[2]]))
                .collect(),
            other => return Err(VisionError::UnsupportedChannels(other)),
        };
        GrayImage::from_raw(self.width, self.height, data).ok_or(VisionError::EmptyImage)
    }

    /// Converts to another channel count.
    ///
    /// Gray expands by replication; a synthesized alpha channel is opaque.
    pub fn with_channels(&self, channels: u8) -> Result<Frame> {
        if channels == self.channels {
            return Ok(self.clone());
        }
        let converted = match (self.channels, channels) {
            (_, 1) => return Ok(Frame::from_gray(self.to_gray()?)),
            (1, 3) => self.data.iter().flat_map(|&v| [v, v, v]).collect(),
            (1, 4) => self.data.iter().flat_map(|&v| [v, v, v, 255]).collect(),
            (3, 4) => self
                .data
                .chunks_exact(3)
                .flat_map(|p| [p[0], p[1], p[2], 255])
                .collect(),
            (4, 3) => self
                .data
                .chunks_exact(4)
                .flat_map(|p| [p[0], p[1], p[2]])
                .collect(),
            (_, other) => return Err(VisionError::UnsupportedChannels(other)),
        };
        Ok(Frame::new(converted, self.width, self.height, channels))
    }

    pub fn from_gray(image: GrayImage) -> Frame {
        let (w, h) = image.dimensions();
        Frame::new(image.into_raw(), w, h, 1)
    }

    /// Adopts a decoded image, keeping gray/RGB/RGBA layouts as they are.
    pub fn from_dynamic(image: DynamicImage) -> Frame {
        let (w, h) = (image.width(), image.height());
        match image {
            DynamicImage::ImageLuma8(img) => Frame::new(img.into_raw(), w, h, 1),
            DynamicImage::ImageRgb8(img) => Frame::new(img.into_raw(), w, h, 3),
            DynamicImage::ImageRgba8(img) => Frame::new(img.into_raw(), w, h, 4),
            other if other.color().has_alpha() => Frame::new(other.to_rgba8().into_raw(), w, h, 4),
            other => Frame::new(other.to_rgb8().into_raw(), w, h, 3),
        }
    }

    pub fn to_dynamic(&self) -> Result<DynamicImage> {
        self.clone().into_dynamic()
    }

    pub fn into_dynamic(self) -> Result<DynamicImage> {
        let (w, h) = (self.width, self.height);
        let image = match self.channels {
            1 => ImageBuffer::<Luma<u8>, _>::from_raw(w, h, self.data).map(DynamicImage::ImageLuma8),
            3 => ImageBuffer::<Rgb<u8>, _>::from_raw(w, h, self.data).map(DynamicImage::ImageRgb8),
            4 => ImageBuffer::<Rgba<u8>, _>::from_raw(w, h, self.data).map(DynamicImage::ImageRgba8),
            other => return Err(VisionError::UnsupportedChannels(other)),
        };
        image.ok_or(VisionError::EmptyImage)
    }
}

/// BT.601 luma of an RGB triple, the weighting OpenCV cascades are trained on.
pub fn luma([r, g, b]: [u8; 3]) -> u8 {
    (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32).round() as u8
}
