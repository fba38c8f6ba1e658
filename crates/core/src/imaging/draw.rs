//! In-place annotation of frames with outlines and landmark markers.

use image::{ImageBuffer, Luma, Rgb, Rgba};
use imageproc::drawing::{draw_hollow_circle_mut, draw_hollow_rect_mut, Canvas};
use imageproc::rect::Rect as PixelRect;

use crate::shared::frame::{luma, Frame};
use crate::shared::geometry::{Point, Rect};

/// RGB drawing color; gray frames receive its luma.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color(pub [u8; 3]);

impl Color {
    pub const RED: Color = Color([255, 0, 0]);
    pub const GREEN: Color = Color([0, 255, 0]);
    pub const BLUE: Color = Color([0, 0, 255]);
    pub const YELLOW: Color = Color([255, 255, 0]);
    pub const WHITE: Color = Color([255, 255, 255]);

    fn luma(&self) -> u8 {
        luma(self.0)
    }
}

#[derive(Clone, Copy, Debug)]
enum Shape {
    Outline(PixelRect),
    Circle { center: (i32, i32), radius: i32 },
}

/// Outlines `rect` on the frame. Zero-sized rectangles are skipped.
pub fn draw_rect(frame: &mut Frame, rect: &Rect, color: Color) {
    if rect.is_empty() {
        return;
    }
    let outline = PixelRect::at(rect.x, rect.y).of_size(rect.width as u32, rect.height as u32);
    draw(frame, Shape::Outline(outline), color);
}

pub fn draw_circle(frame: &mut Frame, center: Point, radius: i32, color: Color) {
    if radius <= 0 {
        return;
    }
    draw(
        frame,
        Shape::Circle {
            center: center.rounded(),
            radius,
        },
        color,
    );
}

fn draw(frame: &mut Frame, shape: Shape, color: Color) {
    let (w, h) = (frame.width(), frame.height());
    if w == 0 || h == 0 {
        return;
    }
    let [r, g, b] = color.0;
    match frame.channels() {
        1 => {
            if let Some(mut img) = ImageBuffer::<Luma<u8>, &mut [u8]>::from_raw(w, h, frame.data_mut()) {
                paint(&mut img, shape, Luma([color.luma()]));
            }
        }
        3 => {
            if let Some(mut img) = ImageBuffer::<Rgb<u8>, &mut [u8]>::from_raw(w, h, frame.data_mut()) {
                paint(&mut img, shape, Rgb([r, g, b]));
            }
        }
        4 => {
            if let Some(mut img) = ImageBuffer::<Rgba<u8>, &mut [u8]>::from_raw(w, h, frame.data_mut()) {
                paint(&mut img, shape, Rgba([r, g, b, 255]));
            }
        }
        other => log::warn!("Cannot draw on a {other}-channel frame"),
    }
}

fn paint<C: Canvas>(canvas: &mut C, shape: Shape, color: C::Pixel) {
    match shape {
        Shape::Outline(rect) => draw_hollow_rect_mut(canvas, rect, color),
        Shape::Circle { center, radius } => draw_hollow_circle_mut(canvas, center, radius, color),
    }
}
