use serde::Serialize;

/// Axis-aligned integer rectangle in pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        intersects(self, other)
    }

    /// Maps a rectangle found on a resized image back to the source scale.
    ///
    /// Every component is divided by `factor` and truncated toward zero.
    pub fn unscaled(&self, factor: f64) -> Rect {
        Rect {
            x: (self.x as f64 / factor) as i32,
            y: (self.y as f64 / factor) as i32,
            width: (self.width as f64 / factor) as i32,
            height: (self.height as f64 / factor) as i32,
        }
    }

    pub fn translated(&self, dx: i32, dy: i32) -> Rect {
        Rect {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    /// Intersection with `[0, width) x [0, height)`.
    pub fn clamped(&self, width: u32, height: u32) -> Rect {
        let x0 = self.x.clamp(0, width as i32);
        let y0 = self.y.clamp(0, height as i32);
        let x1 = self.right().clamp(0, width as i32);
        let y1 = self.bottom().clamp(0, height as i32);
        Rect {
            x: x0,
            y: y0,
            width: (x1 - x0).max(0),
            height: (y1 - y0).max(0),
        }
    }
}

/// 2D point with sub-pixel precision.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn scaled(&self, factor: f32) -> Point {
        Point::new(self.x * factor, self.y * factor)
    }

    pub fn offset(&self, dx: f32, dy: f32) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }

    pub fn rounded(&self) -> (i32, i32) {
        (self.x.round() as i32, self.y.round() as i32)
    }
}

/// Open-interval overlap test on both axes.
///
/// Rectangles that only share an edge do not intersect.
pub fn intersects(r0: &Rect, r1: &Rect) -> bool {
    r0.x < r1.right() && r0.right() > r1.x && r0.y < r1.bottom() && r0.bottom() > r1.y
}
