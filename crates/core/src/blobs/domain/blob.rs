use crate::shared::constants::UNKNOWN_LABEL;
use crate::shared::frame::Frame;
use crate::shared::geometry::Rect;

/// A foreground region cropped out of a source frame.
///
/// Owns a private copy of its pixels. `bounds` records where the crop came
/// from in the source frame; the label starts out unknown (0).
#[derive(Clone, Debug, PartialEq)]
pub struct Blob {
    frame: Frame,
    label: u32,
    bounds: Rect,
}

impl Blob {
    pub fn new(frame: Frame, label: u32) -> Self {
        let bounds = Rect::new(0, 0, frame.width() as i32, frame.height() as i32);
        Self {
            frame,
            label,
            bounds,
        }
    }

    /// Unlabelled blob cropped from `bounds` of a larger frame.
    pub fn from_region(frame: Frame, bounds: Rect) -> Self {
        Self {
            frame,
            label: UNKNOWN_LABEL,
            bounds,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }

    pub fn label(&self) -> u32 {
        self.label
    }

    pub fn set_label(&mut self, label: u32) {
        self.label = label;
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn width(&self) -> u32 {
        self.frame.width()
    }

    pub fn height(&self) -> u32 {
        self.frame.height()
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }
}

impl Default for Blob {
    fn default() -> Self {
        Self::new(Frame::blank(0, 0, 3), UNKNOWN_LABEL)
    }
}
