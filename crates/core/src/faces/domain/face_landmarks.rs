//! Three-point face landmarks: both eye centers and the nose tip.
//!
//! Coordinates are relative to the face's own top-left corner.

use serde::Serialize;

use crate::shared::geometry::{Point, Rect};

const HUMAN_EYE_CENTER_X_IN_EYE: f32 = 0.5;
const HUMAN_EYE_CENTER_Y_IN_EYE: f32 = 0.65;

const HUMAN_LEFT_EYE_X_IN_FACE: f32 = 0.3;
const HUMAN_RIGHT_EYE_X_IN_FACE: f32 = 1.0 - HUMAN_LEFT_EYE_X_IN_FACE;
const HUMAN_EYE_Y_IN_FACE: f32 = 0.4;

const HUMAN_NOSE_LENGTH_IN_FACE: f32 = 0.2;

const CAT_LEFT_EYE_X_IN_FACE: f32 = 0.25;
const CAT_RIGHT_EYE_X_IN_FACE: f32 = 1.0 - CAT_LEFT_EYE_X_IN_FACE;
const CAT_EYE_Y_IN_FACE: f32 = 0.4;
const CAT_NOSE_X_IN_FACE: f32 = 0.5;
const CAT_NOSE_Y_IN_FACE: f32 = 0.75;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct FaceLandmarks {
    pub left_eye: Point,
    pub right_eye: Point,
    pub nose_tip: Point,
}

impl FaceLandmarks {
    pub fn new(left_eye: Point, right_eye: Point, nose_tip: Point) -> Self {
        Self {
            left_eye,
            right_eye,
            nose_tip,
        }
    }

    /// Human landmarks from optional detected eye rectangles.
    ///
    /// Missing eyes fall back to typical positions. The nose tip lies below
    /// the midpoint between the eyes, perpendicular to the eye line.
    pub fn human(face_width: f32, face_height: f32, left_eye: Option<Rect>, right_eye: Option<Rect>) -> Self {
        let left = left_eye.map(eye_center).unwrap_or(Point::new(
            HUMAN_LEFT_EYE_X_IN_FACE * face_width,
            HUMAN_EYE_Y_IN_FACE * face_height,
        ));
        let right = right_eye.map(eye_center).unwrap_or(Point::new(
            HUMAN_RIGHT_EYE_X_IN_FACE * face_width,
            HUMAN_EYE_Y_IN_FACE * face_height,
        ));

        let (dx, dy) = (right.x - left.x, right.y - left.y);
        let between = Point::new(left.x + 0.5 * dx, left.y + 0.5 * dy);
        let length = (dx * dx + dy * dy).sqrt();
        let (nx, ny) = if length > f32::EPSILON {
            (-dy / length, dx / length)
        } else {
            (0.0, 1.0)
        };
        let nose_length = HUMAN_NOSE_LENGTH_IN_FACE * face_height;
        let nose = between.offset(nx * nose_length, ny * nose_length);

        Self::new(left, right, nose)
    }

    /// Typical cat landmark positions.
    pub fn cat(face_width: f32, face_height: f32) -> Self {
        Self::new(
            Point::new(CAT_LEFT_EYE_X_IN_FACE * face_width, CAT_EYE_Y_IN_FACE * face_height),
            Point::new(CAT_RIGHT_EYE_X_IN_FACE * face_width, CAT_EYE_Y_IN_FACE * face_height),
            Point::new(CAT_NOSE_X_IN_FACE * face_width, CAT_NOSE_Y_IN_FACE * face_height),
        )
    }

    pub fn points(&self) -> [Point; 3] {
        [self.left_eye, self.right_eye, self.nose_tip]
    }

    /// Maps landmarks found on a resized image back to the source scale.
    pub fn unscaled(&self, factor: f64) -> Self {
        let inv = (1.0 / factor) as f32;
        Self::new(
            self.left_eye.scaled(inv),
            self.right_eye.scaled(inv),
            self.nose_tip.scaled(inv),
        )
    }
}

fn eye_center(eye: Rect) -> Point {
    Point::new(
        eye.x as f32 + HUMAN_EYE_CENTER_X_IN_EYE * eye.width as f32,
        eye.y as f32 + HUMAN_EYE_CENTER_Y_IN_EYE * eye.height as f32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_point(p: Point, x: f32, y: f32) {
        assert_relative_eq!(p.x, x, epsilon = 1e-4);
        assert_relative_eq!(p.y, y, epsilon = 1e-4);
    }

    #[test]
    fn test_human_fallback_positions() {
        let lm = FaceLandmarks::human(100.0, 200.0, None, None);
        assert_point(lm.left_eye, 30.0, 80.0);
        assert_point(lm.right_eye, 70.0, 80.0);
        // Level eyes: nose straight down by 20% of the face height.
        assert_point(lm.nose_tip, 50.0, 120.0);
    }

    #[test]
    fn test_human_detected_eyes() {
        let left = Rect::new(10, 20, 20, 10);
        let right = Rect::new(60, 20, 20, 10);
        let lm = FaceLandmarks::human(100.0, 100.0, Some(left), Some(right));
        assert_point(lm.left_eye, 20.0, 26.5);
        assert_point(lm.right_eye, 70.0, 26.5);
        assert_point(lm.nose_tip, 45.0, 46.5);
    }

    #[test]
    fn test_human_tilted_eyes_rotate_nose() {
        // Eye line at 45 degrees: nose offset along (-1, 1) / sqrt(2).
        let left = Rect::new(0, 0, 0, 0);
        let right = Rect::new(10, 10, 0, 0);
        let lm = FaceLandmarks::human(100.0, 100.0, Some(left), Some(right));
        let d = 20.0 / 2f32.sqrt();
        assert_point(lm.nose_tip, 5.0 - d, 5.0 + d);
    }

    #[test]
    fn test_human_coincident_eyes_do_not_produce_nan() {
        let eye = Rect::new(40, 40, 10, 10);
        let lm = FaceLandmarks::human(100.0, 100.0, Some(eye), Some(eye));
        assert!(lm.nose_tip.x.is_finite() && lm.nose_tip.y.is_finite());
        assert_point(lm.nose_tip, 45.0, 66.5);
    }

    #[test]
    fn test_cat_positions() {
        let lm = FaceLandmarks::cat(80.0, 40.0);
        assert_point(lm.left_eye, 20.0, 16.0);
        assert_point(lm.right_eye, 60.0, 16.0);
        assert_point(lm.nose_tip, 40.0, 30.0);
    }

    #[test]
    fn test_unscaled() {
        let lm = FaceLandmarks::cat(80.0, 40.0).unscaled(0.5);
        assert_point(lm.left_eye, 40.0, 32.0);
        assert_point(lm.nose_tip, 80.0, 60.0);
    }

    #[test]
    fn test_points_order() {
        let lm = FaceLandmarks::cat(10.0, 10.0);
        assert_eq!(lm.points(), [lm.left_eye, lm.right_eye, lm.nose_tip]);
    }
}
