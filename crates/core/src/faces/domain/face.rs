use crate::imaging::warp::{affine_from_points, multiply_blend, warp_affine};
use crate::shared::error::Result;
use crate::shared::frame::Frame;
use crate::shared::geometry::Rect;

use super::face_landmarks::FaceLandmarks;
use super::species::Species;

/// A detected (or merged) face with its own pixel copy.
///
/// Landmarks share the coordinate frame of the pixels; `bounds` is where
/// the face was cropped in the source frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Face {
    species: Species,
    frame: Frame,
    landmarks: FaceLandmarks,
    bounds: Rect,
}

impl Face {
    pub fn new(species: Species, frame: Frame, landmarks: FaceLandmarks, bounds: Rect) -> Self {
        Self {
            species,
            frame,
            landmarks,
            bounds,
        }
    }

    /// Blends two faces into one.
    ///
    /// The smaller face (by pixel area; ties keep `face0` as the bigger one)
    /// is warped so its eyes and nose land on the bigger face's, then the
    /// two are multiplied together. The result carries the bigger face's
    /// landmarks, bounds and dimensions.
    pub fn merge(face0: &Face, face1: &Face) -> Result<Face> {
        let (bigger, smaller) = if face1.frame.area() > face0.frame.area() {
            (face1, face0)
        } else {
            (face0, face1)
        };

        let transform = affine_from_points(&smaller.landmarks.points(), &bigger.landmarks.points())?;
        let warped = warp_affine(
            &smaller.frame,
            &transform,
            bigger.frame.width(),
            bigger.frame.height(),
        )?;
        let blended = multiply_blend(&warped, &bigger.frame)?;

        Ok(Face {
            species: bigger.species.merged_with(smaller.species),
            frame: blended,
            landmarks: bigger.landmarks,
            bounds: bigger.bounds,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }

    pub fn species(&self) -> Species {
        self.species
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

    pub fn landmarks(&self) -> &FaceLandmarks {
        &self.landmarks
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::error::VisionError;
    use crate::shared::geometry::Point;
    use rstest::rstest;

    fn face(species: Species, w: u32, h: u32, channels: u8, value: u8) -> Face {
        let frame = Frame::new(vec![value; (w * h) as usize * channels as usize], w, h, channels);
        let landmarks = match species {
            Species::Cat => FaceLandmarks::cat(w as f32, h as f32),
            _ => FaceLandmarks::human(w as f32, h as f32, None, None),
        };
        Face::new(species, frame, landmarks, Rect::new(5, 6, w as i32, h as i32))
    }

    #[test]
    fn test_reads_back() {
        let f = face(Species::Cat, 20, 10, 3, 9);
        assert_eq!(f.species(), Species::Cat);
        assert_eq!((f.width(), f.height()), (20, 10));
        assert_eq!(f.bounds(), Rect::new(5, 6, 20, 10));
        assert_eq!(f.landmarks(), &FaceLandmarks::cat(20.0, 10.0));
        assert!(!f.is_empty());
    }

    #[test]
    fn test_merge_takes_bigger_face_geometry() {
        let small = face(Species::Human, 40, 40, 3, 255);
        let big = face(Species::Human, 100, 80, 3, 200);

        for merged in [Face::merge(&small, &big).unwrap(), Face::merge(&big, &small).unwrap()] {
            assert_eq!((merged.width(), merged.height()), (100, 80));
            assert_eq!(merged.landmarks(), big.landmarks());
            assert_eq!(merged.bounds(), big.bounds());
        }
    }

    #[test]
    fn test_merge_leaves_inputs_untouched() {
        let a = face(Species::Human, 40, 40, 3, 120);
        let b = face(Species::Cat, 60, 60, 3, 80);
        let (a0, b0) = (a.clone(), b.clone());
        Face::merge(&a, &b).unwrap();
        assert_eq!(a, a0);
        assert_eq!(b, b0);
    }

    #[rstest]
    #[case::human_human(Species::Human, Species::Human, Species::Human)]
    #[case::cat_cat(Species::Cat, Species::Cat, Species::Cat)]
    #[case::human_cat(Species::Human, Species::Cat, Species::Hybrid)]
    #[case::cat_human(Species::Cat, Species::Human, Species::Hybrid)]
    fn test_merge_species_any_order(#[case] s0: Species, #[case] s1: Species, #[case] expected: Species) {
        let a = face(s0, 30, 30, 3, 100);
        let b = face(s1, 50, 50, 3, 100);
        assert_eq!(Face::merge(&a, &b).unwrap().species(), expected);
        assert_eq!(Face::merge(&b, &a).unwrap().species(), expected);
    }

    #[test]
    fn test_merge_tie_keeps_first_as_bigger() {
        let mut a = face(Species::Human, 30, 30, 3, 255);
        a.bounds = Rect::new(1, 1, 30, 30);
        let b = face(Species::Human, 30, 30, 3, 255);
        assert_eq!(Face::merge(&a, &b).unwrap().bounds(), a.bounds());
    }

    #[test]
    fn test_merge_multiplies_aligned_pixels() {
        // Same geometry, so the warp is the identity.
        let white = face(Species::Cat, 40, 40, 3, 255);
        let gray = face(Species::Cat, 40, 40, 3, 100);
        let merged = Face::merge(&gray, &white).unwrap();
        assert_eq!(merged.frame().pixel(20, 20), &[100, 100, 100]);
    }

    #[test]
    fn test_merge_promotes_channels() {
        let gray = face(Species::Human, 30, 30, 1, 255);
        let rgba = face(Species::Human, 60, 60, 4, 255);
        let merged = Face::merge(&gray, &rgba).unwrap();
        assert_eq!(merged.frame().channels(), 4);
    }

    #[test]
    fn test_merge_collinear_landmarks_fail() {
        let a = face(Species::Human, 40, 40, 3, 10);
        let line = FaceLandmarks::new(Point::new(0.0, 0.0), Point::new(5.0, 5.0), Point::new(10.0, 10.0));
        let b = Face::new(Species::Cat, Frame::blank(20, 20, 3), line, Rect::default());
        let err = Face::merge(&a, &b).unwrap_err();
        assert!(matches!(err, VisionError::DegenerateLandmarks));
    }
}
