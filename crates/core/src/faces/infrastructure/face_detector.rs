//! Human and cat face detection with eye-based landmark estimation.

use std::path::Path;

use image::imageops::crop_imm;
use image::GrayImage;

use crate::faces::domain::face::Face;
use crate::faces::domain::face_landmarks::FaceLandmarks;
use crate::faces::domain::object_cascade::{CascadeParams, ObjectCascade};
use crate::faces::domain::species::Species;
use crate::imaging::draw::{draw_circle, draw_rect, Color};
use crate::imaging::equalization::Equalization;
use crate::imaging::resize::resize_area;
use crate::shared::constants::{
    CAT_FACE_CASCADE, HUMAN_FACE_CASCADE, LEFT_EYE_CASCADE, RIGHT_EYE_CASCADE,
};
use crate::shared::error::{Result, VisionError};
use crate::shared::frame::Frame;
use crate::shared::geometry::{intersects, Rect};

use super::haar_cascade::HaarCascade;

const HUMAN_FACE_SCALE_FACTOR: f64 = 1.4;
const HUMAN_FACE_MIN_NEIGHBORS: u32 = 4;
const HUMAN_FACE_RELATIVE_MIN_SIZE: f64 = 0.25;

const HUMAN_EYE_SCALE_FACTOR: f64 = 1.2;
const HUMAN_EYE_MIN_NEIGHBORS: u32 = 2;
const HUMAN_EYE_RELATIVE_MIN_SIZE_IN_FACE: f64 = 0.1;

const CAT_FACE_SCALE_FACTOR: f64 = 1.4;
const CAT_FACE_MIN_NEIGHBORS: u32 = 6;
const CAT_FACE_RELATIVE_MIN_SIZE: f64 = 0.2;

const HUMAN_FACE_COLOR: Color = Color::YELLOW;
const CAT_FACE_COLOR: Color = Color::WHITE;
const LEFT_EYE_COLOR: Color = Color::RED;
const RIGHT_EYE_COLOR: Color = Color::GREEN;
const NOSE_COLOR: Color = Color::BLUE;
const DRAW_RADIUS: i32 = 4;

/// A face found in one `detect` call, with the eye rectangles that located
/// its landmarks (relative to the face, full resolution).
struct Detection {
    face: Face,
    left_eye: Option<Rect>,
    right_eye: Option<Rect>,
}

pub struct FaceDetector {
    human_face: Box<dyn ObjectCascade>,
    cat_face: Box<dyn ObjectCascade>,
    left_eye: Box<dyn ObjectCascade>,
    right_eye: Box<dyn ObjectCascade>,
    equalization: Equalization,
    equalized: GrayImage,
}

impl FaceDetector {
    pub fn new(
        human_face: Box<dyn ObjectCascade>,
        cat_face: Box<dyn ObjectCascade>,
        left_eye: Box<dyn ObjectCascade>,
        right_eye: Box<dyn ObjectCascade>,
    ) -> Self {
        Self {
            human_face,
            cat_face,
            left_eye,
            right_eye,
            equalization: Equalization::default(),
            equalized: GrayImage::new(0, 0),
        }
    }

    /// Loads the four Haar cascades from OpenCV XML files.
    pub fn from_cascade_files(
        human_face: &Path,
        cat_face: &Path,
        left_eye: &Path,
        right_eye: &Path,
    ) -> Result<Self> {
        Ok(Self::new(
            Box::new(HaarCascade::from_file(human_face)?),
            Box::new(HaarCascade::from_file(cat_face)?),
            Box::new(HaarCascade::from_file(left_eye)?),
            Box::new(HaarCascade::from_file(right_eye)?),
        ))
    }

    /// Loads the stock cascade files from `dir`.
    pub fn from_cascade_dir(dir: &Path) -> Result<Self> {
        Self::from_cascade_files(
            &dir.join(HUMAN_FACE_CASCADE),
            &dir.join(CAT_FACE_CASCADE),
            &dir.join(LEFT_EYE_CASCADE),
            &dir.join(RIGHT_EYE_CASCADE),
        )
    }

    pub fn with_equalization(mut self, equalization: Equalization) -> Self {
        log::info!("Using {:?} equalization for face detection", equalization);
        self.equalization = equalization;
        self
    }

    /// Finds human and cat faces in `image`.
    ///
    /// Cascades run on an equalized grayscale copy, downscaled first when
    /// `resize_factor != 1.0`. Cat faces overlapping a human face are
    /// dropped. Faces are cropped from the full-resolution frame before any
    /// annotation is drawn.
    pub fn detect(&mut self, image: &mut Frame, resize_factor: f64, draw: bool) -> Result<Vec<Face>> {
        if image.is_empty() {
            return Err(VisionError::EmptyImage);
        }

        let gray = if resize_factor == 1.0 {
            image.to_gray()?
        } else {
            resize_area(image, resize_factor)?.to_gray()?
        };
        self.equalized = self.equalization.apply(&gray);

        let shorter_side = self.equalized.width().min(self.equalized.height()) as f64;
        let human_params = CascadeParams::new(
            HUMAN_FACE_SCALE_FACTOR,
            HUMAN_FACE_MIN_NEIGHBORS,
            (shorter_side * HUMAN_FACE_RELATIVE_MIN_SIZE) as u32,
        );
        let cat_params = CascadeParams::new(
            CAT_FACE_SCALE_FACTOR,
            CAT_FACE_MIN_NEIGHBORS,
            (shorter_side * CAT_FACE_RELATIVE_MIN_SIZE) as u32,
        );

        let human_rects = self.human_face.detect_regions(&self.equalized, &human_params);
        let mut cat_rects = self.cat_face.detect_regions(&self.equalized, &cat_params);
        let cat_candidates = cat_rects.len();
        cat_rects.retain(|cat| !human_rects.iter().any(|human| intersects(human, cat)));

        log::debug!(
            "{} human faces, {} of {} cat faces kept",
            human_rects.len(),
            cat_rects.len(),
            cat_candidates
        );

        let mut detections = Vec::with_capacity(human_rects.len() + cat_rects.len());
        for rect in &human_rects {
            if let Some(d) = self.inner_components(image, resize_factor, Species::Human, rect) {
                detections.push(d);
            }
        }
        for rect in &cat_rects {
            if let Some(d) = self.inner_components(image, resize_factor, Species::Cat, rect) {
                detections.push(d);
            }
        }

        if draw {
            for d in &detections {
                annotate(image, d);
            }
        }

        Ok(detections.into_iter().map(|d| d.face).collect())
    }

    /// Estimates landmarks for one face rectangle of the working image and
    /// crops the face from the full-resolution frame.
    fn inner_components(
        &self,
        image: &Frame,
        resize_factor: f64,
        species: Species,
        rect: &Rect,
    ) -> Option<Detection> {
        let face_rect = rect.clamped(self.equalized.width(), self.equalized.height());
        if face_rect.is_empty() {
            return None;
        }
        let (w, h) = (face_rect.width as f32, face_rect.height as f32);

        let (landmarks, left_eye, right_eye) = match species {
            Species::Human => {
                let (left, right) = self.find_eyes(&face_rect);
                (FaceLandmarks::human(w, h, left, right), left, right)
            }
            _ => (FaceLandmarks::cat(w, h), None, None),
        };

        let bounds = face_rect.unscaled(resize_factor);
        let face = Face::new(species, image.crop(&bounds), landmarks.unscaled(resize_factor), bounds);
        Some(Detection {
            face,
            left_eye: left_eye.map(|r| r.unscaled(resize_factor)),
            right_eye: right_eye.map(|r| r.unscaled(resize_factor)),
        })
    }

    /// First left-eye hit in the face's left half and first right-eye hit in
    /// its right half, relative to the face.
    fn find_eyes(&self, face_rect: &Rect) -> (Option<Rect>, Option<Rect>) {
        let (fx, fy) = (face_rect.x as u32, face_rect.y as u32);
        let (fw, fh) = (face_rect.width as u32, face_rect.height as u32);
        let half = fw / 2;
        let params = CascadeParams::new(
            HUMAN_EYE_SCALE_FACTOR,
            HUMAN_EYE_MIN_NEIGHBORS,
            (fw as f64 * HUMAN_EYE_RELATIVE_MIN_SIZE_IN_FACE) as u32,
        );

        let left_half = crop_imm(&self.equalized, fx, fy, half, fh).to_image();
        let right_half = crop_imm(&self.equalized, fx + half, fy, fw - half, fh).to_image();

        let left = self.left_eye.detect_regions(&left_half, &params).first().copied();
        let right = self
            .right_eye
            .detect_regions(&right_half, &params)
            .first()
            .map(|r| r.translated(half as i32, 0));
        (left, right)
    }
}

fn annotate(image: &mut Frame, detection: &Detection) {
    let face = &detection.face;
    let bounds = face.bounds();
    let color = match face.species() {
        Species::Human => HUMAN_FACE_COLOR,
        _ => CAT_FACE_COLOR,
    };
    draw_rect(image, &bounds, color);

    let (ox, oy) = (bounds.x as f32, bounds.y as f32);
    let lm = face.landmarks();
    draw_circle(image, lm.left_eye.offset(ox, oy), DRAW_RADIUS, LEFT_EYE_COLOR);
    draw_circle(image, lm.right_eye.offset(ox, oy), DRAW_RADIUS, RIGHT_EYE_COLOR);
    draw_circle(image, lm.nose_tip.offset(ox, oy), DRAW_RADIUS, NOSE_COLOR);

    if let Some(eye) = detection.left_eye {
        draw_rect(image, &eye.translated(bounds.x, bounds.y), LEFT_EYE_COLOR);
    }
    if let Some(eye) = detection.right_eye {
        draw_rect(image, &eye.translated(bounds.x, bounds.y), RIGHT_EYE_COLOR);
    }
}
